//! Room Manager: the process-wide registry of live rooms.
//!
//! At most one live room exists per race id. Creation for a given id is
//! serialized by the registry's shard lock, while different ids proceed in
//! parallel. Stopped rooms report back over an exit channel and are dropped
//! from the registry by a background reaper.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::mpsc;

use crate::{
    domain::{LeaderboardReporter, PromptSource, RaceError, RaceId, Room, RoomSettings, Timestamp},
    infrastructure::message_pusher::WebSocketMessagePusher,
};

use super::{
    actor::{ActorContext, RoomActor, RoomExit},
    clock::TokioClock,
    handle::RoomHandle,
    tombstone::Tombstones,
};

const TOMBSTONE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub struct RoomManager {
    rooms: Arc<DashMap<RaceId, RoomHandle>>,
    tombstones: Arc<Tombstones>,
    settings: RoomSettings,
    tombstone_ttl: Duration,
    reporter: Arc<dyn LeaderboardReporter>,
    prompts: Arc<dyn PromptSource>,
    clock: TokioClock,
    next_instance: AtomicU64,
    exit_tx: mpsc::UnboundedSender<RoomExit>,
}

impl RoomManager {
    /// Must be called from within a tokio runtime (spawns the reaper).
    pub fn new(
        settings: RoomSettings,
        tombstone_ttl: Duration,
        reporter: Arc<dyn LeaderboardReporter>,
        prompts: Arc<dyn PromptSource>,
    ) -> Arc<Self> {
        Self::with_clock(settings, tombstone_ttl, reporter, prompts, TokioClock::new())
    }

    pub fn with_clock(
        settings: RoomSettings,
        tombstone_ttl: Duration,
        reporter: Arc<dyn LeaderboardReporter>,
        prompts: Arc<dyn PromptSource>,
        clock: TokioClock,
    ) -> Arc<Self> {
        let rooms = Arc::new(DashMap::new());
        let tombstones = Arc::new(Tombstones::new());
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();

        tokio::spawn(reap(rooms.clone(), tombstones.clone(), clock, exit_rx));

        Arc::new(Self {
            rooms,
            tombstones,
            settings,
            tombstone_ttl,
            reporter,
            prompts,
            clock,
            next_instance: AtomicU64::new(1),
            exit_tx,
        })
    }

    /// Live room for `race_id`, created on first reference.
    ///
    /// Race ids whose race already completed are answered with
    /// `RaceNotFound` until their tombstone expires.
    pub fn get_or_create_room(&self, race_id: &RaceId) -> Result<RoomHandle, RaceError> {
        let now = self.clock.now();
        if self.tombstones.contains(race_id, now) {
            return Err(RaceError::RaceNotFound(race_id.as_str().to_string()));
        }

        match self.rooms.entry(race_id.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_closed() {
                    return Ok(entry.get().clone());
                }
                // stopped, but the reaper has not caught up yet
                if self.tombstones.contains(race_id, now) {
                    entry.remove();
                    return Err(RaceError::RaceNotFound(race_id.as_str().to_string()));
                }
                let handle = self.spawn_room(race_id.clone(), now);
                entry.insert(handle.clone());
                Ok(handle)
            }
            Entry::Vacant(entry) => {
                let handle = self.spawn_room(race_id.clone(), now);
                entry.insert(handle.clone());
                Ok(handle)
            }
        }
    }

    /// Drop the room for `race_id` from the registry.
    ///
    /// Refused (returns `false`) while the room still has participants or owes
    /// its result to the leaderboard.
    pub async fn remove_room(&self, race_id: &RaceId) -> bool {
        let Some(handle) = self.rooms.get(race_id).map(|entry| entry.value().clone()) else {
            return false;
        };
        if !handle.evict().await {
            tracing::warn!(
                "Refusing to remove race '{}': it still has participants or an unreported result",
                race_id
            );
            return false;
        }
        self.rooms
            .remove_if(race_id, |_, current| current.instance() == handle.instance());
        tracing::info!("Race '{}' removed", race_id);
        true
    }

    pub fn is_tombstoned(&self, race_id: &RaceId) -> bool {
        self.tombstones.contains(race_id, self.clock.now())
    }

    /// Number of registered rooms (including any that stopped but are not yet reaped)
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn spawn_room(&self, race_id: RaceId, now: Timestamp) -> RoomHandle {
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let prompt = self.prompts.prompt_for(&race_id);
        let room = Room::new(race_id.clone(), prompt, self.settings.clone(), now);
        let (tx, rx) = mpsc::unbounded_channel();

        let actor = RoomActor::new(
            room,
            Box::new(WebSocketMessagePusher::new()),
            self.reporter.clone(),
            self.clock,
            rx,
            ActorContext {
                instance,
                tombstones: self.tombstones.clone(),
                tombstone_ttl: self.tombstone_ttl,
                exit_tx: self.exit_tx.clone(),
            },
        );
        tokio::spawn(actor.run());

        RoomHandle::new(race_id, instance, tx)
    }
}

async fn reap(
    rooms: Arc<DashMap<RaceId, RoomHandle>>,
    tombstones: Arc<Tombstones>,
    clock: TokioClock,
    mut exit_rx: mpsc::UnboundedReceiver<RoomExit>,
) {
    let mut purge = tokio::time::interval(TOMBSTONE_PURGE_INTERVAL);
    purge.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            exit = exit_rx.recv() => match exit {
                Some(RoomExit { race_id, instance }) => {
                    if rooms.remove_if(&race_id, |_, handle| handle.instance() == instance).is_some() {
                        tracing::debug!("Race '{}' evicted from the registry", race_id);
                    }
                }
                None => break,
            },
            _ = purge.tick() => {
                let purged = tombstones.purge(clock.now());
                if purged > 0 {
                    tracing::debug!("Purged {} expired tombstones", purged);
                }
            }
        }
    }
}

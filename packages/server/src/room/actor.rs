//! Room actor: the single writer of one race.
//!
//! Every mutation of a [`Room`] happens on this task, in the order the
//! commands, timer expiries and report completions arrive. Sessions only
//! ever talk to it through a [`RoomHandle`](super::RoomHandle).

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::Instrument;

use crate::{
    domain::{
        CloseReason, InvalidProgress, LeaderboardReporter, MessagePusher, Outbound,
        ParticipantId, ProgressOutcome, RaceId, RaceState, ReportAck, ReportError, ReportStatus,
        Room, RoomEvent,
    },
    infrastructure::dto::{
        conversion::render_event,
        websocket::{RaceResultMessage, ServerMessage},
    },
};

use super::{
    clock::TokioClock,
    command::{JoinAccepted, RoomCommand, RoomSnapshot},
    tombstone::Tombstones,
};

/// Sent to the Room Manager once an actor has stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomExit {
    pub race_id: RaceId,
    pub instance: u64,
}

/// Everything an actor needs from the manager that spawned it
pub(crate) struct ActorContext {
    pub instance: u64,
    pub tombstones: Arc<Tombstones>,
    pub tombstone_ttl: Duration,
    pub exit_tx: mpsc::UnboundedSender<RoomExit>,
}

pub(crate) struct RoomActor {
    room: Room,
    pusher: Box<dyn MessagePusher>,
    reporter: Arc<dyn LeaderboardReporter>,
    clock: TokioClock,
    commands: mpsc::UnboundedReceiver<RoomCommand>,
    report_tx: mpsc::UnboundedSender<Result<ReportAck, ReportError>>,
    report_rx: mpsc::UnboundedReceiver<Result<ReportAck, ReportError>>,
    context: ActorContext,
}

impl RoomActor {
    pub(crate) fn new(
        room: Room,
        pusher: Box<dyn MessagePusher>,
        reporter: Arc<dyn LeaderboardReporter>,
        clock: TokioClock,
        commands: mpsc::UnboundedReceiver<RoomCommand>,
        context: ActorContext,
    ) -> Self {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        Self {
            room,
            pusher,
            reporter,
            clock,
            commands,
            report_tx,
            report_rx,
            context,
        }
    }

    pub(crate) async fn run(self) {
        let span = tracing::info_span!("race", race_id = %self.room.id());
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) {
        tracing::info!(
            "Room created (max {} participants)",
            self.room.settings().max_participants
        );

        loop {
            self.maybe_start_report();
            if self.room.state() == RaceState::Closed {
                break;
            }

            let wake_at = self
                .room
                .next_deadline()
                .map(|deadline| self.clock.instant_at(deadline));
            let timer = async move {
                match wake_at {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("All room handles dropped");
                        break;
                    }
                },
                Some(outcome) = self.report_rx.recv() => self.handle_report_outcome(outcome),
                _ = timer => self.handle_timer(),
            }
        }

        self.shutdown();
    }

    fn handle_command(&mut self, command: RoomCommand) {
        let now = self.clock.now();
        let before = self.room.state();

        match command {
            RoomCommand::Join {
                identity,
                session,
                channel,
                reply,
            } => {
                let participant_id = identity.participant_id.clone();
                match self
                    .room
                    .join(identity.participant_id, identity.display_name, session, now)
                {
                    Ok(outcome) => {
                        let replaced =
                            self.pusher
                                .register_client(participant_id.clone(), session, channel);
                        if outcome.reattached {
                            tracing::info!(
                                "Participant '{}' re-attached (session {})",
                                participant_id,
                                session
                            );
                        } else {
                            tracing::info!("Participant '{}' joined", participant_id);
                        }
                        // dropping the old channel closes the superseded socket
                        drop(replaced);
                        let _ = reply.send(Ok(JoinAccepted {
                            reattached: outcome.reattached,
                            state: self.room.state(),
                        }));
                        self.dispatch(outcome.events);
                    }
                    Err(e) => {
                        tracing::info!("Join of '{}' refused: {}", participant_id, e);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            RoomCommand::Progress {
                participant_id,
                session,
                chars_typed,
                errors,
            } => match self
                .room
                .record_progress(&participant_id, session, chars_typed, errors, now)
            {
                ProgressOutcome::Accepted(events) => self.dispatch(events),
                ProgressOutcome::Rejected(reason) => {
                    tracing::debug!("Progress from '{}' rejected: {}", participant_id, reason);
                    // let the client re-sync to the last accepted value
                    if matches!(
                        reason,
                        InvalidProgress::Regressed { .. } | InvalidProgress::ExceedsPrompt { .. }
                    ) {
                        self.dispatch(vec![Outbound::only(
                            participant_id,
                            RoomEvent::StateChanged,
                        )]);
                    }
                }
            },
            RoomCommand::Detach {
                participant_id,
                session,
            } => {
                self.pusher.unregister_client(&participant_id, session);
                let events = self.room.detach(&participant_id, session, now);
                if !events.is_empty() {
                    tracing::info!("Participant '{}' detached", participant_id);
                }
                self.dispatch(events);
            }
            RoomCommand::ForceStart {
                participant_id,
                reply,
            } => match self.room.force_start(&participant_id, now) {
                Ok(events) => {
                    tracing::info!("Countdown force-started by '{}'", participant_id);
                    let _ = reply.send(Ok(()));
                    self.dispatch(events);
                }
                Err(e) => {
                    tracing::debug!("Force start by '{}' ignored: {}", participant_id, e);
                    let _ = reply.send(Err(e));
                }
            },
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Evict { reply } => {
                let evicted = self.room.evict();
                let _ = reply.send(evicted);
            }
        }

        self.log_transition(before);
    }

    fn handle_timer(&mut self) {
        let before = self.room.state();
        let events = self.room.on_timer(self.clock.now());
        self.dispatch(events);
        self.log_transition(before);
    }

    fn maybe_start_report(&mut self) {
        let Some(result) = self.room.begin_report_attempt(self.clock.now()) else {
            return;
        };
        if let ReportStatus::Pending { attempts, .. } = self.room.report_status() {
            tracing::info!("Reporting race result (attempt {})", attempts);
        }
        let reporter = self.reporter.clone();
        let report_tx = self.report_tx.clone();
        tokio::spawn(
            async move {
                let outcome = reporter.report_race_result(&result).await;
                let _ = report_tx.send(outcome);
            }
            .in_current_span(),
        );
    }

    fn handle_report_outcome(&mut self, outcome: Result<ReportAck, ReportError>) {
        let before = self.room.state();
        let succeeded = match outcome {
            Ok(ack) => {
                tracing::info!("Race result reported (duplicate: {})", ack.duplicate);
                true
            }
            Err(e) => {
                tracing::warn!("Race result report failed: {}", e);
                false
            }
        };

        let events = self.room.record_report_outcome(succeeded, self.clock.now());
        if self.room.report_status() == ReportStatus::Exhausted {
            let payload = self
                .room
                .result()
                .map(|result| serde_json::to_string(&RaceResultMessage::from(result)))
                .transpose()
                .unwrap_or_default()
                .unwrap_or_default();
            tracing::error!(
                result = %payload,
                "Giving up on reporting race result after {} attempts",
                self.room.settings().report_max_attempts
            );
        }
        self.dispatch(events);
        self.log_transition(before);
    }

    /// Deliver events in the order they were produced
    fn dispatch(&self, events: Vec<Outbound>) {
        for outbound in events {
            let recipients: Vec<ParticipantId> = self
                .pusher
                .connected()
                .into_iter()
                .filter(|participant_id| outbound.audience.includes(participant_id))
                .collect();

            if matches!(outbound.event, RoomEvent::StateChanged) {
                // snapshots carry the recipient's own id
                for recipient in &recipients {
                    let frame = render_event(&self.room, &outbound.event, recipient);
                    self.send(std::slice::from_ref(recipient), &frame);
                }
            } else if let Some(first) = recipients.first() {
                let frame = render_event(&self.room, &outbound.event, first);
                self.send(&recipients, &frame);
            }
        }
    }

    fn send(&self, recipients: &[ParticipantId], frame: &ServerMessage) {
        match serde_json::to_string(frame) {
            Ok(json) => {
                if let Err(e) = self.pusher.broadcast(recipients, &json) {
                    tracing::warn!("Failed to deliver frame: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize frame: {}", e),
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            race_id: self.room.id().clone(),
            state: self.room.state(),
            prompt: self.room.prompt().clone(),
            participants: self
                .room
                .participants_in_order()
                .into_iter()
                .cloned()
                .collect(),
            starts_at: self.room.starts_at(),
            result: self.room.result().cloned(),
            report_status: self.room.report_status(),
            evictable: self.room.is_evictable(),
        }
    }

    fn log_transition(&self, before: RaceState) {
        let after = self.room.state();
        if before != after {
            tracing::info!("{} -> {}", before.as_str(), after.as_str());
        }
    }

    fn shutdown(self) {
        let RoomActor {
            room,
            pusher,
            commands,
            clock,
            context,
            ..
        } = self;

        if room.close_reason() == Some(CloseReason::Completed) {
            let ttl = i64::try_from(context.tombstone_ttl.as_millis()).unwrap_or(i64::MAX);
            context
                .tombstones
                .insert(room.id().clone(), clock.now().plus_millis(ttl));
        }
        // queued commands are dropped with the receiver; their callers see a closed room
        drop(commands);
        drop(pusher);

        tracing::info!("Room stopped ({:?})", room.close_reason());
        let _ = context.exit_tx.send(RoomExit {
            race_id: room.id().clone(),
            instance: context.instance,
        });
    }
}

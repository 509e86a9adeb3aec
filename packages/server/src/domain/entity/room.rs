//! Room entity: the race state machine for one race.
//!
//! Room is pure. Every operation takes the current time explicitly and
//! returns the [`Outbound`] events the caller has to deliver, so the whole
//! race lifecycle can be driven deterministically from tests. The runtime
//! side (timers, sockets, the leaderboard call) lives in `crate::room`.
//!
//! ```text
//! Waiting ──(min participants / force start)──▶ Countdown ──(deadline)──▶ Racing
//!    ▲                                             │                        │
//!    └──────────────(roster empties)───────────────┘      (all finished / ceiling / idle)
//!                                                                            ▼
//!  Closed ◀──────────────(result reported or retries exhausted)────────── Finished
//! ```

use std::{cmp::Ordering, collections::HashMap, time::Duration};

use crate::domain::{
    error::{ForceStartError, InvalidProgress, RaceError},
    scoring,
    value_object::{DisplayName, ParticipantId, Prompt, RaceId, SessionId, Timestamp},
};

use super::{
    participant::{Participant, Progress},
    result::{RaceResult, Standing},
};

const TICK_MILLIS: i64 = 1_000;

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn remaining_secs(deadline: Timestamp, now: Timestamp) -> u32 {
    let remaining = deadline.millis_since(now).max(0);
    u32::try_from((remaining + TICK_MILLIS - 1) / TICK_MILLIS).unwrap_or(u32::MAX)
}

/// Tunables of a single room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSettings {
    pub max_participants: usize,
    /// Roster size that starts the countdown automatically
    pub min_participants: usize,
    pub countdown: Duration,
    /// Race-duration ceiling, measured from the authoritative start
    pub race_duration: Duration,
    /// How long a Racing room may have zero attached sessions
    pub idle_grace: Duration,
    /// How long a Waiting room may stay empty before it closes
    pub empty_room_timeout: Duration,
    pub report_max_attempts: u32,
    pub report_backoff: Duration,
    pub report_backoff_max: Duration,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_participants: 5,
            min_participants: 2,
            countdown: Duration::from_secs(10),
            race_duration: Duration::from_secs(180),
            idle_grace: Duration::from_secs(30),
            empty_room_timeout: Duration::from_secs(60),
            report_max_attempts: 5,
            report_backoff: Duration::from_millis(500),
            report_backoff_max: Duration::from_secs(30),
        }
    }
}

/// Race lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceState {
    Waiting,
    Countdown,
    Racing,
    Finished,
    Closed,
}

impl RaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceState::Waiting => "waiting",
            RaceState::Countdown => "countdown",
            RaceState::Racing => "racing",
            RaceState::Finished => "finished",
            RaceState::Closed => "closed",
        }
    }

    /// Countdown → Waiting is the only backwards edge (roster emptied).
    pub fn can_transition_to(&self, next: RaceState) -> bool {
        matches!(
            (self, next),
            (RaceState::Waiting, RaceState::Countdown)
                | (RaceState::Waiting, RaceState::Closed)
                | (RaceState::Countdown, RaceState::Waiting)
                | (RaceState::Countdown, RaceState::Racing)
                | (RaceState::Racing, RaceState::Finished)
                | (RaceState::Finished, RaceState::Closed)
        )
    }
}

/// Recipients of an outbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    AllExcept(ParticipantId),
    Only(ParticipantId),
}

impl Audience {
    pub fn includes(&self, participant_id: &ParticipantId) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::AllExcept(excluded) => excluded != participant_id,
            Audience::Only(target) => target == participant_id,
        }
    }
}

/// Something that happened in the room and must reach the sessions
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Recipients get a fresh full snapshot of the room
    StateChanged,
    CountdownTick {
        remaining_secs: u32,
    },
    Progress {
        participant_id: ParticipantId,
        chars_typed: u32,
        errors: u32,
        finished: bool,
        rank: Option<u32>,
    },
    Finished(RaceResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub event: RoomEvent,
}

impl Outbound {
    pub fn everyone(event: RoomEvent) -> Self {
        Self {
            audience: Audience::Everyone,
            event,
        }
    }

    pub fn all_except(participant_id: ParticipantId, event: RoomEvent) -> Self {
        Self {
            audience: Audience::AllExcept(participant_id),
            event,
        }
    }

    pub fn only(participant_id: ParticipantId, event: RoomEvent) -> Self {
        Self {
            audience: Audience::Only(participant_id),
            event,
        }
    }
}

/// Why a room reached `Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The race ran and its result was handed off (or the hand-off gave up)
    Completed,
    /// Nobody joined (or everybody left) before the race started
    IdleEmpty,
}

/// Delivery state of the RaceResult to the leaderboard collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    NotReady,
    Pending {
        attempts: u32,
        retry_at: Option<Timestamp>,
        in_flight: bool,
    },
    Flushed,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// The participant already existed and only its session link was renewed
    pub reattached: bool,
    /// Previous live session of a re-attached participant, to be closed
    pub replaced_session: Option<SessionId>,
    pub events: Vec<Outbound>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressOutcome {
    Accepted(Vec<Outbound>),
    Rejected(InvalidProgress),
}

/// Race room aggregate
#[derive(Debug, Clone)]
pub struct Room {
    id: RaceId,
    state: RaceState,
    prompt: Prompt,
    settings: RoomSettings,
    participants: HashMap<ParticipantId, Participant>,
    next_registration: u64,
    countdown_deadline: Option<Timestamp>,
    next_tick_at: Option<Timestamp>,
    starts_at: Option<Timestamp>,
    race_deadline: Option<Timestamp>,
    finish_order: Vec<ParticipantId>,
    idle_since: Option<Timestamp>,
    empty_since: Option<Timestamp>,
    result: Option<RaceResult>,
    report: ReportStatus,
    close_reason: Option<CloseReason>,
}

impl Room {
    pub fn new(id: RaceId, prompt: Prompt, settings: RoomSettings, now: Timestamp) -> Self {
        Self {
            id,
            state: RaceState::Waiting,
            prompt,
            settings,
            participants: HashMap::new(),
            next_registration: 0,
            countdown_deadline: None,
            next_tick_at: None,
            starts_at: None,
            race_deadline: None,
            finish_order: Vec::new(),
            idle_since: None,
            empty_since: Some(now),
            result: None,
            report: ReportStatus::NotReady,
            close_reason: None,
        }
    }

    pub fn id(&self) -> &RaceId {
        &self.id
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn countdown_deadline(&self) -> Option<Timestamp> {
        self.countdown_deadline
    }

    /// Authoritative race start; every client measures elapsed time from it
    pub fn starts_at(&self) -> Option<Timestamp> {
        self.starts_at
    }

    pub fn result(&self) -> Option<&RaceResult> {
        self.result.as_ref()
    }

    pub fn report_status(&self) -> ReportStatus {
        self.report
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Participants in registration order
    pub fn participants_in_order(&self) -> Vec<&Participant> {
        let mut participants: Vec<&Participant> = self.participants.values().collect();
        participants.sort_by_key(|p| p.registration);
        participants
    }

    pub fn attached_count(&self) -> usize {
        self.participants
            .values()
            .filter(|p| p.is_connected())
            .count()
    }

    /// Earliest-registered participant still in the roster
    pub fn host(&self) -> Option<&Participant> {
        self.participants.values().min_by_key(|p| p.registration)
    }

    /// A room may be dropped by the Room Manager once it is closed, or when
    /// it holds nobody and owes no result.
    pub fn is_evictable(&self) -> bool {
        self.state == RaceState::Closed
            || (self.participants.is_empty()
                && !matches!(self.report, ReportStatus::Pending { .. }))
    }

    /// Close the room if it is evictable. Returns whether the room is now closed.
    pub fn evict(&mut self) -> bool {
        if self.state == RaceState::Closed {
            return true;
        }
        if !self.is_evictable() {
            return false;
        }
        self.close(CloseReason::IdleEmpty);
        true
    }

    fn transition(&mut self, next: RaceState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Add a participant, or re-attach an existing one to a new session.
    pub fn join(
        &mut self,
        participant_id: ParticipantId,
        display_name: DisplayName,
        session: SessionId,
        now: Timestamp,
    ) -> Result<JoinOutcome, RaceError> {
        if self.state == RaceState::Closed {
            return Err(RaceError::RaceNotFound(self.id.as_str().to_string()));
        }

        if let Some(participant) = self.participants.get_mut(&participant_id) {
            let replaced_session = participant
                .session
                .replace(session)
                .filter(|old| *old != session);
            self.idle_since = None;
            return Ok(JoinOutcome {
                reattached: true,
                replaced_session,
                events: vec![Outbound::everyone(RoomEvent::StateChanged)],
            });
        }

        if matches!(self.state, RaceState::Racing | RaceState::Finished) {
            return Err(RaceError::RaceAlreadyStarted);
        }
        if self.participants.len() >= self.settings.max_participants {
            return Err(RaceError::RaceFull {
                max: self.settings.max_participants,
            });
        }

        let registration = self.next_registration;
        self.next_registration += 1;
        self.participants.insert(
            participant_id.clone(),
            Participant::new(participant_id, display_name, session, now, registration),
        );
        self.empty_since = None;

        let events = if self.state == RaceState::Waiting
            && self.participants.len() >= self.settings.min_participants
        {
            self.start_countdown(now)
        } else {
            vec![Outbound::everyone(RoomEvent::StateChanged)]
        };

        Ok(JoinOutcome {
            reattached: false,
            replaced_session: None,
            events,
        })
    }

    /// Unlink a session from its participant.
    ///
    /// Ignored when `session` is no longer the participant's current link.
    /// Before the race starts the participant leaves the roster; from Racing
    /// on only the link is dropped and progress is kept for a reconnect.
    pub fn detach(
        &mut self,
        participant_id: &ParticipantId,
        session: SessionId,
        now: Timestamp,
    ) -> Vec<Outbound> {
        let is_current = self
            .participants
            .get(participant_id)
            .is_some_and(|p| p.session == Some(session));
        if !is_current {
            return Vec::new();
        }

        match self.state {
            RaceState::Waiting | RaceState::Countdown => {
                self.participants.remove(participant_id);
                if self.participants.is_empty() {
                    self.empty_since = Some(now);
                    if self.state == RaceState::Countdown {
                        self.transition(RaceState::Waiting);
                        self.countdown_deadline = None;
                        self.next_tick_at = None;
                    }
                }
                vec![Outbound::everyone(RoomEvent::StateChanged)]
            }
            RaceState::Racing => {
                if let Some(participant) = self.participants.get_mut(participant_id) {
                    participant.session = None;
                }
                if self.attached_count() == 0 {
                    self.idle_since = Some(now);
                }
                vec![Outbound::everyone(RoomEvent::StateChanged)]
            }
            RaceState::Finished | RaceState::Closed => {
                if let Some(participant) = self.participants.get_mut(participant_id) {
                    participant.session = None;
                }
                Vec::new()
            }
        }
    }

    /// Start the countdown on the host's request, before the roster is full.
    pub fn force_start(
        &mut self,
        requester: &ParticipantId,
        now: Timestamp,
    ) -> Result<Vec<Outbound>, ForceStartError> {
        if self.state != RaceState::Waiting {
            return Err(ForceStartError::NotWaiting);
        }
        if self.host().map(|host| &host.id) != Some(requester) {
            return Err(ForceStartError::NotHost);
        }
        Ok(self.start_countdown(now))
    }

    fn start_countdown(&mut self, now: Timestamp) -> Vec<Outbound> {
        self.transition(RaceState::Countdown);
        let deadline = now.plus_millis(millis(self.settings.countdown));
        self.countdown_deadline = Some(deadline);
        self.next_tick_at = Some(now.plus_millis(TICK_MILLIS)).filter(|tick| *tick < deadline);
        vec![
            Outbound::everyone(RoomEvent::StateChanged),
            Outbound::everyone(RoomEvent::CountdownTick {
                remaining_secs: remaining_secs(deadline, now),
            }),
        ]
    }

    fn start_race(&mut self, starts_at: Timestamp, now: Timestamp) -> Vec<Outbound> {
        self.transition(RaceState::Racing);
        self.countdown_deadline = None;
        self.next_tick_at = None;
        self.starts_at = Some(starts_at);
        self.race_deadline = Some(starts_at.plus_millis(millis(self.settings.race_duration)));
        if self.attached_count() == 0 {
            self.idle_since = Some(now);
        }
        vec![Outbound::everyone(RoomEvent::StateChanged)]
    }

    /// Apply a progress report.
    ///
    /// Only monotonically non-decreasing counts within the prompt length are
    /// accepted; anything else leaves the last valid value in place.
    pub fn record_progress(
        &mut self,
        participant_id: &ParticipantId,
        session: SessionId,
        chars_typed: u32,
        errors: u32,
        now: Timestamp,
    ) -> ProgressOutcome {
        if self.state != RaceState::Racing {
            return ProgressOutcome::Rejected(InvalidProgress::NotRacing);
        }
        let prompt_len = self.prompt.len();
        let Some(participant) = self.participants.get_mut(participant_id) else {
            return ProgressOutcome::Rejected(InvalidProgress::UnknownParticipant);
        };
        if participant.session != Some(session) {
            return ProgressOutcome::Rejected(InvalidProgress::StaleSession);
        }
        if participant.is_finished() {
            return ProgressOutcome::Rejected(InvalidProgress::AlreadyFinished);
        }
        let last = participant.progress;
        if chars_typed < last.chars_typed {
            return ProgressOutcome::Rejected(InvalidProgress::Regressed {
                last: last.chars_typed,
                reported: chars_typed,
            });
        }
        if chars_typed > prompt_len {
            return ProgressOutcome::Rejected(InvalidProgress::ExceedsPrompt {
                prompt_len,
                reported: chars_typed,
            });
        }

        let errors = errors.max(last.errors);
        if chars_typed == last.chars_typed && errors == last.errors {
            return ProgressOutcome::Accepted(Vec::new());
        }
        participant.progress = Progress {
            chars_typed,
            errors,
            updated_at: now,
        };

        if chars_typed < prompt_len {
            return ProgressOutcome::Accepted(vec![Outbound::all_except(
                participant_id.clone(),
                RoomEvent::Progress {
                    participant_id: participant_id.clone(),
                    chars_typed,
                    errors,
                    finished: false,
                    rank: None,
                },
            )]);
        }

        // finish rank is the arrival order through this single writer
        self.finish_order.push(participant_id.clone());
        let rank = u32::try_from(self.finish_order.len()).unwrap_or(u32::MAX);
        participant.finished_at = Some(now);
        participant.final_rank = Some(rank);

        let mut events = vec![Outbound::everyone(RoomEvent::Progress {
            participant_id: participant_id.clone(),
            chars_typed,
            errors,
            finished: true,
            rank: Some(rank),
        })];
        if self.participants.values().all(Participant::is_finished) {
            events.extend(self.finish(now));
        }
        ProgressOutcome::Accepted(events)
    }

    /// Earliest pending timer, if any
    pub fn next_deadline(&self) -> Option<Timestamp> {
        match self.state {
            RaceState::Waiting if self.participants.is_empty() => self
                .empty_since
                .map(|since| since.plus_millis(millis(self.settings.empty_room_timeout))),
            RaceState::Waiting => None,
            RaceState::Countdown => [self.next_tick_at, self.countdown_deadline]
                .into_iter()
                .flatten()
                .min(),
            RaceState::Racing => [
                self.race_deadline,
                self.idle_since
                    .map(|since| since.plus_millis(millis(self.settings.idle_grace))),
            ]
            .into_iter()
            .flatten()
            .min(),
            RaceState::Finished => match self.report {
                ReportStatus::Pending {
                    retry_at: Some(retry_at),
                    in_flight: false,
                    ..
                } => Some(retry_at),
                _ => None,
            },
            RaceState::Closed => None,
        }
    }

    /// Fire whatever timers are due at `now`.
    pub fn on_timer(&mut self, now: Timestamp) -> Vec<Outbound> {
        match self.state {
            RaceState::Waiting => {
                let expired = self.participants.is_empty()
                    && self.empty_since.is_some_and(|since| {
                        now >= since.plus_millis(millis(self.settings.empty_room_timeout))
                    });
                if expired {
                    self.close(CloseReason::IdleEmpty);
                }
                Vec::new()
            }
            RaceState::Countdown => {
                let Some(deadline) = self.countdown_deadline else {
                    return Vec::new();
                };
                if now >= deadline {
                    return self.start_race(deadline, now);
                }
                match self.next_tick_at {
                    Some(tick) if now >= tick => {
                        let next = tick.plus_millis(TICK_MILLIS);
                        self.next_tick_at = Some(next).filter(|next| *next < deadline);
                        vec![Outbound::everyone(RoomEvent::CountdownTick {
                            remaining_secs: remaining_secs(deadline, now),
                        })]
                    }
                    _ => Vec::new(),
                }
            }
            RaceState::Racing => {
                let ceiling_reached = self.race_deadline.is_some_and(|d| now >= d);
                let idle_expired = self.idle_since.is_some_and(|since| {
                    now >= since.plus_millis(millis(self.settings.idle_grace))
                });
                if ceiling_reached || idle_expired {
                    self.finish(now)
                } else {
                    Vec::new()
                }
            }
            RaceState::Finished | RaceState::Closed => Vec::new(),
        }
    }

    fn finish(&mut self, now: Timestamp) -> Vec<Outbound> {
        self.transition(RaceState::Finished);
        self.race_deadline = None;
        self.idle_since = None;

        let started = self.starts_at.unwrap_or(now);
        let mut ordered: Vec<&Participant> = self.participants.values().collect();
        ordered.sort_by(|a, b| standing_order(a, b));

        let standings: Vec<Standing> = ordered
            .iter()
            .enumerate()
            .map(|(index, p)| {
                let ended = p.finished_at.unwrap_or(now);
                Standing {
                    participant_id: p.id.clone(),
                    display_name: p.display_name.clone(),
                    wpm: scoring::words_per_minute(
                        p.progress.chars_typed,
                        ended.millis_since(started),
                    ),
                    accuracy: scoring::accuracy(p.progress.chars_typed, p.progress.errors),
                    finish_position: u32::try_from(index + 1).unwrap_or(u32::MAX),
                    dnf: !p.is_finished(),
                    chars_typed: p.progress.chars_typed,
                    errors: p.progress.errors,
                }
            })
            .collect();

        for standing in &standings {
            if let Some(p) = self.participants.get_mut(&standing.participant_id) {
                p.final_rank = Some(standing.finish_position);
            }
        }

        self.result = Some(RaceResult::new(self.id.clone(), now, standings));
        self.report = ReportStatus::Pending {
            attempts: 0,
            retry_at: None,
            in_flight: false,
        };
        vec![Outbound::everyone(RoomEvent::StateChanged)]
    }

    /// Claim the next leaderboard report attempt, if one is due.
    ///
    /// At most one attempt is in flight; nothing is returned once the result
    /// has been acknowledged.
    pub fn begin_report_attempt(&mut self, now: Timestamp) -> Option<RaceResult> {
        let ReportStatus::Pending {
            attempts,
            retry_at,
            in_flight: false,
        } = self.report
        else {
            return None;
        };
        if retry_at.is_some_and(|at| now < at) {
            return None;
        }
        self.report = ReportStatus::Pending {
            attempts: attempts + 1,
            retry_at: None,
            in_flight: true,
        };
        self.result.clone()
    }

    /// Record the outcome of the in-flight report attempt.
    ///
    /// Success (or running out of attempts) publishes the standings and
    /// closes the room; a failure with attempts left schedules a retry.
    pub fn record_report_outcome(&mut self, succeeded: bool, now: Timestamp) -> Vec<Outbound> {
        let ReportStatus::Pending {
            attempts,
            in_flight: true,
            ..
        } = self.report
        else {
            return Vec::new();
        };

        if succeeded {
            self.report = ReportStatus::Flushed;
            return self.publish_result();
        }
        if attempts >= self.settings.report_max_attempts {
            self.report = ReportStatus::Exhausted;
            return self.publish_result();
        }

        let factor = 1u32.checked_shl(attempts.saturating_sub(1)).unwrap_or(u32::MAX);
        let backoff = self
            .settings
            .report_backoff
            .saturating_mul(factor)
            .min(self.settings.report_backoff_max);
        self.report = ReportStatus::Pending {
            attempts,
            retry_at: Some(now.plus_millis(millis(backoff))),
            in_flight: false,
        };
        Vec::new()
    }

    fn publish_result(&mut self) -> Vec<Outbound> {
        let events = self
            .result
            .clone()
            .map(|result| vec![Outbound::everyone(RoomEvent::Finished(result))])
            .unwrap_or_default();
        self.close(CloseReason::Completed);
        events
    }

    fn close(&mut self, reason: CloseReason) {
        self.transition(RaceState::Closed);
        self.close_reason = Some(reason);
    }
}

/// Finishers by arrival rank, then DNFs by distance typed, then by
/// registration order.
fn standing_order(a: &Participant, b: &Participant) -> Ordering {
    match (a.final_rank, b.final_rank) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b
            .progress
            .chars_typed
            .cmp(&a.progress.chars_typed)
            .then(a.registration.cmp(&b.registration)),
    }
}

//! Local typing cursor.
//!
//! The server owns the authoritative count; this only tracks where the
//! player is inside the prompt so the next `progress` frame can be built.
//! The first `state` snapshot of a connection overwrites the local cursor;
//! later ones only move it forward, since a broadcast snapshot can predate
//! progress this client already sent.

use std::time::Duration;

use keyrace_server::infrastructure::dto::websocket::{RaceStateKind, RaceStateMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedProgress {
    pub chars_typed: u32,
    pub errors: u32,
}

#[derive(Debug, Clone)]
pub struct TypingState {
    prompt: Vec<char>,
    cursor: usize,
    errors: u32,
    race_state: Option<RaceStateKind>,
    /// Whether the current connection has delivered a snapshot yet
    synced: bool,
}

impl TypingState {
    pub fn new() -> Self {
        Self {
            prompt: Vec::new(),
            cursor: 0,
            errors: 0,
            race_state: None,
            synced: false,
        }
    }

    /// A new connection is starting; its first snapshot is taken as-is.
    pub fn begin_connection(&mut self) {
        self.synced = false;
    }

    /// Merge the server's view of this participant.
    pub fn sync(&mut self, snapshot: &RaceStateMessage) {
        self.prompt = snapshot.prompt.chars().collect();
        self.race_state = Some(snapshot.state);
        let Some(me) = snapshot
            .participants
            .iter()
            .find(|p| p.participant_id == snapshot.you)
        else {
            return;
        };

        let server_cursor = me.chars_typed as usize;
        if self.synced {
            self.cursor = self.cursor.max(server_cursor);
            self.errors = self.errors.max(me.errors);
        } else {
            self.cursor = server_cursor;
            self.errors = me.errors;
            self.synced = true;
        }
        self.cursor = self.cursor.min(self.prompt.len());
    }

    pub fn is_racing(&self) -> bool {
        self.race_state == Some(RaceStateKind::Racing)
    }

    pub fn is_complete(&self) -> bool {
        !self.prompt.is_empty() && self.cursor >= self.prompt.len()
    }

    pub fn progress(&self) -> TypedProgress {
        TypedProgress {
            chars_typed: u32::try_from(self.cursor).unwrap_or(u32::MAX),
            errors: self.errors,
        }
    }

    /// What is still left to type
    pub fn remaining(&self) -> String {
        self.prompt[self.cursor.min(self.prompt.len())..]
            .iter()
            .collect()
    }

    /// Apply one typed line.
    ///
    /// Characters matching the prompt from the cursor advance it; everything
    /// after the first mismatch counts as an error. A line boundary stands in
    /// for a single space in the prompt. Returns `None` outside a race or
    /// when nothing changed.
    pub fn type_line(&mut self, line: &str) -> Option<TypedProgress> {
        if !self.is_racing() || self.is_complete() {
            return None;
        }
        let before = self.progress();

        if self.cursor > 0 && self.prompt.get(self.cursor) == Some(&' ') && !line.starts_with(' ') {
            self.cursor += 1;
        }

        let typed: Vec<char> = line.chars().collect();
        let matched = typed
            .iter()
            .zip(&self.prompt[self.cursor..])
            .take_while(|(typed, expected)| typed == expected)
            .count();
        self.cursor += matched;
        self.errors += u32::try_from(typed.len() - matched).unwrap_or(u32::MAX);

        let after = self.progress();
        (after != before).then_some(after)
    }

    /// Advance by `chars` correct characters (bot mode).
    pub fn advance(&mut self, chars: u32) -> Option<TypedProgress> {
        if !self.is_racing() || self.is_complete() || chars == 0 {
            return None;
        }
        self.cursor = (self.cursor + chars as usize).min(self.prompt.len());
        Some(self.progress())
    }
}

impl Default for TypingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated typist for bot mode
#[derive(Debug, Clone)]
pub struct Autotyper {
    chars_per_sec: f64,
    carry: f64,
}

impl Autotyper {
    /// One "word" is five characters.
    pub fn new(wpm: f64) -> Self {
        Self {
            chars_per_sec: wpm.max(0.0) * 5.0 / 60.0,
            carry: 0.0,
        }
    }

    /// Whole characters typed during `elapsed`
    pub fn tick(&mut self, elapsed: Duration) -> u32 {
        self.carry += self.chars_per_sec * elapsed.as_secs_f64();
        let whole = self.carry.floor();
        self.carry -= whole;
        whole as u32
    }
}

//! Per-conversation turn state.

use crate::random::RandomSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Which path a counted turn takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPath {
    Normal,
    Terminate,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    turn_count: u32,
    termination_threshold: u32,
    ended: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    /// Threshold is drawn once here, uniformly from `lo..=hi`, and never changes.
    pub fn new(lo: u32, hi: u32, rng: &mut dyn RandomSource) -> Self {
        Self::with_threshold(rng.int_inclusive(lo, hi))
    }

    pub fn with_threshold(termination_threshold: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            turn_count: 0,
            termination_threshold,
            ended: false,
            created_at: now,
            last_active: now,
        }
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn termination_threshold(&self) -> u32 {
        self.termination_threshold
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Count one accepted turn and decide its path. The turn that first
    /// reaches the threshold ends the session.
    ///
    /// Returns `None` once the session has ended; nothing is mutated then.
    pub fn record_turn(&mut self) -> Option<TurnPath> {
        if self.ended {
            return None;
        }
        self.turn_count += 1;
        self.last_active = Utc::now();
        if self.turn_count >= self.termination_threshold {
            self.ended = true;
            return Some(TurnPath::Terminate);
        }
        Some(TurnPath::Normal)
    }
}

//! Deferred renders on an injectable clock.
//!
//! Captions are queued with a due time instead of spawning timers, so the
//! "content before caption" ordering can be checked by advancing a manual
//! clock.

use std::collections::BinaryHeap;
use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Time elapsed since some fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Work a conversation has promised to render later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    SourceCaption { label: String, url: String },
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    due: Duration,
    seq: u64,
    task: Deferred,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

pub struct Scheduler {
    clock: Arc<dyn Clock>,
    queue: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, delay: Duration, task: Deferred) {
        let due = self.clock.now() + delay;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry { due, seq, task }));
    }

    /// Remove and return every task whose due time has passed, earliest first.
    /// Tasks due at the same instant keep their scheduling order.
    pub fn take_due(&mut self) -> Vec<Deferred> {
        let now = self.clock.now();
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.due > now {
                break;
            }
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    /// How long until the next task is due; zero when one is already overdue.
    pub fn next_due_in(&self) -> Option<Duration> {
        let Reverse(next) = self.queue.peek()?;
        Some(next.due.saturating_sub(self.clock.now()))
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

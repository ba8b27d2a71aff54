//! Simulation clock and deferred actions
//!
//! Time advances in fixed ticks. Work that must happen later (train departures
//! after a dwell, incident resolutions) is scheduled on the
//! [`DeferredActionQueue`] and executed by the tick that first reaches its fire
//! time. Actions due at the same instant run in the order they were scheduled.

use crate::simulation::Incident;
use crate::types::TrainId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Fixed-step simulation clock
#[derive(Debug, Clone)]
pub struct SimulationClock {
    elapsed: f64,
    tick_count: u64,
    tick_interval: f64,
}

impl SimulationClock {
    /// Create a clock at time zero
    pub fn new(tick_interval: f64) -> Self {
        Self { elapsed: 0.0, tick_count: 0, tick_interval }
    }

    /// Advance one tick. Returns the step length.
    pub fn advance(&mut self) -> f64 {
        self.tick_count += 1;
        self.elapsed = self.tick_count as f64 * self.tick_interval;
        self.tick_interval
    }

    /// Simulated seconds since start
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Ticks completed
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Step length in seconds
    pub fn tick_interval(&self) -> f64 {
        self.tick_interval
    }
}

/// Work scheduled for a later tick
#[derive(Debug, Clone)]
pub enum DeferredAction {
    /// Let a train leave its station
    ///
    /// `seq` must still match the train's departure sequence when the action
    /// fires; otherwise the departure was superseded.
    DepartTrain {
        /// Train to dispatch
        train_id: TrainId,
        /// Departure sequence captured at scheduling time
        seq: u64,
    },
    /// Auto-resolve an incident
    ResolveIncident(Incident),
}

#[derive(Debug)]
struct Scheduled {
    fire_at: f64,
    seq: u64,
    action: DeferredAction,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest action first
    fn cmp(&self, other: &Self) -> Ordering {
        other.fire_at.total_cmp(&self.fire_at).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered queue of deferred actions
#[derive(Debug, Default)]
pub struct DeferredActionQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl DeferredActionQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an action at an absolute simulated time
    pub fn schedule(&mut self, fire_at: f64, action: DeferredAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { fire_at, seq, action });
    }

    /// Remove and return every action due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: f64) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|next| next.fire_at <= now) {
            if let Some(scheduled) = self.heap.pop() {
                due.push(scheduled.action);
            }
        }
        due
    }

    /// Fire time of the earliest pending action
    pub fn next_fire_time(&self) -> Option<f64> {
        self.heap.peek().map(|next| next.fire_at)
    }

    /// Pending actions
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

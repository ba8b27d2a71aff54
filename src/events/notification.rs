//! Simulation notifications
//!
//! Every observable change in the network is recorded as a [`SimulationEvent`],
//! stamped with the tick and simulated time it happened at, and buffered in an
//! [`EventLog`]. Presentation layers poll the log (`drain`) after each tick.

use crate::simulation::NetworkMetrics;
use crate::types::{
    EntityRef, GameOverReason, IncidentId, IncidentKind, LineId, LineStatus, SimulationState,
    StationId, StationStatus, TrainId, TrainStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Something that happened in the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// A station changed status
    StationStatusChanged {
        /// Station
        station_id: StationId,
        /// Previous status
        from: StationStatus,
        /// New status
        to: StationStatus,
    },
    /// A line changed status
    LineStatusChanged {
        /// Line
        line_id: LineId,
        /// Previous status
        from: LineStatus,
        /// New status
        to: LineStatus,
    },
    /// A train changed status
    TrainStatusChanged {
        /// Train
        train_id: TrainId,
        /// Previous status
        from: TrainStatus,
        /// New status
        to: TrainStatus,
    },
    /// A train reached a station and exchanged passengers
    TrainArrived {
        /// Train
        train_id: TrainId,
        /// Station
        station_id: StationId,
        /// Passengers that got off
        alighted: u32,
        /// Passengers that got on
        boarded: u32,
        /// Seconds the train will stand at the station
        dwell: f64,
    },
    /// A train left for its next station
    TrainDeparted {
        /// Train
        train_id: TrainId,
        /// Station it left
        from_station: StationId,
        /// Station it is heading to
        to_station: StationId,
    },
    /// Every station on a train's route is broken; the train holds position
    TrainStalled {
        /// Train
        train_id: TrainId,
        /// Its line
        line_id: LineId,
    },
    /// An incident was applied
    IncidentApplied {
        /// Incident
        incident_id: IncidentId,
        /// Kind
        kind: IncidentKind,
        /// Target entity
        target: EntityRef,
        /// Seconds until auto-resolution, if the kind auto-resolves
        duration: Option<f64>,
        /// Passengers added by an overcrowding surge
        surge: Option<u32>,
    },
    /// An incident was chosen but no entity was eligible
    IncidentSkipped {
        /// Kind
        kind: IncidentKind,
    },
    /// An incident ended
    IncidentResolved {
        /// Incident
        incident_id: IncidentId,
        /// Kind
        kind: IncidentKind,
        /// Target entity
        target: EntityRef,
        /// Whether a manual command resolved it before its timer
        manual: bool,
    },
    /// Aggregate metrics after a tick
    MetricsUpdated(NetworkMetrics),
    /// The run state changed
    StateChanged {
        /// Previous state
        from: SimulationState,
        /// New state
        to: SimulationState,
    },
    /// The run ended
    GameOver {
        /// Why
        reason: GameOverReason,
        /// Simulated seconds elapsed
        elapsed: f64,
    },
}

impl SimulationEvent {
    /// Short name of the event type
    pub fn name(&self) -> &'static str {
        match self {
            SimulationEvent::StationStatusChanged { .. } => "station_status_changed",
            SimulationEvent::LineStatusChanged { .. } => "line_status_changed",
            SimulationEvent::TrainStatusChanged { .. } => "train_status_changed",
            SimulationEvent::TrainArrived { .. } => "train_arrived",
            SimulationEvent::TrainDeparted { .. } => "train_departed",
            SimulationEvent::TrainStalled { .. } => "train_stalled",
            SimulationEvent::IncidentApplied { .. } => "incident_applied",
            SimulationEvent::IncidentSkipped { .. } => "incident_skipped",
            SimulationEvent::IncidentResolved { .. } => "incident_resolved",
            SimulationEvent::MetricsUpdated(_) => "metrics_updated",
            SimulationEvent::StateChanged { .. } => "state_changed",
            SimulationEvent::GameOver { .. } => "game_over",
        }
    }
}

/// An event stamped with when it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Tick number
    pub tick: u64,
    /// Simulated seconds since start
    pub time: f64,
    /// The event
    pub event: SimulationEvent,
}

/// Bounded buffer of events waiting to be polled
///
/// When full, the oldest record is dropped and counted.
#[derive(Debug, Clone)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    capacity: usize,
    dropped: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(10_000)
    }
}

impl EventLog {
    /// Create a log holding at most `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: VecDeque::new(), capacity: capacity.max(1), dropped: 0 }
    }

    /// Append an event
    pub fn push(&mut self, tick: u64, time: f64, event: SimulationEvent) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
            self.dropped += 1;
        }
        self.records.push_back(EventRecord { tick, time, event });
    }

    /// Take every buffered record, oldest first
    pub fn drain(&mut self) -> Vec<EventRecord> {
        self.records.drain(..).collect()
    }

    /// Buffered records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

//! Train records
//!
//! A train is bound to one line and follows that line's stations as a cyclic
//! route. The route position (`current_index` / `target_index`) is train-local;
//! the route itself is always read from the registry's line record.

use crate::types::{IncidentId, LineId, Position, StationId, TrainId, TrainStatus};
use serde::{Deserialize, Serialize};

/// A train in the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    /// Unique identifier for the train
    pub id: TrainId,
    /// Line the train runs on
    pub line_id: LineId,
    pub(crate) status: TrainStatus,
    pub(crate) current_station_id: StationId,
    pub(crate) next_station_id: StationId,
    pub(crate) current_index: usize,
    pub(crate) target_index: usize,
    /// Passenger capacity
    pub capacity: u32,
    pub(crate) passenger_count: u32,
    /// Travel speed in world units per second
    pub speed: f64,
    pub(crate) position: Position,
    pub(crate) heading: f64,
    pub(crate) at_station: bool,
    pub(crate) stalled: bool,
    pub(crate) departure_seq: u64,
    pub(crate) active_incident: Option<IncidentId>,
}

impl Train {
    /// Create a train standing at the first stop of `route`
    ///
    /// Returns `None` for an empty route.
    pub fn new(
        id: TrainId,
        line_id: LineId,
        route: &[StationId],
        start: Position,
        capacity: u32,
        speed: f64,
    ) -> Option<Self> {
        let current = route.first()?.clone();
        let target_index = 1 % route.len();
        let next = route[target_index].clone();

        Some(Self {
            id,
            line_id,
            status: TrainStatus::Stopped,
            current_station_id: current,
            next_station_id: next,
            current_index: 0,
            target_index,
            capacity,
            passenger_count: 0,
            speed,
            position: start,
            heading: 0.0,
            at_station: true,
            stalled: false,
            departure_seq: 0,
            active_incident: None,
        })
    }

    /// Current status
    pub fn status(&self) -> TrainStatus {
        self.status
    }

    /// Station the train last stood at
    pub fn current_station_id(&self) -> &StationId {
        &self.current_station_id
    }

    /// Station the train is heading to
    pub fn next_station_id(&self) -> &StationId {
        &self.next_station_id
    }

    /// Route index of the current station
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Route index of the next station
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// Passengers aboard
    pub fn passenger_count(&self) -> u32 {
        self.passenger_count
    }

    /// World position
    pub fn position(&self) -> Position {
        self.position
    }

    /// Heading in radians around the vertical axis (cosmetic)
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Whether the train is standing at its current station
    pub fn is_at_station(&self) -> bool {
        self.at_station
    }

    /// Whether the last target search found every route station broken
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Malfunction incident currently holding the train, if any
    pub fn active_incident(&self) -> Option<IncidentId> {
        self.active_incident
    }

    /// Ratio of passengers aboard to capacity
    pub fn occupancy(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.passenger_count as f64 / self.capacity as f64
    }

    /// Set the passengers aboard, clamped to capacity. Returns the stored value.
    pub fn set_passenger_count(&mut self, count: u32) -> u32 {
        self.passenger_count = count.min(self.capacity);
        self.passenger_count
    }

    /// Board up to `count` passengers. Returns how many boarded.
    pub fn board(&mut self, count: u32) -> u32 {
        let boarded = count.min(self.capacity.saturating_sub(self.passenger_count));
        self.passenger_count += boarded;
        boarded
    }

    /// Everyone gets off. Returns how many alighted.
    pub fn alight_all(&mut self) -> u32 {
        std::mem::take(&mut self.passenger_count)
    }

    /// Take the train out of service
    ///
    /// Returns false when it is already in maintenance. Any pending departure is
    /// invalidated.
    pub(crate) fn enter_maintenance(&mut self, incident: Option<IncidentId>) -> bool {
        if self.status == TrainStatus::Maintenance {
            return false;
        }
        self.status = TrainStatus::Maintenance;
        self.active_incident = incident;
        self.stalled = false;
        self.invalidate_departures();
        true
    }

    /// Bump the departure sequence so that already scheduled departures go stale
    pub(crate) fn invalidate_departures(&mut self) -> u64 {
        self.departure_seq += 1;
        self.departure_seq
    }
}

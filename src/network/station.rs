//! Station records
//!
//! This module contains the Station struct: a network node with a passenger
//! capacity and a health status. Status changes go through
//! [`NetworkRegistry::transition_station`](crate::network::NetworkRegistry::transition_station)
//! so the delay counter always matches the degraded stations.

use crate::types::{IncidentId, LineId, Position, StationConfig, StationId, StationStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What put a station into the Delayed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayCause {
    /// Occupancy crossed the delay threshold
    Occupancy,
    /// The named line was delayed and cascaded onto the station
    Line(LineId),
}

/// A station in the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Unique identifier for the station
    pub id: StationId,
    /// Human-readable name
    pub name: String,
    /// World position
    pub position: Position,
    pub(crate) status: StationStatus,
    pub(crate) passenger_count: u32,
    /// Passenger capacity
    pub max_passengers: u32,
    /// Stations adjacent on any line (symmetric)
    pub connected_stations: BTreeSet<StationId>,
    pub(crate) delay_cause: Option<DelayCause>,
    pub(crate) active_incident: Option<IncidentId>,
}

impl Station {
    /// Create a station from its configuration, clamping the initial passengers
    pub fn new(config: &StationConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            position: config.position,
            status: StationStatus::Normal,
            passenger_count: config.initial_passengers.min(config.max_passengers),
            max_passengers: config.max_passengers,
            connected_stations: BTreeSet::new(),
            delay_cause: None,
            active_incident: None,
        }
    }

    /// Current status
    pub fn status(&self) -> StationStatus {
        self.status
    }

    /// Passengers waiting at the station
    pub fn passenger_count(&self) -> u32 {
        self.passenger_count
    }

    /// Why the station is delayed, if it is
    pub fn delay_cause(&self) -> Option<&DelayCause> {
        self.delay_cause.as_ref()
    }

    /// Breakdown incident currently holding the station, if any
    pub fn active_incident(&self) -> Option<IncidentId> {
        self.active_incident
    }

    /// Ratio of waiting passengers to capacity
    pub fn occupancy(&self) -> f64 {
        if self.max_passengers == 0 {
            return 1.0;
        }
        self.passenger_count as f64 / self.max_passengers as f64
    }

    /// Free space left before the capacity ceiling
    pub fn available_space(&self) -> u32 {
        self.max_passengers.saturating_sub(self.passenger_count)
    }

    /// Whether the station is at its capacity ceiling
    pub fn is_full(&self) -> bool {
        self.passenger_count >= self.max_passengers
    }

    /// Set the passenger count, clamped to capacity. Returns the stored value.
    pub fn set_passenger_count(&mut self, count: u32) -> u32 {
        self.passenger_count = count.min(self.max_passengers);
        self.passenger_count
    }

    /// Add passengers, clamped to capacity
    ///
    /// Returns how many were actually added and whether the ceiling cut the
    /// addition short.
    pub fn add_passengers(&mut self, count: u32) -> (u32, bool) {
        let added = count.min(self.available_space());
        self.passenger_count += added;
        (added, added < count)
    }

    /// Remove up to `count` passengers. Returns how many were removed.
    pub fn remove_passengers(&mut self, count: u32) -> u32 {
        let removed = count.min(self.passenger_count);
        self.passenger_count -= removed;
        removed
    }

    /// Whether another station is adjacent on some line
    pub fn is_connected_to(&self, other: &StationId) -> bool {
        self.connected_stations.contains(other)
    }

    pub(crate) fn connect(&mut self, other: &StationId) {
        if other != &self.id {
            self.connected_stations.insert(other.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(max: u32, initial: u32) -> Station {
        Station::new(&StationConfig {
            id: StationId::from("s1"),
            name: "Station One".to_string(),
            position: Position::default(),
            max_passengers: max,
            initial_passengers: initial,
        })
    }

    #[test]
    fn test_station_creation_clamps_initial_passengers() {
        let s = station(100, 250);
        assert_eq!(s.passenger_count(), 100);
        assert_eq!(s.status(), StationStatus::Normal);
        assert!(s.is_full());
        assert!(s.delay_cause().is_none());
    }

    #[test]
    fn test_add_passengers_clamps_at_capacity() {
        let mut s = station(500, 450);
        let (added, clamped) = s.add_passengers(60);
        assert_eq!(added, 50);
        assert!(clamped);
        assert_eq!(s.passenger_count(), 500);
        assert_eq!(s.occupancy(), 1.0);

        let (added, clamped) = s.add_passengers(0);
        assert_eq!(added, 0);
        assert!(!clamped);
    }

    #[test]
    fn test_remove_passengers_never_goes_negative() {
        let mut s = station(500, 30);
        assert_eq!(s.remove_passengers(50), 30);
        assert_eq!(s.passenger_count(), 0);
        assert_eq!(s.available_space(), 500);
    }

    #[test]
    fn test_connect_ignores_self() {
        let mut s = station(500, 0);
        s.connect(&StationId::from("s1"));
        s.connect(&StationId::from("s2"));
        assert_eq!(s.connected_stations.len(), 1);
        assert!(s.is_connected_to(&StationId::from("s2")));
    }
}

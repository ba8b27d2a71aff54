//! Network registry and entity lookup
//!
//! This module contains the NetworkRegistry: the single owner of every station,
//! line and train record. Other components hold identifiers only and resolve them
//! here on each use.
//!
//! The registry also owns the delay counter. Every station status change goes
//! through [`NetworkRegistry::transition_station`], which adjusts the counter when
//! a station enters or leaves the degraded set.

use crate::network::{DelayCause, Line, Station, Train};
use crate::types::{LineId, LineStatus, StationId, StationStatus, TrainId, TrainStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A station status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationTransition {
    /// Station that changed
    pub station_id: StationId,
    /// Previous status
    pub from: StationStatus,
    /// New status
    pub to: StationStatus,
}

/// Arena of all network entities with id lookup
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    stations: Vec<Station>,
    lines: Vec<Line>,
    trains: Vec<Train>,
    station_index: HashMap<StationId, usize>,
    line_index: HashMap<LineId, usize>,
    train_index: HashMap<TrainId, usize>,
    delay_count: u32,
}

impl NetworkRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a station. Returns false (and keeps the existing one) on a duplicate id.
    pub fn add_station(&mut self, station: Station) -> bool {
        if self.station_index.contains_key(&station.id) {
            return false;
        }
        if station.status.is_degraded() {
            self.delay_count += 1;
        }
        self.station_index.insert(station.id.clone(), self.stations.len());
        self.stations.push(station);
        true
    }

    /// Add a line. Returns false on a duplicate id.
    pub fn add_line(&mut self, line: Line) -> bool {
        if self.line_index.contains_key(&line.id) {
            return false;
        }
        self.line_index.insert(line.id.clone(), self.lines.len());
        self.lines.push(line);
        true
    }

    /// Add a train. Returns false on a duplicate id.
    pub fn add_train(&mut self, train: Train) -> bool {
        if self.train_index.contains_key(&train.id) {
            return false;
        }
        self.train_index.insert(train.id.clone(), self.trains.len());
        self.trains.push(train);
        true
    }

    /// Get a station by ID
    pub fn station(&self, id: &StationId) -> Option<&Station> {
        self.station_index.get(id).and_then(|&idx| self.stations.get(idx))
    }

    /// Get a mutable station by ID
    ///
    /// Status is not writable through this reference; use
    /// [`transition_station`](Self::transition_station).
    pub fn station_mut(&mut self, id: &StationId) -> Option<&mut Station> {
        self.station_index.get(id).and_then(|&idx| self.stations.get_mut(idx))
    }

    /// Get a line by ID
    pub fn line(&self, id: &LineId) -> Option<&Line> {
        self.line_index.get(id).and_then(|&idx| self.lines.get(idx))
    }

    pub(crate) fn line_mut(&mut self, id: &LineId) -> Option<&mut Line> {
        self.line_index.get(id).and_then(|&idx| self.lines.get_mut(idx))
    }

    /// Get a train by ID
    pub fn train(&self, id: &TrainId) -> Option<&Train> {
        self.train_index.get(id).and_then(|&idx| self.trains.get(idx))
    }

    /// Get a mutable train by ID
    pub fn train_mut(&mut self, id: &TrainId) -> Option<&mut Train> {
        self.train_index.get(id).and_then(|&idx| self.trains.get_mut(idx))
    }

    /// All stations in insertion order
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    /// All lines in insertion order
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// All trains in insertion order
    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    /// Number of stations
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Number of lines
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of trains
    pub fn train_count(&self) -> usize {
        self.trains.len()
    }

    /// Ids of stations currently in `status`, in insertion order
    pub fn stations_with_status(&self, status: StationStatus) -> Vec<StationId> {
        self.stations.iter().filter(|s| s.status == status).map(|s| s.id.clone()).collect()
    }

    /// Ids of lines currently in `status`, in insertion order
    pub fn lines_with_status(&self, status: LineStatus) -> Vec<LineId> {
        self.lines.iter().filter(|l| l.status == status).map(|l| l.id.clone()).collect()
    }

    /// Ids of trains currently in `status`, in insertion order
    pub fn trains_with_status(&self, status: TrainStatus) -> Vec<TrainId> {
        self.trains.iter().filter(|t| t.status == status).map(|t| t.id.clone()).collect()
    }

    /// Ids of all trains, in insertion order
    pub fn train_ids(&self) -> Vec<TrainId> {
        self.trains.iter().map(|t| t.id.clone()).collect()
    }

    /// Lines serving a station
    pub fn lines_containing<'a>(
        &'a self,
        station_id: &'a StationId,
    ) -> impl Iterator<Item = &'a Line> + 'a {
        self.lines.iter().filter(move |line| line.contains(station_id))
    }

    /// Straight-line distance between two stations
    pub fn distance_between(&self, a: &StationId, b: &StationId) -> Option<f64> {
        let from = self.station(a)?;
        let to = self.station(b)?;
        Some(from.position.distance_to(&to.position))
    }

    /// Change a station's status, keeping the delay counter in step
    ///
    /// Returns the transition, or `None` when the station is unknown or already in
    /// `to` (the cause is still updated in that case). The counter is incremented
    /// when a station enters Delayed/Broken from Normal and decremented (floored at
    /// zero) when it returns to Normal.
    pub fn transition_station(
        &mut self,
        id: &StationId,
        to: StationStatus,
        cause: Option<DelayCause>,
    ) -> Option<StationTransition> {
        let idx = *self.station_index.get(id)?;
        let station = &mut self.stations[idx];
        let from = station.status;

        station.delay_cause = if to == StationStatus::Delayed { cause } else { None };
        if to != StationStatus::Broken {
            station.active_incident = None;
        }

        if from == to {
            return None;
        }
        station.status = to;

        match (from.is_degraded(), to.is_degraded()) {
            (false, true) => self.delay_count += 1,
            (true, false) => self.delay_count = self.delay_count.saturating_sub(1),
            _ => {}
        }

        debug!(
            station = %id,
            from = %from,
            to = %to,
            delay_count = self.delay_count,
            "Station status changed"
        );

        Some(StationTransition { station_id: id.clone(), from, to })
    }

    /// The delay counter
    pub fn delay_count(&self) -> u32 {
        self.delay_count
    }

    /// Recount the stations in Delayed or Broken status
    pub fn count_degraded_stations(&self) -> u32 {
        self.stations.iter().filter(|s| s.status.is_degraded()).count() as u32
    }

    /// Reset the delay counter to the degraded station count if it drifted
    ///
    /// Returns the `(counter, actual)` pair when a correction was needed.
    pub fn resync_delay_count(&mut self) -> Option<(u32, u32)> {
        let actual = self.count_degraded_stations();
        if actual == self.delay_count {
            return None;
        }
        let previous = self.delay_count;
        warn!(counter = previous, actual, "Delay counter drifted from station statuses, resyncing");
        self.delay_count = actual;
        Some((previous, actual))
    }

    /// Passengers waiting at stations
    pub fn waiting_passengers(&self) -> u64 {
        self.stations.iter().map(|s| s.passenger_count as u64).sum()
    }

    /// Passengers aboard trains
    pub fn in_transit_passengers(&self) -> u64 {
        self.trains.iter().map(|t| t.passenger_count as u64).sum()
    }

    /// Passengers in the network, waiting plus aboard
    pub fn total_passengers(&self) -> u64 {
        self.waiting_passengers() + self.in_transit_passengers()
    }

    /// Check the registry invariants
    ///
    /// Returns a description of every violation found; an empty list means the
    /// registry is consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for station in &self.stations {
            if station.passenger_count > station.max_passengers {
                violations.push(format!(
                    "Station {} holds {} passengers over capacity {}",
                    station.id, station.passenger_count, station.max_passengers
                ));
            }
        }

        for train in &self.trains {
            if train.passenger_count > train.capacity {
                violations.push(format!(
                    "Train {} carries {} passengers over capacity {}",
                    train.id, train.passenger_count, train.capacity
                ));
            }
            match self.line(&train.line_id) {
                Some(line) if line.contains(&train.next_station_id) => {}
                Some(_) => violations.push(format!(
                    "Train {} targets {} which is not on line {}",
                    train.id, train.next_station_id, train.line_id
                )),
                None => violations
                    .push(format!("Train {} runs on unknown line {}", train.id, train.line_id)),
            }
        }

        for line in &self.lines {
            for station_id in &line.station_ids {
                if self.station(station_id).is_none() {
                    violations.push(format!(
                        "Line {} references unknown station {}",
                        line.id, station_id
                    ));
                }
            }
        }

        let actual = self.count_degraded_stations();
        if actual != self.delay_count {
            violations.push(format!(
                "Delay counter {} does not match {} degraded stations",
                self.delay_count, actual
            ));
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, StationConfig};

    fn registry_with_stations(ids: &[&str]) -> NetworkRegistry {
        let mut registry = NetworkRegistry::new();
        for id in ids {
            registry.add_station(Station::new(&StationConfig {
                id: StationId::from(*id),
                name: id.to_uppercase(),
                position: Position::default(),
                max_passengers: 500,
                initial_passengers: 0,
            }));
        }
        registry
    }

    #[test]
    fn test_registry_lookup() {
        let registry = registry_with_stations(&["a", "b"]);
        assert_eq!(registry.station_count(), 2);
        assert_eq!(registry.station(&StationId::from("b")).unwrap().name, "B");
        assert!(registry.station(&StationId::from("zzz")).is_none());
        assert!(registry.line(&LineId::from("red")).is_none());
        assert!(registry.train(&TrainId::from("train_1")).is_none());
    }

    #[test]
    fn test_duplicate_station_rejected() {
        let mut registry = registry_with_stations(&["a"]);
        let duplicate = registry.stations()[0].clone();
        assert!(!registry.add_station(duplicate));
        assert_eq!(registry.station_count(), 1);
    }

    #[test]
    fn test_transition_adjusts_delay_counter() {
        let mut registry = registry_with_stations(&["a", "b"]);
        let a = StationId::from("a");

        let t = registry
            .transition_station(&a, StationStatus::Delayed, Some(DelayCause::Occupancy))
            .unwrap();
        assert_eq!((t.from, t.to), (StationStatus::Normal, StationStatus::Delayed));
        assert_eq!(registry.delay_count(), 1);

        // Delayed -> Broken stays degraded
        registry.transition_station(&a, StationStatus::Broken, None).unwrap();
        assert_eq!(registry.delay_count(), 1);
        assert!(registry.station(&a).unwrap().delay_cause().is_none());

        registry.transition_station(&a, StationStatus::Normal, None).unwrap();
        assert_eq!(registry.delay_count(), 0);
        assert!(registry.check_invariants().is_empty());
    }

    #[test]
    fn test_transition_to_same_status_is_noop() {
        let mut registry = registry_with_stations(&["a"]);
        let a = StationId::from("a");
        assert!(registry.transition_station(&a, StationStatus::Normal, None).is_none());
        assert_eq!(registry.delay_count(), 0);
        assert!(registry
            .transition_station(&StationId::from("nope"), StationStatus::Broken, None)
            .is_none());
    }

    #[test]
    fn test_resync_delay_count() {
        let mut registry = registry_with_stations(&["a", "b"]);
        registry.transition_station(&StationId::from("a"), StationStatus::Broken, None);
        assert!(registry.resync_delay_count().is_none());

        registry.delay_count = 7;
        assert_eq!(registry.resync_delay_count(), Some((7, 1)));
        assert_eq!(registry.delay_count(), 1);
    }

    #[test]
    fn test_passenger_totals() {
        let mut registry = registry_with_stations(&["a", "b"]);
        registry.station_mut(&StationId::from("a")).unwrap().set_passenger_count(120);
        registry.station_mut(&StationId::from("b")).unwrap().set_passenger_count(30);
        assert_eq!(registry.waiting_passengers(), 150);
        assert_eq!(registry.in_transit_passengers(), 0);
        assert_eq!(registry.total_passengers(), 150);
    }
}

//! Line records
//!
//! A line is a loop-closed, ordered sequence of stations served by trains.

use crate::types::{IncidentId, LineConfig, LineId, LineStatus, StationId};
use serde::{Deserialize, Serialize};

/// A line in the network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    /// Unique identifier for the line
    pub id: LineId,
    /// Human-readable name
    pub name: String,
    /// Ordered station ids; the last connects back to the first
    pub station_ids: Vec<StationId>,
    pub(crate) status: LineStatus,
    /// Trains spawned for this line at start
    pub nominal_train_count: u32,
    /// Speed of trains spawned for this line
    pub train_speed: f64,
    pub(crate) active_incident: Option<IncidentId>,
}

impl Line {
    /// Create a line from its configuration
    pub fn new(config: &LineConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            station_ids: config.station_ids.clone(),
            status: LineStatus::Active,
            nominal_train_count: config.default_train_count,
            train_speed: config.train_speed,
            active_incident: None,
        }
    }

    /// Current status
    pub fn status(&self) -> LineStatus {
        self.status
    }

    /// Delay incident currently holding the line, if any
    pub fn active_incident(&self) -> Option<IncidentId> {
        self.active_incident
    }

    /// Number of stops on the loop
    pub fn route_len(&self) -> usize {
        self.station_ids.len()
    }

    /// Whether the line serves a station
    pub fn contains(&self, station_id: &StationId) -> bool {
        self.station_ids.contains(station_id)
    }

    /// Station at a route index, wrapping around the loop
    pub fn station_at(&self, index: usize) -> Option<&StationId> {
        if self.station_ids.is_empty() {
            return None;
        }
        self.station_ids.get(index % self.station_ids.len())
    }

    /// First route index of a station
    pub fn index_of(&self, station_id: &StationId) -> Option<usize> {
        self.station_ids.iter().position(|id| id == station_id)
    }

    /// Index after `index`, looping back to 0 at the end
    pub fn next_index(&self, index: usize) -> usize {
        if self.station_ids.is_empty() {
            return 0;
        }
        (index + 1) % self.station_ids.len()
    }

    /// Adjacent station pairs along the loop, including the closing edge
    pub fn segments(&self) -> impl Iterator<Item = (&StationId, &StationId)> + '_ {
        let len = self.station_ids.len();
        (0..len).map(move |i| (&self.station_ids[i], &self.station_ids[(i + 1) % len]))
    }
}

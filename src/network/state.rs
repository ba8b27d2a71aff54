//! Station and line state machines
//!
//! Stations move between Normal, Delayed and Broken:
//!
//! - Normal → Delayed when occupancy reaches [`occupancy::DELAY_THRESHOLD`] or when
//!   a line serving the station is delayed
//! - Delayed → Normal when a crowding delay drops below
//!   [`occupancy::RECOVERY_THRESHOLD`], or when the delaying line recovers
//! - Normal/Delayed → Broken only through an incident
//! - Broken → Normal only through a repair
//!
//! Lines move between Active and Delayed. Delaying a line cascades onto every
//! Normal station it serves; restoring it releases only the stations it degraded.

use crate::network::{DelayCause, NetworkRegistry, StationTransition};
use crate::types::{occupancy, IncidentId, LineId, LineStatus, StationId, StationStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// A line status change and the station changes it caused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineUpdate {
    /// Line that changed
    pub line_id: LineId,
    /// Previous status
    pub from: LineStatus,
    /// New status
    pub to: LineStatus,
    /// Station transitions caused by the cascade
    pub stations: Vec<StationTransition>,
}

/// Re-evaluate a station's status from its occupancy
///
/// Broken stations are never changed here. A delay caused by a line is not
/// cleared by low occupancy; it clears when the line recovers.
pub fn evaluate_occupancy(
    registry: &mut NetworkRegistry,
    station_id: &StationId,
) -> Option<StationTransition> {
    let station = registry.station(station_id)?;
    let ratio = station.occupancy();

    match station.status() {
        StationStatus::Normal if ratio >= occupancy::DELAY_THRESHOLD => {
            debug!(station = %station_id, occupancy = ratio, "Station crowded, delaying");
            registry.transition_station(
                station_id,
                StationStatus::Delayed,
                Some(DelayCause::Occupancy),
            )
        }
        StationStatus::Delayed
            if ratio < occupancy::RECOVERY_THRESHOLD
                && station.delay_cause() == Some(&DelayCause::Occupancy) =>
        {
            debug!(station = %station_id, occupancy = ratio, "Station decongested");
            registry.transition_station(station_id, StationStatus::Normal, None)
        }
        _ => None,
    }
}

/// Break a Normal or Delayed station on behalf of an incident
pub fn break_station(
    registry: &mut NetworkRegistry,
    station_id: &StationId,
    incident: Option<IncidentId>,
) -> Option<StationTransition> {
    let status = registry.station(station_id)?.status();
    if status == StationStatus::Broken {
        return None;
    }
    let transition = registry.transition_station(station_id, StationStatus::Broken, None);
    if let Some(station) = registry.station_mut(station_id) {
        station.active_incident = incident;
    }
    transition
}

/// Force a station back to Normal
///
/// Repairing an already Normal station is a no-op and leaves the delay counter
/// untouched.
pub fn repair_station(
    registry: &mut NetworkRegistry,
    station_id: &StationId,
) -> Option<StationTransition> {
    registry.transition_station(station_id, StationStatus::Normal, None)
}

/// Delay an Active line and cascade onto its Normal stations
///
/// Returns `None` when the line is unknown or not Active.
pub fn delay_line(
    registry: &mut NetworkRegistry,
    line_id: &LineId,
    incident: Option<IncidentId>,
) -> Option<LineUpdate> {
    let line = registry.line_mut(line_id)?;
    if line.status != LineStatus::Active {
        return None;
    }
    line.status = LineStatus::Delayed;
    line.active_incident = incident;
    let route = line.station_ids.clone();

    let mut seen = HashSet::new();
    let mut stations = Vec::new();
    for station_id in route.iter().filter(|id| seen.insert(*id)) {
        let is_normal =
            registry.station(station_id).map(|s| s.status() == StationStatus::Normal);
        if is_normal == Some(true) {
            if let Some(t) = registry.transition_station(
                station_id,
                StationStatus::Delayed,
                Some(DelayCause::Line(line_id.clone())),
            ) {
                stations.push(t);
            }
        }
    }

    info!(line = %line_id, stations = stations.len(), "Line delayed");
    Some(LineUpdate {
        line_id: line_id.clone(),
        from: LineStatus::Active,
        to: LineStatus::Delayed,
        stations,
    })
}

/// Return a Delayed line to Active and release the stations it degraded
///
/// A released station whose occupancy still warrants a delay, or that another
/// delayed line also serves, stays Delayed with its cause re-attributed.
/// Returns `None` when the line is unknown or not Delayed.
pub fn restore_line(registry: &mut NetworkRegistry, line_id: &LineId) -> Option<LineUpdate> {
    let line = registry.line_mut(line_id)?;
    if line.status != LineStatus::Delayed {
        return None;
    }
    line.status = LineStatus::Active;
    line.active_incident = None;
    let route = line.station_ids.clone();
    let own_cause = DelayCause::Line(line_id.clone());

    let mut seen = HashSet::new();
    let mut stations = Vec::new();
    for station_id in route.iter().filter(|id| seen.insert(*id)) {
        let (status, cause, ratio) = match registry.station(station_id) {
            Some(s) => (s.status(), s.delay_cause().cloned(), s.occupancy()),
            None => continue,
        };
        if status != StationStatus::Delayed || cause.as_ref() != Some(&own_cause) {
            continue;
        }

        let other_delayed_line = registry
            .lines_containing(station_id)
            .find(|l| l.id != *line_id && l.status() == LineStatus::Delayed)
            .map(|l| l.id.clone());

        let transition = if let Some(other) = other_delayed_line {
            registry.transition_station(
                station_id,
                StationStatus::Delayed,
                Some(DelayCause::Line(other)),
            )
        } else if ratio >= occupancy::DELAY_THRESHOLD {
            registry.transition_station(
                station_id,
                StationStatus::Delayed,
                Some(DelayCause::Occupancy),
            )
        } else {
            registry.transition_station(station_id, StationStatus::Normal, None)
        };
        stations.extend(transition);
    }

    info!(line = %line_id, released = stations.len(), "Line restored");
    Some(LineUpdate {
        line_id: line_id.clone(),
        from: LineStatus::Delayed,
        to: LineStatus::Active,
        stations,
    })
}

//! Enumeration types for the metro network simulator
//!
//! This module contains all enumeration types used throughout the simulation system,
//! including entity statuses, incident kinds, run states and report formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Health status of a station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationStatus {
    /// Operating normally
    Normal,
    /// Degraded by crowding or by a delayed line
    Delayed,
    /// Out of service until repaired
    Broken,
}

impl StationStatus {
    /// Whether this status counts towards the delay counter
    pub fn is_degraded(&self) -> bool {
        matches!(self, StationStatus::Delayed | StationStatus::Broken)
    }
}

impl fmt::Display for StationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationStatus::Normal => write!(f, "Normal"),
            StationStatus::Delayed => write!(f, "Delayed"),
            StationStatus::Broken => write!(f, "Broken"),
        }
    }
}

impl FromStr for StationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(StationStatus::Normal),
            "delayed" => Ok(StationStatus::Delayed),
            "broken" => Ok(StationStatus::Broken),
            _ => Err(format!("Unknown station status: {}", s)),
        }
    }
}

/// Operating status of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineStatus {
    /// Running normally
    Active,
    /// Delayed by an incident; its stations are degraded with it
    Delayed,
    /// Reserved; no incident currently closes a line
    Closed,
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineStatus::Active => write!(f, "Active"),
            LineStatus::Delayed => write!(f, "Delayed"),
            LineStatus::Closed => write!(f, "Closed"),
        }
    }
}

impl FromStr for LineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LineStatus::Active),
            "delayed" => Ok(LineStatus::Delayed),
            "closed" => Ok(LineStatus::Closed),
            _ => Err(format!("Unknown line status: {}", s)),
        }
    }
}

/// Motion status of a train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainStatus {
    /// Travelling towards its next station
    Moving,
    /// Standing at a station (dwelling, waiting to start, or stalled)
    Stopped,
    /// Taken out of service by a malfunction or a manual stop
    Maintenance,
}

impl fmt::Display for TrainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainStatus::Moving => write!(f, "Moving"),
            TrainStatus::Stopped => write!(f, "Stopped"),
            TrainStatus::Maintenance => write!(f, "Maintenance"),
        }
    }
}

impl FromStr for TrainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "moving" => Ok(TrainStatus::Moving),
            "stopped" => Ok(TrainStatus::Stopped),
            "maintenance" => Ok(TrainStatus::Maintenance),
            _ => Err(format!("Unknown train status: {}", s)),
        }
    }
}

/// Kinds of incidents that perturb the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidentKind {
    /// A normal station breaks down until repaired
    StationBreakdown,
    /// A moving train goes into maintenance
    TrainMalfunction,
    /// An active line is delayed along with its stations
    LineDelay,
    /// A passenger surge hits a normal station
    Overcrowding,
    /// Reserved; never generated
    SignalFailure,
    /// Reserved; never generated
    TrackMaintenance,
}

impl IncidentKind {
    /// Kinds the incident scheduler knows how to apply
    pub const GENERATED: [IncidentKind; 4] = [
        IncidentKind::StationBreakdown,
        IncidentKind::LineDelay,
        IncidentKind::Overcrowding,
        IncidentKind::TrainMalfunction,
    ];

    /// Whether this kind is declared but never produced
    pub fn is_reserved(&self) -> bool {
        matches!(self, IncidentKind::SignalFailure | IncidentKind::TrackMaintenance)
    }

    /// Whether incidents of this kind resolve themselves after a timer
    pub fn auto_resolves(&self) -> bool {
        matches!(
            self,
            IncidentKind::StationBreakdown | IncidentKind::LineDelay | IncidentKind::TrainMalfunction
        )
    }

    /// Kind of entity this incident targets
    pub fn target_kind(&self) -> EntityKind {
        match self {
            IncidentKind::StationBreakdown | IncidentKind::Overcrowding => EntityKind::Station,
            IncidentKind::LineDelay | IncidentKind::SignalFailure => EntityKind::Line,
            IncidentKind::TrainMalfunction => EntityKind::Train,
            IncidentKind::TrackMaintenance => EntityKind::Line,
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentKind::StationBreakdown => write!(f, "Station Breakdown"),
            IncidentKind::TrainMalfunction => write!(f, "Train Malfunction"),
            IncidentKind::LineDelay => write!(f, "Line Delay"),
            IncidentKind::Overcrowding => write!(f, "Overcrowding"),
            IncidentKind::SignalFailure => write!(f, "Signal Failure"),
            IncidentKind::TrackMaintenance => write!(f, "Track Maintenance"),
        }
    }
}

impl FromStr for IncidentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(&['_', '-'][..], " ").as_str() {
            "station breakdown" | "stationbreakdown" | "breakdown" => {
                Ok(IncidentKind::StationBreakdown)
            }
            "train malfunction" | "trainmalfunction" | "malfunction" => {
                Ok(IncidentKind::TrainMalfunction)
            }
            "line delay" | "linedelay" | "delay" => Ok(IncidentKind::LineDelay),
            "overcrowding" => Ok(IncidentKind::Overcrowding),
            "signal failure" | "signalfailure" => Ok(IncidentKind::SignalFailure),
            "track maintenance" | "trackmaintenance" => Ok(IncidentKind::TrackMaintenance),
            _ => Err(format!("Unknown incident kind: {}", s)),
        }
    }
}

/// Kind of network entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Station
    Station,
    /// Line
    Line,
    /// Train
    Train,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Station => write!(f, "Station"),
            EntityKind::Line => write!(f, "Line"),
            EntityKind::Train => write!(f, "Train"),
        }
    }
}

/// Lifecycle state of a simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationState {
    /// Built but not started
    Initializing,
    /// Ticking
    Running,
    /// Ticks are ignored; commands stay live
    Paused,
    /// Terminal
    GameOver,
}

impl SimulationState {
    /// Whether manual commands are accepted in this state
    pub fn accepts_commands(&self) -> bool {
        matches!(self, SimulationState::Running | SimulationState::Paused)
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationState::Initializing => write!(f, "Initializing"),
            SimulationState::Running => write!(f, "Running"),
            SimulationState::Paused => write!(f, "Paused"),
            SimulationState::GameOver => write!(f, "Game Over"),
        }
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverReason {
    /// The delay counter reached its threshold
    TooManyDelays,
    /// Total passengers in the network reached their threshold
    TooManyPassengers,
    /// The configured run duration elapsed
    DurationElapsed,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOverReason::TooManyDelays => write!(f, "Too many delayed stations"),
            GameOverReason::TooManyPassengers => write!(f, "Too many passengers in the network"),
            GameOverReason::DurationElapsed => write!(f, "Run duration elapsed"),
        }
    }
}

/// Format for the end-of-run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Human readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_status_degraded() {
        assert!(!StationStatus::Normal.is_degraded());
        assert!(StationStatus::Delayed.is_degraded());
        assert!(StationStatus::Broken.is_degraded());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Broken".parse::<StationStatus>().unwrap(), StationStatus::Broken);
        assert_eq!("active".parse::<LineStatus>().unwrap(), LineStatus::Active);
        assert_eq!("MAINTENANCE".parse::<TrainStatus>().unwrap(), TrainStatus::Maintenance);
        assert!("sideways".parse::<TrainStatus>().is_err());
    }

    #[test]
    fn test_incident_kind_parsing() {
        assert_eq!("line_delay".parse::<IncidentKind>().unwrap(), IncidentKind::LineDelay);
        assert_eq!(
            "Station Breakdown".parse::<IncidentKind>().unwrap(),
            IncidentKind::StationBreakdown
        );
        assert_eq!("malfunction".parse::<IncidentKind>().unwrap(), IncidentKind::TrainMalfunction);
        assert!("meteor".parse::<IncidentKind>().is_err());
    }

    #[test]
    fn test_reserved_incident_kinds() {
        for kind in IncidentKind::GENERATED {
            assert!(!kind.is_reserved());
        }
        assert!(IncidentKind::SignalFailure.is_reserved());
        assert!(IncidentKind::TrackMaintenance.is_reserved());
        assert!(!IncidentKind::Overcrowding.auto_resolves());
        assert!(IncidentKind::LineDelay.auto_resolves());
    }

    #[test]
    fn test_simulation_state_commands() {
        assert!(SimulationState::Running.accepts_commands());
        assert!(SimulationState::Paused.accepts_commands());
        assert!(!SimulationState::Initializing.accepts_commands());
        assert!(!SimulationState::GameOver.accepts_commands());
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("TEXT".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert!("csv".parse::<ReportFormat>().is_err());
    }
}

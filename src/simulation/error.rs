//! Error types and handling
//!
//! This module contains error types for the simulation. Two layers exist:
//!
//! - [`SimulationError`]: returned by fallible operations (construction, commands,
//!   report output). Lookup misses are explicit `NotFound` errors, never defaults.
//! - [`ConfigurationIssue`]: a defect in one configured entity. The entity is
//!   excluded, the issue is recorded, and the rest of the network runs normally.

use crate::types::{ConfigValidationError, EntityKind, EntityRef, SimulationState};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigurationError(String),

    /// Entity lookup failed
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        kind: EntityKind,
        /// Identifier that was not found
        id: String,
    },

    /// A command was rejected
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The simulation is in a state that does not allow the operation
    #[error("Operation not allowed while simulation is {0}")]
    InvalidState(SimulationState),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<ConfigValidationError> for SimulationError {
    fn from(error: ConfigValidationError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl SimulationError {
    /// Create a configuration error
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a not-found error for an entity reference
    pub fn not_found(target: &EntityRef) -> Self {
        Self::NotFound { kind: target.kind(), id: target.id_str().to_string() }
    }

    /// Create an invalid command error
    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    /// Check if this is a recoverable error
    ///
    /// Recoverable errors leave the simulation untouched; the caller can carry on
    /// ticking.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SimulationError::ConfigurationError(_) => false,
            SimulationError::NotFound { .. } => true,
            SimulationError::InvalidCommand(_) => true,
            SimulationError::InvalidState(_) => true,
            SimulationError::IoError(_) => true,
            SimulationError::SerializationError(_) => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationError(_) => "Configuration",
            SimulationError::NotFound { .. } => "Lookup",
            SimulationError::InvalidCommand(_) => "Command",
            SimulationError::InvalidState(_) => "State",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "Serialization",
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// What is wrong with a configured entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueKind {
    /// Another entity of the same kind already uses the id
    DuplicateId,
    /// A line lists no stations
    EmptyRoute,
    /// A line references a station that does not exist
    UnknownStation,
    /// A train references a line that does not exist (or was excluded)
    MissingLine,
    /// A numeric parameter is out of range (speed, capacity)
    InvalidParameter,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::DuplicateId => write!(f, "duplicate id"),
            IssueKind::EmptyRoute => write!(f, "empty route"),
            IssueKind::UnknownStation => write!(f, "unknown station"),
            IssueKind::MissingLine => write!(f, "missing line"),
            IssueKind::InvalidParameter => write!(f, "invalid parameter"),
        }
    }
}

/// A configuration defect confined to one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationIssue {
    /// Kind of the affected entity
    pub entity: EntityKind,
    /// Id of the affected entity
    pub id: String,
    /// What is wrong
    pub kind: IssueKind,
    /// Human readable detail
    pub detail: String,
}

impl ConfigurationIssue {
    /// Create an issue
    pub fn new(
        entity: EntityKind,
        id: impl Into<String>,
        kind: IssueKind,
        detail: impl Into<String>,
    ) -> Self {
        Self { entity, id: id.into(), kind, detail: detail.into() }
    }
}

impl fmt::Display for ConfigurationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} excluded ({}): {}", self.entity, self.id, self.kind, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StationId;

    #[test]
    fn test_error_creation() {
        let error = SimulationError::configuration_error("bad tick");
        assert_eq!(error.to_string(), "Configuration validation failed: bad tick");

        let error = SimulationError::not_found(&EntityRef::Station(StationId::from("nowhere")));
        assert_eq!(error.to_string(), "Station not found: nowhere");

        let error = SimulationError::InvalidState(SimulationState::GameOver);
        assert_eq!(error.to_string(), "Operation not allowed while simulation is Game Over");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: SimulationError = io_error.into();
        assert_eq!(error.category(), "IO");
    }

    #[test]
    fn test_error_from_validation_error() {
        let error: SimulationError = ConfigValidationError::NoStations.into();
        assert!(!error.is_recoverable());
        assert_eq!(error.category(), "Configuration");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(SimulationError::invalid_command("reserved kind").is_recoverable());
        assert!(SimulationError::InvalidState(SimulationState::GameOver).is_recoverable());
        assert!(!SimulationError::configuration_error("x").is_recoverable());
    }

    #[test]
    fn test_simulation_result_type() {
        fn lookup(found: bool) -> SimulationResult<u32> {
            if found {
                Ok(1)
            } else {
                Err(SimulationError::invalid_command("nope"))
            }
        }
        assert_eq!(lookup(true).unwrap(), 1);
        assert!(lookup(false).is_err());
    }

    #[test]
    fn test_configuration_issue_display() {
        let issue = ConfigurationIssue::new(
            EntityKind::Train,
            "train_9",
            IssueKind::MissingLine,
            "line ghost does not exist",
        );
        assert_eq!(
            issue.to_string(),
            "Train train_9 excluded (missing line): line ghost does not exist"
        );
    }
}

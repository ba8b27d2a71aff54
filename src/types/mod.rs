//! Core types and identifiers for the metro network simulator
//!
//! This module contains fundamental types, identifiers, and configuration structures
//! used throughout the simulation system.
//!
//! # Overview
//!
//! The types module provides the foundational data types for the simulation:
//!
//! - **Identifiers**: configuration-assigned ids for stations, lines and trains, plus
//!   UUID-based incident ids and the [`EntityRef`] tagged union
//! - **Enums**: Type-safe enumerations for entity statuses, incident kinds and run state
//! - **Configuration**: Simulation configuration with validation and CLI support
//!
//! # Usage Example
//!
//! ```rust
//! use metro_network_simulator::types::*;
//!
//! // Identifiers come from configuration
//! let station_id = StationId::from("central");
//! let target = EntityRef::Station(station_id.clone());
//! assert_eq!(target.kind(), EntityKind::Station);
//!
//! // Use enums for type safety
//! assert!(StationStatus::Broken.is_degraded());
//! assert!(IncidentKind::SignalFailure.is_reserved());
//!
//! // Configure simulation
//! let config = SimulationConfig { seed: Some(7), ..Default::default() };
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod enums;
pub mod identifiers;

// Re-export all public types for convenience
pub use config::*;
pub use enums::*;
pub use identifiers::*;

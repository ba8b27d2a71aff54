//! Metro Network Simulator
//!
//! A tick-driven simulation of a small transit network: stations accumulate
//! passengers, trains run fixed loop routes between them, and random incidents
//! perturb the network until a game-over threshold is reached.
//!
//! # Overview
//!
//! The library owns every station, line and train in a single registry and
//! advances them in a fixed order each tick. Presentation layers read state
//! through queries, poll the notification log, and drive the network through
//! a small set of manual commands.
//!
//! ## Key Features
//!
//! - **Station State Machine**: Occupancy-driven delays with hysteresis, breakdowns and repairs
//! - **Loop Routes**: Trains skip broken stations and hold position when a whole route is down
//! - **Passenger Flow**: Background growth, boarding and alighting, passenger-proportional dwell
//! - **Incidents**: Periodic weighted incidents with timed auto-resolution
//! - **Game Over**: Delay, passenger and duration thresholds
//! - **Deterministic Runs**: Seeded randomness for reproducible scenarios
//!
//! ## Quick Start
//!
//! ```rust
//! use metro_network_simulator::*;
//!
//! // Built-in sample network with a fixed seed
//! let config = SimulationConfig { seed: Some(7), ..Default::default() };
//!
//! let mut simulation = Simulation::new(config)?;
//! let reason = simulation.run(Some(200))?;
//!
//! println!("Stopped after {:.1}s ({:?})", simulation.elapsed(), reason);
//! println!("{}", simulation.statistics().summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: Identifiers, enums and configuration
//! - [`network`]: Entity records, registry, state machines and route selection
//! - [`events`]: Notifications published for presentation layers
//! - [`simulation`]: Orchestrator, components, statistics, logging and errors
//! - [`interaction`]: Select / act / describe protocol over entities
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │   Types     │    │   Network   │    │   Events    │
//! │             │    │             │    │             │
//! │ Identifiers │◄───┤ Registry    │    │ Notification│
//! │ Enums       │    │ State rules │    │ EventLog    │
//! │ Config      │    │ Router      │    │             │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!                            ▲                   ▲
//!                            │                   │
//!                    ┌─────────────┐    ┌─────────────┐
//!                    │ Simulation  │    │ Interaction │
//!                    │             │    │             │
//!                    │ Orchestrator│◄───┤ Select/Act  │
//!                    │ Components  │    │ Describe    │
//!                    │ Statistics  │    │             │
//!                    └─────────────┘    └─────────────┘
//! ```
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

// Module declarations
pub mod events;
pub mod interaction;
pub mod network;
pub mod simulation;
pub mod types;

// Re-export the commonly used types

// Core types and identifiers
pub use types::{
    ConfigValidationError,
    EntityKind,
    // Identifiers
    EntityRef,
    // Enums
    GameOverReason,
    IncidentId,
    IncidentKind,
    LineId,
    LineStatus,
    ReportFormat,
    // Configuration
    SimulationConfig,
    SimulationState,
    StationId,
    StationStatus,
    TrainId,
    TrainStatus,
};

// Network entities
pub use network::{Line, NetworkRegistry, Station, Train};

// Notifications
pub use events::{EventLog, EventRecord, SimulationEvent};

// Simulation types and functionality
pub use simulation::{
    ConfigurationIssue, FlowStats, LoggingConfig, NetworkMetrics, RunStatistics, Simulation,
    SimulationError, SimulationResult,
};

// Interaction protocol
pub use interaction::{ActionOutcome, InteractionController};

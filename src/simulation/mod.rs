//! Simulation orchestration and control
//!
//! This module contains the tick-driven orchestrator and the components it
//! drives, plus statistics collection, logging setup and error handling.
//!
//! # Overview
//!
//! - **Simulation**: Owns the registry and runs every component in a fixed order per tick
//! - **SimulationClock / DeferredActionQueue**: Simulated time and actions scheduled on it
//! - **PassengerFlowModel**: Growth, boarding and alighting, dwell times, surges
//! - **IncidentScheduler**: Periodic incident checks, target selection, application
//! - **MotionDriver**: Train departures, movement along segments and arrivals
//! - **Aggregator / GameOverMonitor**: Per-tick metrics and threshold checks
//! - **RunStatistics**: Counters over a run and the end-of-run report
//! - **SimulationError**: Error handling for simulation operations
//!
//! # Usage Example
//!
//! ```rust
//! use metro_network_simulator::simulation::*;
//! use metro_network_simulator::types::*;
//!
//! let config = SimulationConfig { seed: Some(42), ..Default::default() };
//! let mut simulation = Simulation::new(config).unwrap();
//! simulation.start().unwrap();
//!
//! for _ in 0..20 {
//!     simulation.tick();
//! }
//! assert_eq!(simulation.elapsed(), 10.0);
//! println!("{}", simulation.statistics().summary());
//! ```

pub mod aggregator;
pub mod clock;
pub mod error;
pub mod incidents;
pub mod logging;
pub mod motion;
pub mod orchestrator;
pub mod passenger_flow;
pub mod statistics;

// Re-export all public types for convenience
pub use aggregator::*;
pub use clock::*;
pub use error::*;
pub use incidents::*;
pub use logging::*;
pub use motion::*;
pub use orchestrator::*;
pub use passenger_flow::*;
pub use statistics::*;

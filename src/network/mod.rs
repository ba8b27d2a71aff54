//! Network entities and their state machines
//!
//! This module manages stations, lines and trains, the registry that owns them,
//! and the rules that change their status.
//!
//! # Overview
//!
//! - **Station / Line / Train**: Entity records created once at start, never destroyed
//! - **NetworkRegistry**: Arena owning every record, keyed by id, plus the delay counter
//! - **state**: Station and line state machines (occupancy, breakdown, repair, line cascade)
//! - **router**: Target selection along a loop route with broken-station skipping
//! - **builder**: Builds the registry from configuration, excluding defective entities
//!
//! # Usage Example
//!
//! ```rust
//! use metro_network_simulator::network::*;
//! use metro_network_simulator::types::*;
//!
//! let (mut registry, issues) = build_network(&SimulationConfig::default());
//! assert!(issues.is_empty());
//!
//! let central = StationId::from("central");
//! state::break_station(&mut registry, &central, None);
//! assert_eq!(registry.delay_count(), 1);
//!
//! let red = registry.line(&LineId::from("red")).unwrap();
//! let selection = router::select_target(&registry, &red.station_ids, 0);
//! assert_eq!(selection, RouteSelection::Target { index: 1, lookups: 2 });
//! ```

pub mod builder;
pub mod line;
pub mod registry;
pub mod router;
pub mod state;
pub mod station;
pub mod train;

// Re-export all public types for convenience
pub use builder::{build_network, NetworkBuilder};
pub use line::Line;
pub use registry::{NetworkRegistry, StationTransition};
pub use router::{select_target, RouteSelection};
pub use state::LineUpdate;
pub use station::{DelayCause, Station};
pub use train::Train;

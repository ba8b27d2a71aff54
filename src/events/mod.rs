//! Notification surface
//!
//! This module defines the events the simulation publishes for presentation
//! layers: status changes, train arrivals and departures, incident lifecycle,
//! aggregate metrics and run state.
//!
//! # Usage Example
//!
//! ```rust
//! use metro_network_simulator::events::*;
//! use metro_network_simulator::types::*;
//!
//! let mut log = EventLog::default();
//! log.push(1, 0.5, SimulationEvent::IncidentSkipped { kind: IncidentKind::LineDelay });
//!
//! for record in log.drain() {
//!     println!("[{:.1}s] {}", record.time, record.event.name());
//! }
//! ```

pub mod notification;

pub use notification::*;

//! Route target selection
//!
//! Trains follow their line's stations as an unconditional loop. Before a train
//! commits to a target, Broken stations are skipped. The search is bounded to one
//! full traversal of the route, so a line whose stations are all Broken reports a
//! stall instead of looping forever.

use crate::network::NetworkRegistry;
use crate::types::{StationId, StationStatus};

/// Outcome of a target search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSelection {
    /// A station that is not Broken was found at `index`
    Target {
        /// Route index of the selected station
        index: usize,
        /// Stations inspected, including the selected one
        lookups: usize,
    },
    /// Every station on the route is Broken (or unknown)
    Stalled {
        /// Stations inspected
        lookups: usize,
    },
}

impl RouteSelection {
    /// Number of stations inspected
    pub fn lookups(&self) -> usize {
        match self {
            RouteSelection::Target { lookups, .. } | RouteSelection::Stalled { lookups } => *lookups,
        }
    }
}

/// Find the first non-Broken station at or after `start_index`, wrapping around
pub fn select_target(
    registry: &NetworkRegistry,
    route: &[StationId],
    start_index: usize,
) -> RouteSelection {
    let len = route.len();
    let mut lookups = 0;

    for offset in 0..len {
        let index = (start_index + offset) % len;
        lookups += 1;
        let usable = registry
            .station(&route[index])
            .map(|station| station.status() != StationStatus::Broken)
            .unwrap_or(false);
        if usable {
            return RouteSelection::Target { index, lookups };
        }
    }

    RouteSelection::Stalled { lookups }
}

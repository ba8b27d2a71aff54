//! Select / act protocol for presentation layers
//!
//! A presentation layer selects one entity at a time, asks for its one-line
//! description and triggers its primary action. Dispatch is by [`EntityRef`]
//! variant:
//!
//! | Entity  | Action                                  |
//! |---------|-----------------------------------------|
//! | Station | Repair (force back to Normal)           |
//! | Train   | Resume from maintenance                 |
//! | Line    | None                                    |
//!
//! # Usage Example
//!
//! ```rust
//! use metro_network_simulator::interaction::*;
//! use metro_network_simulator::simulation::Simulation;
//! use metro_network_simulator::types::*;
//!
//! let mut simulation = Simulation::new(SimulationConfig::default()).unwrap();
//! simulation.start().unwrap();
//!
//! let mut controller = InteractionController::new();
//! let summary = controller
//!     .select(&simulation, EntityRef::Station(StationId::from("central")))
//!     .unwrap();
//! assert!(summary.starts_with("Central - "));
//!
//! let outcome = controller.act(&mut simulation).unwrap();
//! assert_eq!(outcome, ActionOutcome::NoChange);
//! ```

use crate::simulation::{Simulation, SimulationError, SimulationResult};
use crate::types::EntityRef;
use std::fmt;
use tracing::debug;

/// Result of acting on the selected entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// A degraded station was forced back to Normal
    Repaired,
    /// A train left maintenance
    Resumed,
    /// The action applied but there was nothing to change
    NoChange,
    /// The entity has no action
    NoAction,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Repaired => write!(f, "Repaired"),
            ActionOutcome::Resumed => write!(f, "Resumed"),
            ActionOutcome::NoChange => write!(f, "No change"),
            ActionOutcome::NoAction => write!(f, "No action"),
        }
    }
}

/// Tracks the current selection
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    selected: Option<EntityRef>,
}

impl InteractionController {
    /// Create a controller with nothing selected
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected entity
    pub fn selected(&self) -> Option<&EntityRef> {
        self.selected.as_ref()
    }

    /// Select an entity, replacing any previous selection
    ///
    /// Returns the entity description. Unknown entities are rejected and leave
    /// the selection unchanged.
    pub fn select(&mut self, simulation: &Simulation, target: EntityRef) -> SimulationResult<String> {
        let description = describe(simulation, &target)?;
        if let Some(previous) = self.selected.replace(target) {
            debug!(entity = %previous, "Deselected");
        }
        Ok(description)
    }

    /// Clear the selection, returning what was selected
    pub fn deselect(&mut self) -> Option<EntityRef> {
        self.selected.take()
    }

    /// Trigger the primary action of the selected entity
    pub fn act(&mut self, simulation: &mut Simulation) -> SimulationResult<ActionOutcome> {
        let target = self
            .selected
            .clone()
            .ok_or_else(|| SimulationError::invalid_command("Nothing selected"))?;
        act_on(simulation, &target)
    }

    /// Description of the selected entity, if any
    pub fn describe_selected(&self, simulation: &Simulation) -> Option<SimulationResult<String>> {
        self.selected.as_ref().map(|target| describe(simulation, target))
    }
}

/// Trigger the primary action of an entity
pub fn act_on(simulation: &mut Simulation, target: &EntityRef) -> SimulationResult<ActionOutcome> {
    let outcome = match target {
        EntityRef::Station(id) => {
            if simulation.repair_station(id)? {
                ActionOutcome::Repaired
            } else {
                ActionOutcome::NoChange
            }
        }
        EntityRef::Train(id) => {
            if simulation.resume_train(id)? {
                ActionOutcome::Resumed
            } else {
                ActionOutcome::NoChange
            }
        }
        EntityRef::Line(id) => {
            simulation
                .line(id)
                .ok_or_else(|| SimulationError::not_found(target))?;
            ActionOutcome::NoAction
        }
    };
    debug!(entity = %target, outcome = %outcome, "Interaction");
    Ok(outcome)
}

/// One-line summary of an entity
pub fn describe(simulation: &Simulation, target: &EntityRef) -> SimulationResult<String> {
    let not_found = || SimulationError::not_found(target);
    match target {
        EntityRef::Station(id) => {
            let station = simulation.station(id).ok_or_else(not_found)?;
            Ok(format!(
                "{} - {}/{} passengers - Status: {}",
                station.name,
                station.passenger_count(),
                station.max_passengers,
                station.status()
            ))
        }
        EntityRef::Line(id) => {
            let line = simulation.line(id).ok_or_else(not_found)?;
            Ok(format!(
                "{} - {} stations - Status: {}",
                line.name,
                line.route_len(),
                line.status()
            ))
        }
        EntityRef::Train(id) => {
            let train = simulation.train(id).ok_or_else(not_found)?;
            Ok(format!(
                "Train {} - Line {} - Status: {} - Passengers: {}/{}",
                train.id,
                train.line_id,
                train.status(),
                train.passenger_count(),
                train.capacity
            ))
        }
    }
}

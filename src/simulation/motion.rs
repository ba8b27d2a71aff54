//! Train motion
//!
//! Moving trains advance toward their next station at their configured speed
//! and arrive when they come within [`motion::ARRIVAL_EPSILON`] of it. Stopped
//! trains leave when their scheduled departure fires; the departure picks the
//! next non-Broken station on the loop route.
//!
//! Departures carry a sequence number. Anything that takes a train out of its
//! normal cycle (maintenance, a manual resume) bumps the train's sequence, which
//! turns already scheduled departures into no-ops.

use crate::network::{select_target, NetworkRegistry, RouteSelection};
use crate::types::{motion, LineId, StationId, TrainId, TrainStatus};
use tracing::{debug, trace, warn};

/// What happened when a train tried to leave
#[derive(Debug, Clone, PartialEq)]
pub enum DepartOutcome {
    /// The train is moving toward `to`
    Departed {
        /// Station it left
        from: StationId,
        /// Station it is heading to
        to: StationId,
        /// Stations inspected while choosing the target
        lookups: usize,
    },
    /// Every station on the route is broken; the train holds
    Stalled {
        /// Line of the train
        line_id: LineId,
        /// Whether this is the first failed attempt since the train last moved
        first: bool,
        /// Stations inspected
        lookups: usize,
    },
}

/// Moves trains and dispatches departures
#[derive(Debug, Clone)]
pub struct MotionDriver {
    retry_delay: f64,
}

impl MotionDriver {
    /// Create a driver; stalled trains retry after `retry_delay` seconds
    pub fn new(retry_delay: f64) -> Self {
        Self { retry_delay }
    }

    /// Seconds a stalled train waits before trying again
    pub fn retry_delay(&self) -> f64 {
        self.retry_delay
    }

    /// Move a train for `dt` seconds
    ///
    /// Returns true when the train arrived at its next station during this step.
    /// Non-moving trains are left untouched.
    pub fn advance(&self, registry: &mut NetworkRegistry, train_id: &TrainId, dt: f64) -> bool {
        let Some(train) = registry.train(train_id) else {
            return false;
        };
        if train.status() != TrainStatus::Moving {
            return false;
        }
        let Some(target) = registry.station(train.next_station_id()).map(|s| s.position) else {
            return false;
        };

        let Some(train) = registry.train_mut(train_id) else {
            return false;
        };
        let next = train.position.move_towards(&target, train.speed * dt);
        let (dx, dz) = (next.x - train.position.x, next.z - train.position.z);
        if dx != 0.0 || dz != 0.0 {
            train.heading = dx.atan2(dz);
        }
        train.position = next;

        if next.distance_to(&target) >= motion::ARRIVAL_EPSILON {
            trace!(train = %train_id, x = next.x, z = next.z, "Train moving");
            return false;
        }

        train.position = target;
        train.status = TrainStatus::Stopped;
        train.at_station = true;
        train.current_station_id = train.next_station_id.clone();
        train.current_index = train.target_index;
        debug!(train = %train_id, station = %train.current_station_id, "Train arrived");
        true
    }

    /// Invalidate pending departures and return the sequence for a new one
    pub fn prepare_departure(
        &self,
        registry: &mut NetworkRegistry,
        train_id: &TrainId,
    ) -> Option<u64> {
        registry.train_mut(train_id).map(|train| train.invalidate_departures())
    }

    /// Whether a scheduled departure with `seq` should still run
    pub fn departure_is_current(
        &self,
        registry: &NetworkRegistry,
        train_id: &TrainId,
        seq: u64,
    ) -> bool {
        registry.train(train_id).is_some_and(|train| {
            train.departure_seq == seq && train.status() == TrainStatus::Stopped
        })
    }

    /// Leave for the next non-Broken station
    ///
    /// From a station the search starts one past the current stop; from the
    /// middle of a segment it starts at the original target. Returns `None` for
    /// an unknown train or a train in maintenance.
    pub fn depart(
        &self,
        registry: &mut NetworkRegistry,
        train_id: &TrainId,
    ) -> Option<DepartOutcome> {
        let train = registry.train(train_id)?;
        if train.status() == TrainStatus::Maintenance {
            return None;
        }
        let line_id = train.line_id.clone();
        let route = registry.line(&line_id)?.station_ids.clone();
        if route.is_empty() {
            return None;
        }
        let start = if train.is_at_station() {
            (train.current_index() + 1) % route.len()
        } else {
            train.target_index()
        };

        let selection = select_target(registry, &route, start);
        let train = registry.train_mut(train_id)?;

        match selection {
            RouteSelection::Target { index, lookups } => {
                train.status = TrainStatus::Moving;
                train.at_station = false;
                train.stalled = false;
                train.target_index = index;
                train.next_station_id = route[index].clone();
                debug!(
                    train = %train_id,
                    from = %train.current_station_id,
                    to = %train.next_station_id,
                    lookups,
                    "Train departed"
                );
                Some(DepartOutcome::Departed {
                    from: train.current_station_id.clone(),
                    to: train.next_station_id.clone(),
                    lookups,
                })
            }
            RouteSelection::Stalled { lookups } => {
                train.status = TrainStatus::Stopped;
                let first = !train.stalled;
                train.stalled = true;
                if first {
                    warn!(
                        train = %train_id,
                        line = %line_id,
                        "Every station on the route is broken, train holding"
                    );
                }
                Some(DepartOutcome::Stalled { line_id, first, lookups })
            }
        }
    }

    /// Take a malfunctioning train out of maintenance and dispatch it
    ///
    /// Returns `None` when the train is unknown or not in maintenance.
    pub fn resume(
        &self,
        registry: &mut NetworkRegistry,
        train_id: &TrainId,
    ) -> Option<DepartOutcome> {
        let train = registry.train_mut(train_id)?;
        if train.status() != TrainStatus::Maintenance {
            return None;
        }
        train.active_incident = None;
        train.status = TrainStatus::Stopped;
        train.invalidate_departures();
        self.depart(registry, train_id)
    }

    /// Put a train into maintenance
    ///
    /// Returns false when it is unknown or already in maintenance.
    pub fn stop(&self, registry: &mut NetworkRegistry, train_id: &TrainId) -> bool {
        registry.train_mut(train_id).is_some_and(|train| train.enter_maintenance(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{build_network, state};
    use crate::types::{Position, SimulationConfig};

    fn setup() -> (NetworkRegistry, MotionDriver, TrainId) {
        let (registry, _) = build_network(&SimulationConfig::default());
        (registry, MotionDriver::new(1.0), TrainId::from("train_1"))
    }

    #[test]
    fn test_depart_and_arrive() {
        let (mut registry, driver, id) = setup();
        let outcome = driver.depart(&mut registry, &id).unwrap();
        assert_eq!(
            outcome,
            DepartOutcome::Departed {
                from: StationId::from("central"),
                to: StationId::from("harbor"),
                lookups: 1,
            }
        );

        // central (0,0) to harbor (30,0) at 5 units/s: 6 seconds
        let mut arrived_after = None;
        for step in 1..=20 {
            if driver.advance(&mut registry, &id, 0.5) {
                arrived_after = Some(step);
                break;
            }
        }
        assert_eq!(arrived_after, Some(12));

        let train = registry.train(&id).unwrap();
        assert_eq!(train.status(), TrainStatus::Stopped);
        assert_eq!(train.current_station_id().as_str(), "harbor");
        assert_eq!(train.current_index(), 1);
        assert_eq!(train.position(), Position::new(30.0, 0.0, 0.0));
    }

    #[test]
    fn test_depart_skips_broken_station() {
        let (mut registry, driver, id) = setup();
        state::break_station(&mut registry, &StationId::from("harbor"), None);
        match driver.depart(&mut registry, &id).unwrap() {
            DepartOutcome::Departed { to, lookups, .. } => {
                assert_eq!(to.as_str(), "museum");
                assert_eq!(lookups, 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(registry.train(&id).unwrap().target_index(), 2);
    }

    #[test]
    fn test_all_broken_route_stalls_once() {
        let (mut registry, driver, id) = setup();
        for stop in ["central", "harbor", "museum", "university"] {
            state::break_station(&mut registry, &StationId::from(stop), None);
        }

        match driver.depart(&mut registry, &id).unwrap() {
            DepartOutcome::Stalled { first, lookups, .. } => {
                assert!(first);
                assert_eq!(lookups, 4);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        let DepartOutcome::Stalled { first, .. } = driver.depart(&mut registry, &id).unwrap() else {
            panic!("train should still be stalled");
        };
        assert!(!first);
        let train = registry.train(&id).unwrap();
        assert_eq!(train.status(), TrainStatus::Stopped);
        assert!(train.is_stalled());
        assert_eq!(train.current_station_id().as_str(), "central");
    }

    #[test]
    fn test_stopped_train_does_not_move() {
        let (mut registry, driver, id) = setup();
        assert!(!driver.advance(&mut registry, &id, 10.0));
        assert_eq!(registry.train(&id).unwrap().position(), Position::default());
    }

    #[test]
    fn test_stop_and_resume_mid_segment() {
        let (mut registry, driver, id) = setup();
        driver.depart(&mut registry, &id);
        driver.advance(&mut registry, &id, 1.0);

        assert!(driver.stop(&mut registry, &id));
        assert!(!driver.stop(&mut registry, &id));
        assert!(!driver.advance(&mut registry, &id, 1.0));
        assert_eq!(registry.train(&id).unwrap().position(), Position::new(5.0, 0.0, 0.0));
        assert!(driver.depart(&mut registry, &id).is_none());

        let outcome = driver.resume(&mut registry, &id).unwrap();
        let DepartOutcome::Departed { to, .. } = outcome else {
            panic!("resumed train should depart");
        };
        // Mid-segment the original target is kept
        assert_eq!(to.as_str(), "harbor");
        assert_eq!(registry.train(&id).unwrap().status(), TrainStatus::Moving);
        assert!(driver.resume(&mut registry, &id).is_none());
    }

    #[test]
    fn test_departure_sequence_goes_stale() {
        let (mut registry, driver, id) = setup();
        let seq = driver.prepare_departure(&mut registry, &id).unwrap();
        assert!(driver.departure_is_current(&registry, &id, seq));

        driver.stop(&mut registry, &id);
        assert!(!driver.departure_is_current(&registry, &id, seq));
        assert!(!driver.departure_is_current(&registry, &TrainId::from("ghost"), seq));
    }
}

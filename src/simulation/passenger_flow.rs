//! Passenger flow model
//!
//! Passengers appear at stations at a randomized rate, board trains when one
//! arrives, and leave the network when they alight. Every change to a station's
//! count is followed by an occupancy re-evaluation so that crowding delays are
//! raised and cleared in the same step that caused them.

use crate::network::{state, NetworkRegistry, StationTransition};
use crate::types::{occupancy, DwellConfig, GrowthConfig, StationId, StationStatus, TrainId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Result of one growth step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrowthOutcome {
    /// Passengers added across all stations
    pub added: u64,
    /// Stations whose growth was cut short by capacity
    pub clamped: u32,
    /// Status changes caused by the growth
    pub transitions: Vec<StationTransition>,
}

/// Passenger exchange performed when a train reaches a station
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalOutcome {
    /// Station the train arrived at
    pub station_id: StationId,
    /// Passengers that got off and left the network
    pub alighted: u32,
    /// Passengers that got on
    pub boarded: u32,
    /// Seconds the train stands before departing
    pub dwell: f64,
    /// Station status change caused by the boarding
    pub transition: Option<StationTransition>,
}

/// Snapshot of passenger distribution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowStats {
    /// Passengers waiting at stations
    pub waiting: u64,
    /// Passengers aboard trains
    pub in_transit: u64,
    /// Waiting plus aboard
    pub total: u64,
    /// Stations above the crowding threshold
    pub overcrowded_stations: u32,
    /// Trains above the crowding threshold
    pub full_trains: u32,
}

impl FlowStats {
    /// Count passengers and crowded entities in a registry
    pub fn collect(registry: &NetworkRegistry) -> Self {
        let waiting = registry.waiting_passengers();
        let in_transit = registry.in_transit_passengers();
        Self {
            waiting,
            in_transit,
            total: waiting + in_transit,
            overcrowded_stations: registry
                .stations()
                .iter()
                .filter(|s| s.occupancy() > occupancy::CROWDED_THRESHOLD)
                .count() as u32,
            full_trains: registry
                .trains()
                .iter()
                .filter(|t| t.occupancy() > occupancy::CROWDED_THRESHOLD)
                .count() as u32,
        }
    }
}

/// Growth, boarding and dwell rules
#[derive(Debug, Clone)]
pub struct PassengerFlowModel {
    growth: GrowthConfig,
    dwell: DwellConfig,
}

impl PassengerFlowModel {
    /// Create a model from the growth and dwell settings
    pub fn new(growth: GrowthConfig, dwell: DwellConfig) -> Self {
        Self { growth, dwell }
    }

    /// Grow every non-Broken station for a step of `dt` seconds
    ///
    /// Each station receives `round((base_rate + u) * dt)` passengers with `u`
    /// drawn uniformly from `[-variation, variation]`, floored at zero and
    /// clamped to capacity.
    pub fn grow<R: Rng + ?Sized>(
        &self,
        registry: &mut NetworkRegistry,
        dt: f64,
        rng: &mut R,
    ) -> GrowthOutcome {
        let mut outcome = GrowthOutcome::default();
        let ids: Vec<StationId> = registry
            .stations()
            .iter()
            .filter(|s| s.status() != StationStatus::Broken)
            .map(|s| s.id.clone())
            .collect();

        for id in ids {
            let amount = self.growth_amount(dt, rng);
            if amount == 0 {
                continue;
            }
            let Some(station) = registry.station_mut(&id) else {
                continue;
            };
            let (added, clamped) = station.add_passengers(amount);
            outcome.added += added as u64;
            if clamped {
                outcome.clamped += 1;
                trace!(station = %id, requested = amount, added, "Station at capacity");
            }
            outcome.transitions.extend(state::evaluate_occupancy(registry, &id));
        }

        outcome
    }

    fn growth_amount<R: Rng + ?Sized>(&self, dt: f64, rng: &mut R) -> u32 {
        let variation = if self.growth.variation > 0.0 {
            rng.gen_range(-self.growth.variation..=self.growth.variation)
        } else {
            0.0
        };
        let amount = ((self.growth.base_rate + variation) * dt).round();
        if amount > 0.0 {
            amount as u32
        } else {
            0
        }
    }

    /// Exchange passengers between a train and the station it just reached
    ///
    /// Everyone aboard alights and leaves the network, then as many waiting
    /// passengers board as the train can hold. Returns `None` when the train or
    /// its station is unknown.
    pub fn process_arrival(
        &self,
        registry: &mut NetworkRegistry,
        train_id: &TrainId,
    ) -> Option<ArrivalOutcome> {
        let station_id = registry.train(train_id)?.current_station_id().clone();
        let waiting = registry.station(&station_id)?.passenger_count();

        let train = registry.train_mut(train_id)?;
        let alighted = train.alight_all();
        let boarded = train.board(waiting);

        if let Some(station) = registry.station_mut(&station_id) {
            station.remove_passengers(boarded);
        }
        let transition = state::evaluate_occupancy(registry, &station_id);
        let dwell = self.dwell_time(alighted + boarded);

        debug!(
            train = %train_id,
            station = %station_id,
            alighted,
            boarded,
            dwell,
            "Passenger exchange"
        );

        Some(ArrivalOutcome { station_id, alighted, boarded, dwell, transition })
    }

    /// Seconds a train stands after moving `moved` passengers
    ///
    /// The minimum stop time plus the per-ten-passengers increment scaled by
    /// `moved / 10`, clamped to the configured maximum.
    pub fn dwell_time(&self, moved: u32) -> f64 {
        let tens = moved as f64 / 10.0;
        let dwell = self.dwell.minimum_stop_time + tens * self.dwell.time_per_ten_passengers;
        dwell.clamp(self.dwell.minimum_stop_time, self.dwell.maximum_stop_time)
    }

    /// Add a burst of passengers to a station
    ///
    /// Returns how many were added (after clamping) and the resulting status
    /// change, or `None` for an unknown station.
    pub fn apply_surge(
        &self,
        registry: &mut NetworkRegistry,
        station_id: &StationId,
        amount: u32,
    ) -> Option<(u32, Option<StationTransition>)> {
        let (added, _) = registry.station_mut(station_id)?.add_passengers(amount);
        let transition = state::evaluate_occupancy(registry, station_id);
        Some((added, transition))
    }

    /// Remove every waiting passenger from a station
    ///
    /// A crowding delay clears; a breakdown or line delay does not.
    pub fn evacuate(
        &self,
        registry: &mut NetworkRegistry,
        station_id: &StationId,
    ) -> Option<(u32, Option<StationTransition>)> {
        let station = registry.station_mut(station_id)?;
        let removed = station.passenger_count();
        station.set_passenger_count(0);
        let transition = state::evaluate_occupancy(registry, station_id);
        Some((removed, transition))
    }

    /// Occupancy ratio of a station
    pub fn station_occupancy(&self, registry: &NetworkRegistry, id: &StationId) -> Option<f64> {
        registry.station(id).map(|s| s.occupancy())
    }

    /// Occupancy ratio of a train
    pub fn train_occupancy(&self, registry: &NetworkRegistry, id: &TrainId) -> Option<f64> {
        registry.train(id).map(|t| t.occupancy())
    }

    /// Current passenger distribution
    pub fn flow_stats(&self, registry: &NetworkRegistry) -> FlowStats {
        FlowStats::collect(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::build_network;
    use crate::types::SimulationConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model() -> PassengerFlowModel {
        PassengerFlowModel::new(GrowthConfig::default(), DwellConfig::default())
    }

    fn registry() -> NetworkRegistry {
        build_network(&SimulationConfig::default()).0
    }

    #[test]
    fn test_growth_clamps_at_capacity_and_delays() {
        let mut registry = registry();
        let central = StationId::from("central");
        registry.station_mut(&central).unwrap().set_passenger_count(450);

        let model = PassengerFlowModel::new(
            GrowthConfig { base_rate: 120.0, variation: 0.0 },
            DwellConfig::default(),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = model.grow(&mut registry, 0.5, &mut rng);

        let station = registry.station(&central).unwrap();
        assert_eq!(station.passenger_count(), 500);
        assert_eq!(station.status(), StationStatus::Delayed);
        assert!(outcome.clamped >= 1);
        assert!(outcome.transitions.iter().any(|t| t.station_id == central));
        assert!(registry.check_invariants().is_empty());
    }

    #[test]
    fn test_growth_skips_broken_stations() {
        let mut registry = registry();
        let central = StationId::from("central");
        state::break_station(&mut registry, &central, None);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            model().grow(&mut registry, 0.5, &mut rng);
        }
        assert_eq!(registry.station(&central).unwrap().passenger_count(), 0);
        assert!(registry.station(&StationId::from("harbor")).unwrap().passenger_count() > 0);
    }

    #[test]
    fn test_zero_growth_adds_nothing() {
        let mut registry = registry();
        let model = PassengerFlowModel::new(
            GrowthConfig { base_rate: 0.0, variation: 0.0 },
            DwellConfig::default(),
        );
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = model.grow(&mut registry, 0.5, &mut rng);
        assert_eq!(outcome.added, 0);
        assert_eq!(registry.total_passengers(), 0);
    }

    #[test]
    fn test_arrival_boards_up_to_capacity() {
        let mut registry = registry();
        let central = StationId::from("central");
        let train_id = TrainId::from("train_1");
        registry.station_mut(&central).unwrap().set_passenger_count(300);
        registry.train_mut(&train_id).unwrap().set_passenger_count(40);

        let outcome = model().process_arrival(&mut registry, &train_id).unwrap();
        assert_eq!(outcome.station_id, central);
        assert_eq!(outcome.alighted, 40);
        assert_eq!(outcome.boarded, 200);
        assert_eq!(registry.station(&central).unwrap().passenger_count(), 100);
        assert_eq!(registry.train(&train_id).unwrap().passenger_count(), 200);
        // 240 moved: 1.0 + 24 * 0.5 clamps to 10.0
        assert_eq!(outcome.dwell, 10.0);
    }

    #[test]
    fn test_arrival_clears_crowding_delay() {
        let mut registry = registry();
        let central = StationId::from("central");
        registry.station_mut(&central).unwrap().set_passenger_count(460);
        state::evaluate_occupancy(&mut registry, &central);
        assert_eq!(registry.delay_count(), 1);

        let outcome = model().process_arrival(&mut registry, &TrainId::from("train_1")).unwrap();
        assert_eq!(outcome.transition.unwrap().to, StationStatus::Normal);
        assert_eq!(registry.delay_count(), 0);
    }

    #[test]
    fn test_dwell_time_scales_with_passengers_moved() {
        let model = model();
        assert_eq!(model.dwell_time(0), 1.0);
        assert!((model.dwell_time(9) - 1.45).abs() < 1e-9);
        assert_eq!(model.dwell_time(10), 1.5);
        assert!((model.dwell_time(15) - 1.75).abs() < 1e-9);
        assert!((model.dwell_time(59) - 3.95).abs() < 1e-9);
        assert_eq!(model.dwell_time(10_000), 10.0);
    }

    #[test]
    fn test_surge_and_evacuate() {
        let mut registry = registry();
        let museum = StationId::from("museum");
        let model = model();

        let (added, transition) = model.apply_surge(&mut registry, &museum, 480).unwrap();
        assert_eq!(added, 480);
        assert_eq!(transition.unwrap().to, StationStatus::Delayed);

        let (removed, transition) = model.evacuate(&mut registry, &museum).unwrap();
        assert_eq!(removed, 480);
        assert_eq!(transition.unwrap().to, StationStatus::Normal);
        assert!(model.evacuate(&mut registry, &StationId::from("nowhere")).is_none());
    }

    #[test]
    fn test_flow_stats() {
        let mut registry = registry();
        registry.station_mut(&StationId::from("central")).unwrap().set_passenger_count(480);
        registry.train_mut(&TrainId::from("train_1")).unwrap().set_passenger_count(190);

        let stats = model().flow_stats(&registry);
        assert_eq!(stats.waiting, 480);
        assert_eq!(stats.in_transit, 190);
        assert_eq!(stats.total, 670);
        assert_eq!(stats.overcrowded_stations, 1);
        assert_eq!(stats.full_trains, 1);
    }
}

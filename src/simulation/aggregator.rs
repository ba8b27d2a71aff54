//! Network metrics and game-over detection
//!
//! After every tick the aggregator snapshots the network into
//! [`NetworkMetrics`] and the [`GameOverMonitor`] compares the snapshot against
//! the configured thresholds.

use crate::network::NetworkRegistry;
use crate::simulation::FlowStats;
use crate::types::{GameOverReason, ThresholdConfig};
use serde::{Deserialize, Serialize};

/// Aggregate view of the network at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    /// Simulated seconds since start
    pub elapsed: f64,
    /// Passengers waiting at stations plus aboard trains
    pub total_passengers: u64,
    /// Passengers waiting at stations
    pub waiting_passengers: u64,
    /// Passengers aboard trains
    pub in_transit_passengers: u64,
    /// Delayed or broken stations
    pub delay_count: u32,
    /// Stations above the crowding threshold
    pub overcrowded_stations: u32,
    /// Trains above the crowding threshold
    pub full_trains: u32,
}

/// Builds metrics snapshots
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    resyncs: u64,
}

impl Aggregator {
    /// Create an aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the network
    ///
    /// The delay counter is checked against the station statuses first and
    /// corrected if it drifted.
    pub fn collect(&mut self, registry: &mut NetworkRegistry, elapsed: f64) -> NetworkMetrics {
        if registry.resync_delay_count().is_some() {
            self.resyncs += 1;
        }

        let flow = FlowStats::collect(registry);
        NetworkMetrics {
            elapsed,
            total_passengers: flow.total,
            waiting_passengers: flow.waiting,
            in_transit_passengers: flow.in_transit,
            delay_count: registry.delay_count(),
            overcrowded_stations: flow.overcrowded_stations,
            full_trains: flow.full_trains,
        }
    }

    /// Times the delay counter had to be corrected
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }
}

/// Checks metrics against the game-over thresholds
#[derive(Debug, Clone)]
pub struct GameOverMonitor {
    thresholds: ThresholdConfig,
}

impl GameOverMonitor {
    /// Create a monitor
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    /// Configured thresholds
    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// First threshold reached, if any
    ///
    /// Thresholds are inclusive and checked in order: delays, passengers,
    /// duration.
    pub fn evaluate(&self, metrics: &NetworkMetrics) -> Option<GameOverReason> {
        if metrics.delay_count >= self.thresholds.max_delay_count {
            Some(GameOverReason::TooManyDelays)
        } else if metrics.total_passengers >= self.thresholds.max_total_passengers {
            Some(GameOverReason::TooManyPassengers)
        } else if metrics.elapsed >= self.thresholds.game_duration {
            Some(GameOverReason::DurationElapsed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{build_network, state};
    use crate::types::{SimulationConfig, StationId, TrainId};

    fn monitor() -> GameOverMonitor {
        GameOverMonitor::new(ThresholdConfig::default())
    }

    #[test]
    fn test_collect_metrics() {
        let (mut registry, _) = build_network(&SimulationConfig::default());
        registry.station_mut(&StationId::from("central")).unwrap().set_passenger_count(470);
        registry.station_mut(&StationId::from("harbor")).unwrap().set_passenger_count(30);
        registry.train_mut(&TrainId::from("train_2")).unwrap().set_passenger_count(50);
        state::break_station(&mut registry, &StationId::from("museum"), None);

        let metrics = Aggregator::new().collect(&mut registry, 12.5);
        assert_eq!(metrics.elapsed, 12.5);
        assert_eq!(metrics.waiting_passengers, 500);
        assert_eq!(metrics.in_transit_passengers, 50);
        assert_eq!(metrics.total_passengers, 550);
        assert_eq!(metrics.delay_count, 1);
        assert_eq!(metrics.overcrowded_stations, 1);
        assert_eq!(metrics.full_trains, 0);
    }

    #[test]
    fn test_game_over_thresholds_are_inclusive() {
        let monitor = monitor();
        let mut metrics = NetworkMetrics { delay_count: 4, ..Default::default() };
        assert_eq!(monitor.evaluate(&metrics), None);

        metrics.delay_count = 5;
        assert_eq!(monitor.evaluate(&metrics), Some(GameOverReason::TooManyDelays));

        let metrics = NetworkMetrics { total_passengers: 2000, ..Default::default() };
        assert_eq!(monitor.evaluate(&metrics), Some(GameOverReason::TooManyPassengers));

        let metrics = NetworkMetrics { elapsed: 600.0, ..Default::default() };
        assert_eq!(monitor.evaluate(&metrics), Some(GameOverReason::DurationElapsed));
    }

    #[test]
    fn test_delays_take_precedence() {
        let metrics = NetworkMetrics {
            delay_count: 9,
            total_passengers: 5000,
            elapsed: 900.0,
            ..Default::default()
        };
        assert_eq!(monitor().evaluate(&metrics), Some(GameOverReason::TooManyDelays));
    }
}

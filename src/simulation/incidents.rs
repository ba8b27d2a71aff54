//! Incident scheduling and application
//!
//! Every `check_interval` simulated seconds the scheduler rolls against the
//! trigger probability. On success a kind is drawn from the weighted table and
//! applied to a uniformly chosen eligible target:
//!
//! | Kind              | Eligible targets | Effect                          | Resolution        |
//! |-------------------|------------------|---------------------------------|-------------------|
//! | Station breakdown | Normal stations  | Station → Broken                | timer or repair   |
//! | Line delay        | Active lines     | Line → Delayed, cascades        | timer             |
//! | Overcrowding      | Normal stations  | Passenger surge                 | none (one-shot)   |
//! | Train malfunction | Moving trains    | Train → Maintenance             | timer or resume   |
//!
//! An incident whose eligible set is empty is skipped. Resolution timers check
//! [`IncidentScheduler::is_current`] before acting, so a target that was
//! repaired or re-targeted in the meantime is left alone.

use crate::network::{state, LineUpdate, NetworkRegistry, StationTransition};
use crate::types::{
    EntityRef, IncidentConfig, IncidentId, IncidentKind, LineStatus, StationStatus, TrainStatus,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An applied incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier
    pub id: IncidentId,
    /// Kind
    pub kind: IncidentKind,
    /// Entity it hit
    pub target: EntityRef,
    /// Seconds until auto-resolution, if the kind auto-resolves
    pub duration: Option<f64>,
    /// Simulated time it was applied at
    pub started_at: f64,
}

impl Incident {
    /// Simulated time at which the incident resolves itself
    pub fn resolves_at(&self) -> Option<f64> {
        self.duration.map(|d| self.started_at + d)
    }
}

/// An incident together with the state changes it caused
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedIncident {
    /// The incident
    pub incident: Incident,
    /// Passengers added by an overcrowding surge
    pub surge: Option<u32>,
    /// Station status changes
    pub stations: Vec<StationTransition>,
    /// Line status change
    pub line: Option<LineUpdate>,
    /// Previous status of a malfunctioning train
    pub train_from: Option<TrainStatus>,
}

impl AppliedIncident {
    fn new(incident: Incident) -> Self {
        Self { incident, surge: None, stations: Vec::new(), line: None, train_from: None }
    }
}

/// Periodic incident generator
#[derive(Debug, Clone)]
pub struct IncidentScheduler {
    config: IncidentConfig,
    timer: f64,
}

impl IncidentScheduler {
    /// Create a scheduler with its check timer at zero
    pub fn new(config: IncidentConfig) -> Self {
        Self { config, timer: 0.0 }
    }

    /// Scheduler parameters
    pub fn config(&self) -> &IncidentConfig {
        &self.config
    }

    /// Seconds accumulated toward the next check
    pub fn timer(&self) -> f64 {
        self.timer
    }

    /// Advance the check timer. Returns true when a check is due.
    pub fn advance(&mut self, dt: f64) -> bool {
        self.timer += dt;
        if self.timer >= self.config.check_interval {
            self.timer = 0.0;
            true
        } else {
            false
        }
    }

    /// Whether a uniform roll in `[0, 1)` triggers an incident
    pub fn should_trigger(&self, roll: f64) -> bool {
        roll < self.config.trigger_probability
    }

    /// Map a uniform roll in `[0, 1)` onto the weighted kind table
    pub fn choose_kind(&self, roll: f64) -> IncidentKind {
        let target = roll * self.config.total_weight();
        let mut cumulative = 0.0;
        for entry in &self.config.probabilities {
            cumulative += entry.weight;
            if target <= cumulative {
                return entry.kind;
            }
        }
        // Rounding at the top edge falls back to the first kind
        self.config
            .probabilities
            .first()
            .map(|entry| entry.kind)
            .unwrap_or(IncidentKind::StationBreakdown)
    }

    /// Roll the trigger and, on success, draw a kind
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<IncidentKind> {
        if !self.should_trigger(rng.gen::<f64>()) {
            return None;
        }
        Some(self.choose_kind(rng.gen::<f64>()))
    }

    /// Apply an incident of `kind` to a random eligible target
    ///
    /// Returns `None` when no target is eligible or the kind is reserved.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        kind: IncidentKind,
        registry: &mut NetworkRegistry,
        rng: &mut R,
        now: f64,
    ) -> Option<AppliedIncident> {
        let target = Self::pick_target(kind, registry, rng)?;
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        let incident = Incident {
            id: IncidentId::from_random_bytes(bytes),
            kind,
            target,
            duration: self.config.duration_for(kind),
            started_at: now,
        };
        let mut applied = AppliedIncident::new(incident.clone());

        match (&incident.kind, &incident.target) {
            (IncidentKind::StationBreakdown, EntityRef::Station(id)) => {
                applied.stations.extend(state::break_station(registry, id, Some(incident.id)));
            }
            (IncidentKind::LineDelay, EntityRef::Line(id)) => {
                let update = state::delay_line(registry, id, Some(incident.id))?;
                applied.stations = update.stations.clone();
                applied.line = Some(update);
            }
            (IncidentKind::Overcrowding, EntityRef::Station(id)) => {
                let surge = if self.config.surge_min < self.config.surge_max {
                    rng.gen_range(self.config.surge_min..self.config.surge_max)
                } else {
                    self.config.surge_min
                };
                let (added, _) = registry.station_mut(id)?.add_passengers(surge);
                applied.surge = Some(added);
                applied.stations.extend(state::evaluate_occupancy(registry, id));
            }
            (IncidentKind::TrainMalfunction, EntityRef::Train(id)) => {
                let train = registry.train_mut(id)?;
                let from = train.status();
                train.enter_maintenance(Some(incident.id));
                applied.train_from = Some(from);
            }
            _ => return None,
        }

        info!(
            incident = %incident.id,
            kind = %incident.kind,
            target = %incident.target,
            duration = ?incident.duration,
            "Incident applied"
        );
        Some(applied)
    }

    fn pick_target<R: Rng + ?Sized>(
        kind: IncidentKind,
        registry: &NetworkRegistry,
        rng: &mut R,
    ) -> Option<EntityRef> {
        let eligible: Vec<EntityRef> = match kind {
            IncidentKind::StationBreakdown | IncidentKind::Overcrowding => registry
                .stations_with_status(StationStatus::Normal)
                .into_iter()
                .map(EntityRef::Station)
                .collect(),
            IncidentKind::LineDelay => registry
                .lines_with_status(LineStatus::Active)
                .into_iter()
                .map(EntityRef::Line)
                .collect(),
            IncidentKind::TrainMalfunction => registry
                .trains_with_status(TrainStatus::Moving)
                .into_iter()
                .map(EntityRef::Train)
                .collect(),
            IncidentKind::SignalFailure | IncidentKind::TrackMaintenance => Vec::new(),
        };

        let target = eligible.choose(rng).cloned();
        if target.is_none() {
            debug!(kind = %kind, "No eligible target for incident");
        }
        target
    }

    /// Whether an incident's target still carries it
    ///
    /// False once the target was repaired, resumed or restored by other means,
    /// or has since been hit by a newer incident.
    pub fn is_current(incident: &Incident, registry: &NetworkRegistry) -> bool {
        let id = Some(incident.id);
        match (&incident.kind, &incident.target) {
            (IncidentKind::StationBreakdown, EntityRef::Station(s)) => registry
                .station(s)
                .is_some_and(|s| s.status() == StationStatus::Broken && s.active_incident() == id),
            (IncidentKind::LineDelay, EntityRef::Line(l)) => registry
                .line(l)
                .is_some_and(|l| l.status() == LineStatus::Delayed && l.active_incident() == id),
            (IncidentKind::TrainMalfunction, EntityRef::Train(t)) => registry.train(t).is_some_and(
                |t| t.status() == TrainStatus::Maintenance && t.active_incident() == id,
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::build_network;
    use crate::types::{IncidentProbability, SimulationConfig, TrainId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn registry() -> NetworkRegistry {
        build_network(&SimulationConfig::default()).0
    }

    fn scheduler() -> IncidentScheduler {
        IncidentScheduler::new(IncidentConfig::default())
    }

    #[test]
    fn test_timer_fires_at_interval_and_resets() {
        let mut scheduler = scheduler();
        for _ in 0..59 {
            assert!(!scheduler.advance(0.5));
        }
        assert!(scheduler.advance(0.5));
        assert_eq!(scheduler.timer(), 0.0);
    }

    #[test]
    fn test_trigger_threshold() {
        let scheduler = scheduler();
        assert!(scheduler.should_trigger(0.35));
        assert!(scheduler.should_trigger(0.0));
        assert!(!scheduler.should_trigger(0.4));
        assert!(!scheduler.should_trigger(0.9));
    }

    #[test]
    fn test_choose_kind_follows_cumulative_weights() {
        let scheduler = scheduler();
        assert_eq!(scheduler.choose_kind(0.0), IncidentKind::StationBreakdown);
        assert_eq!(scheduler.choose_kind(0.4), IncidentKind::StationBreakdown);
        assert_eq!(scheduler.choose_kind(0.55), IncidentKind::LineDelay);
        assert_eq!(scheduler.choose_kind(0.8), IncidentKind::Overcrowding);
        assert_eq!(scheduler.choose_kind(0.95), IncidentKind::TrainMalfunction);
    }

    #[test]
    fn test_choose_kind_edge_falls_back_to_first_kind() {
        let scheduler = scheduler();
        assert_eq!(scheduler.choose_kind(1.0 + 1e-9), IncidentKind::StationBreakdown);
    }

    #[test]
    fn test_choose_kind_normalizes_weights() {
        let config = IncidentConfig {
            probabilities: vec![
                IncidentProbability { kind: IncidentKind::LineDelay, weight: 1.0 },
                IncidentProbability { kind: IncidentKind::Overcrowding, weight: 3.0 },
            ],
            ..Default::default()
        };
        let scheduler = IncidentScheduler::new(config);
        assert_eq!(scheduler.choose_kind(0.2), IncidentKind::LineDelay);
        assert_eq!(scheduler.choose_kind(0.3), IncidentKind::Overcrowding);
    }

    #[test]
    fn test_breakdown_targets_a_normal_station() {
        let mut registry = registry();
        let mut rng = StdRng::seed_from_u64(11);
        let applied = scheduler()
            .apply(IncidentKind::StationBreakdown, &mut registry, &mut rng, 30.0)
            .unwrap();

        let EntityRef::Station(id) = &applied.incident.target else {
            panic!("breakdown must target a station");
        };
        let station = registry.station(id).unwrap();
        assert_eq!(station.status(), StationStatus::Broken);
        assert_eq!(station.active_incident(), Some(applied.incident.id));
        assert_eq!(applied.incident.resolves_at(), Some(90.0));
        assert_eq!(registry.delay_count(), 1);
        assert!(IncidentScheduler::is_current(&applied.incident, &registry));
    }

    #[test]
    fn test_line_delay_cascades() {
        let mut registry = registry();
        let mut rng = StdRng::seed_from_u64(5);
        let applied =
            scheduler().apply(IncidentKind::LineDelay, &mut registry, &mut rng, 0.0).unwrap();
        assert_eq!(applied.stations.len(), 4);
        assert_eq!(registry.delay_count(), 4);
        assert!(applied.line.is_some());
    }

    #[test]
    fn test_overcrowding_adds_surge_without_timer() {
        let mut registry = registry();
        let mut rng = StdRng::seed_from_u64(9);
        let applied =
            scheduler().apply(IncidentKind::Overcrowding, &mut registry, &mut rng, 0.0).unwrap();
        let surge = applied.surge.unwrap();
        assert!((150..300).contains(&surge));
        assert_eq!(registry.total_passengers(), surge as u64);
        assert!(applied.incident.duration.is_none());
    }

    #[test]
    fn test_surge_upper_bound_is_exclusive() {
        let config = IncidentConfig { surge_min: 150, surge_max: 151, ..Default::default() };
        let scheduler = IncidentScheduler::new(config);
        for seed in 0..20 {
            let mut registry = registry();
            let mut rng = StdRng::seed_from_u64(seed);
            let applied =
                scheduler.apply(IncidentKind::Overcrowding, &mut registry, &mut rng, 0.0).unwrap();
            assert_eq!(applied.surge, Some(150));
        }
    }

    #[test]
    fn test_malfunction_needs_a_moving_train() {
        let mut registry = registry();
        let mut rng = StdRng::seed_from_u64(2);
        // Every train starts Stopped
        assert!(scheduler()
            .apply(IncidentKind::TrainMalfunction, &mut registry, &mut rng, 0.0)
            .is_none());

        registry.train_mut(&TrainId::from("train_3")).unwrap().status = TrainStatus::Moving;
        let applied = scheduler()
            .apply(IncidentKind::TrainMalfunction, &mut registry, &mut rng, 0.0)
            .unwrap();
        assert_eq!(applied.incident.target, EntityRef::Train(TrainId::from("train_3")));
        assert_eq!(applied.train_from, Some(TrainStatus::Moving));
        let train = registry.train(&TrainId::from("train_3")).unwrap();
        assert_eq!(train.status(), TrainStatus::Maintenance);
    }

    #[test]
    fn test_no_eligible_target_skips() {
        let mut registry = registry();
        for id in registry.stations_with_status(StationStatus::Normal) {
            state::break_station(&mut registry, &id, None);
        }
        let mut rng = StdRng::seed_from_u64(4);
        assert!(scheduler()
            .apply(IncidentKind::StationBreakdown, &mut registry, &mut rng, 0.0)
            .is_none());
        assert!(scheduler()
            .apply(IncidentKind::SignalFailure, &mut registry, &mut rng, 0.0)
            .is_none());
    }

    #[test]
    fn test_repaired_station_is_no_longer_current() {
        let mut registry = registry();
        let mut rng = StdRng::seed_from_u64(8);
        let applied = scheduler()
            .apply(IncidentKind::StationBreakdown, &mut registry, &mut rng, 0.0)
            .unwrap();
        let EntityRef::Station(id) = applied.incident.target.clone() else {
            panic!("breakdown must target a station");
        };

        state::repair_station(&mut registry, &id);
        assert!(!IncidentScheduler::is_current(&applied.incident, &registry));

        // A newer breakdown of the same station does not revive the old one
        state::break_station(&mut registry, &id, Some(IncidentId::new()));
        assert!(!IncidentScheduler::is_current(&applied.incident, &registry));
    }
}

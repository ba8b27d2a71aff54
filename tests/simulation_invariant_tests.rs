//! Integration tests for long simulation runs
//!
//! These tests drive the full tick loop under heavy load and frequent incidents
//! and check the network invariants after every tick.

use metro_network_simulator::simulation::{Simulation, SimulationError};
use metro_network_simulator::types::*;

/// Busy network: fast growth, an incident check every 2 s that always fires
fn stress_config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        seed: Some(seed),
        growth: GrowthConfig { base_rate: 12.0, variation: 6.0 },
        incidents: IncidentConfig {
            check_interval: 2.0,
            trigger_probability: 1.0,
            station_breakdown_duration: 6.0,
            line_delay_duration: 4.0,
            train_malfunction_duration: 3.0,
            ..Default::default()
        },
        thresholds: ThresholdConfig {
            max_delay_count: 100,
            max_total_passengers: 1_000_000,
            game_duration: 10_000.0,
        },
        ..Default::default()
    }
}

fn assert_consistent(simulation: &Simulation) {
    let violations = simulation.check_invariants();
    assert!(violations.is_empty(), "tick {}: {:?}", simulation.tick_count(), violations);

    let registry = simulation.registry();
    let degraded = registry.stations().iter().filter(|s| s.status().is_degraded()).count();
    assert_eq!(registry.delay_count() as usize, degraded, "tick {}", simulation.tick_count());

    for station in registry.stations() {
        assert!(station.passenger_count() <= station.max_passengers);
    }
    for train in registry.trains() {
        assert!(train.passenger_count() <= train.capacity);
    }
}

/// Invariants hold on every tick of a long, incident-heavy run
#[test]
fn test_invariants_hold_under_stress() {
    for seed in [1, 7, 42] {
        let mut simulation = Simulation::new(stress_config(seed)).unwrap();
        simulation.start().unwrap();
        for _ in 0..1200 {
            simulation.tick();
            assert_consistent(&simulation);
            simulation.drain_events();
        }
        assert_eq!(simulation.state(), SimulationState::Running);
        assert!(simulation.statistics().total_incidents() > 0);
        assert!(simulation.statistics().arrivals > 0);
    }
}

/// Two runs with the same seed produce identical results
#[test]
fn test_seeded_runs_are_reproducible() {
    let run = |seed| {
        let mut simulation = Simulation::new(stress_config(seed)).unwrap();
        simulation.run(Some(400)).unwrap();
        (*simulation.metrics(), simulation.drain_events())
    };

    let (metrics_a, events_a) = run(99);
    let (metrics_b, events_b) = run(99);
    assert_eq!(metrics_a, metrics_b);
    assert_eq!(events_a, events_b);
}

/// Every applied incident with a duration is eventually resolved or found stale
#[test]
fn test_timed_incidents_are_accounted_for() {
    let mut simulation = Simulation::new(stress_config(3)).unwrap();
    simulation.run(Some(600)).unwrap();

    let stats = simulation.statistics().clone();
    let timed = stats.total_incidents()
        - stats.incidents_by_kind.get(&IncidentKind::Overcrowding).copied().unwrap_or(0);
    let settled = stats.incidents_resolved + stats.stale_resolutions;
    // Incidents applied in the last few seconds may still be pending
    assert!(settled <= timed);
    assert!(timed - settled <= simulation.pending_actions() as u64);
}

/// The default run ends through one of the thresholds
#[test]
fn test_default_run_reaches_game_over() {
    let config = SimulationConfig { seed: Some(2024), ..Default::default() };
    let mut simulation = Simulation::new(config).unwrap();
    let reason = simulation.run(None).unwrap();

    assert!(reason.is_some());
    assert_eq!(simulation.state(), SimulationState::GameOver);
    assert!(simulation.elapsed() <= 600.0);
    assert!(simulation.statistics().finished_at.is_some());

    let report = simulation.statistics().generate_summary_report();
    assert!(report.contains("Outcome: Game Over"));
}

/// Commands are rejected once the run is over but queries keep working
#[test]
fn test_commands_rejected_after_game_over() {
    let mut config = SimulationConfig { seed: Some(8), ..Default::default() };
    config.thresholds.game_duration = 5.0;
    let mut simulation = Simulation::new(config).unwrap();
    simulation.run(None).unwrap();

    let central = StationId::from("central");
    assert!(matches!(
        simulation.repair_station(&central),
        Err(SimulationError::InvalidState(SimulationState::GameOver))
    ));
    assert!(simulation.force_incident(None).is_err());
    assert!(simulation.pause().is_err());
    assert!(simulation.station(&central).is_some());
    assert_eq!(simulation.connections(&central).unwrap().len(), 4);
}

/// Pausing freezes the clock and growth while commands still apply
#[test]
fn test_pause_freezes_growth() {
    let mut simulation = Simulation::new(stress_config(12)).unwrap();
    simulation.run(Some(10)).unwrap();
    simulation.pause().unwrap();

    let before = simulation.registry().waiting_passengers();
    for _ in 0..20 {
        assert!(!simulation.tick());
    }
    assert_eq!(simulation.registry().waiting_passengers(), before);
    assert_eq!(simulation.tick_count(), 10);

    let removed = simulation.evacuate_station(&StationId::from("harbor")).unwrap();
    assert_eq!(
        simulation.registry().waiting_passengers(),
        before - removed as u64
    );

    simulation.resume().unwrap();
    assert!(simulation.tick());
}

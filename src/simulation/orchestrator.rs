//! Main simulation orchestrator
//!
//! This module contains [`Simulation`], which owns the network registry and
//! drives every component through a fixed tick order:
//!
//! 1. Advance the clock
//! 2. Passenger growth
//! 3. Incident check (timer, roll, application)
//! 4. Deferred actions due this tick (departures, incident resolutions)
//! 5. Train motion and arrivals
//! 6. Aggregation
//! 7. Game-over evaluation
//!
//! Each step completes before the next begins. Manual commands (repair,
//! resume, stop, evacuate, surge, forced incidents) are applied immediately and
//! stay available while the simulation is paused.

use crate::events::{EventLog, EventRecord, SimulationEvent};
use crate::network::{
    build_network, state, Line, NetworkRegistry, Station, StationTransition, Train,
};
use crate::simulation::{
    Aggregator, ConfigurationIssue, DeferredAction, DeferredActionQueue, DepartOutcome, FlowStats,
    GameOverMonitor, Incident, IncidentScheduler, MotionDriver, NetworkMetrics,
    PassengerFlowModel, RunStatistics, SimulationClock, SimulationError, SimulationResult,
};
use crate::types::{
    EntityRef, GameOverReason, IncidentId, IncidentKind, LineId, SimulationConfig,
    SimulationState, StationId, TrainId, TrainStatus,
};
use crate::{perf_span, sim_event};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::{debug, info, instrument, trace};

/// A running metro network simulation
#[derive(Debug)]
pub struct Simulation {
    config: SimulationConfig,
    registry: NetworkRegistry,
    clock: SimulationClock,
    deferred: DeferredActionQueue,
    flow: PassengerFlowModel,
    incidents: IncidentScheduler,
    motion: MotionDriver,
    aggregator: Aggregator,
    monitor: GameOverMonitor,
    state: SimulationState,
    game_over_reason: Option<GameOverReason>,
    metrics: NetworkMetrics,
    statistics: RunStatistics,
    events: EventLog,
    issues: Vec<ConfigurationIssue>,
    rng: StdRng,
    wall_start: Option<Instant>,
}

impl Simulation {
    /// Validate the configuration and build the network
    ///
    /// The simulation starts in `Initializing`; call [`start`](Self::start) to
    /// schedule the first departures.
    #[instrument(skip(config), fields(
        stations = config.network.stations.len(),
        lines = config.network.lines.len(),
        seed = ?config.seed
    ))]
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;

        let rng = if let Some(seed) = config.seed {
            info!("Using deterministic seed: {}", seed);
            StdRng::seed_from_u64(seed)
        } else {
            debug!("Using entropy-based random seed");
            StdRng::from_entropy()
        };

        let (mut registry, issues) = build_network(&config);
        let mut aggregator = Aggregator::new();
        let metrics = aggregator.collect(&mut registry, 0.0);
        let mut statistics = RunStatistics::new(
            registry.station_count(),
            registry.line_count(),
            registry.train_count(),
            issues.len(),
        );
        statistics.observe(&metrics);

        info!(
            stations = registry.station_count(),
            lines = registry.line_count(),
            trains = registry.train_count(),
            excluded = issues.len(),
            "Simulation initialized"
        );

        Ok(Self {
            clock: SimulationClock::new(config.tick_interval),
            deferred: DeferredActionQueue::new(),
            flow: PassengerFlowModel::new(config.growth.clone(), config.dwell.clone()),
            incidents: IncidentScheduler::new(config.incidents.clone()),
            motion: MotionDriver::new(config.dwell.minimum_stop_time),
            monitor: GameOverMonitor::new(config.thresholds.clone()),
            aggregator,
            state: SimulationState::Initializing,
            game_over_reason: None,
            metrics,
            statistics,
            events: EventLog::default(),
            issues,
            rng,
            wall_start: None,
            registry,
            config,
        })
    }

    /// Start the run
    ///
    /// Every train is given a random start delay before its first departure.
    pub fn start(&mut self) -> SimulationResult<()> {
        if self.state != SimulationState::Initializing {
            return Err(SimulationError::InvalidState(self.state));
        }

        let (min, max) = self.config.start_delay_range();
        for train_id in self.registry.train_ids() {
            let delay = if max > min { self.rng.gen_range(min..=max) } else { min };
            if let Some(seq) = self.motion.prepare_departure(&mut self.registry, &train_id) {
                self.deferred.schedule(delay, DeferredAction::DepartTrain { train_id, seq });
            }
        }

        self.wall_start = Some(Instant::now());
        self.set_state(SimulationState::Running);
        sim_event!(info, "Simulation started", trains = self.registry.train_count());
        Ok(())
    }

    /// Advance one tick
    ///
    /// Returns false without doing anything unless the simulation is Running.
    pub fn tick(&mut self) -> bool {
        if self.state != SimulationState::Running {
            return false;
        }

        let dt = self.clock.advance();
        let now = self.clock.elapsed();
        let span = perf_span!("tick", tick = self.clock.tick_count());
        let _enter = span.enter();
        self.statistics.ticks = self.clock.tick_count();
        self.statistics.simulated_seconds = now;

        let growth = self.flow.grow(&mut self.registry, dt, &mut self.rng);
        self.statistics.passengers_generated += growth.added;
        for transition in growth.transitions {
            self.emit_station(transition);
        }

        if self.incidents.advance(dt) {
            self.statistics.incident_checks += 1;
            if let Some(kind) = self.incidents.roll(&mut self.rng) {
                self.statistics.incident_attempts += 1;
                self.apply_incident(kind);
            }
        }

        for action in self.deferred.drain_due(now) {
            match action {
                DeferredAction::DepartTrain { train_id, seq } => {
                    if self.motion.departure_is_current(&self.registry, &train_id, seq) {
                        self.dispatch(&train_id);
                    } else {
                        trace!(train = %train_id, seq, "Superseded departure dropped");
                    }
                }
                DeferredAction::ResolveIncident(incident) => self.resolve_incident(incident),
            }
        }

        for train_id in self.registry.train_ids() {
            if self.motion.advance(&mut self.registry, &train_id, dt) {
                self.handle_arrival(&train_id);
            }
        }

        self.metrics = self.aggregator.collect(&mut self.registry, now);
        self.statistics.observe(&self.metrics);
        self.emit(SimulationEvent::MetricsUpdated(self.metrics));

        if let Some(reason) = self.monitor.evaluate(&self.metrics) {
            self.end(reason);
        }
        true
    }

    /// Start if needed, then tick until game over or `max_ticks`
    ///
    /// Returns the game-over reason, or `None` when the tick limit stopped the
    /// run first.
    pub fn run(&mut self, max_ticks: Option<u64>) -> SimulationResult<Option<GameOverReason>> {
        self.run_with(max_ticks, |_| Ok(()))
    }

    /// Like [`run`](Self::run), calling `after_tick` once per processed tick
    ///
    /// An error from the callback stops the run and is returned as is.
    pub fn run_with<F>(
        &mut self,
        max_ticks: Option<u64>,
        mut after_tick: F,
    ) -> SimulationResult<Option<GameOverReason>>
    where
        F: FnMut(&mut Simulation) -> SimulationResult<()>,
    {
        if self.state == SimulationState::Initializing {
            self.start()?;
        }
        if self.state == SimulationState::Paused {
            self.resume()?;
        }

        let span = perf_span!("simulation_run", max_ticks = max_ticks.unwrap_or(0));
        let _enter = span.enter();
        let mut ticks = 0u64;
        while self.state == SimulationState::Running {
            if max_ticks.is_some_and(|max| ticks >= max) {
                info!(ticks, "Tick limit reached");
                break;
            }
            self.tick();
            ticks += 1;
            after_tick(self)?;
        }

        if self.game_over_reason.is_none() {
            let wall = self.wall_start.map(|start| start.elapsed()).unwrap_or_default();
            self.statistics.finish(None, wall);
        }
        Ok(self.game_over_reason)
    }

    /// Suspend ticking; commands stay live
    pub fn pause(&mut self) -> SimulationResult<()> {
        if self.state != SimulationState::Running {
            return Err(SimulationError::InvalidState(self.state));
        }
        self.set_state(SimulationState::Paused);
        Ok(())
    }

    /// Continue after a pause
    pub fn resume(&mut self) -> SimulationResult<()> {
        if self.state != SimulationState::Paused {
            return Err(SimulationError::InvalidState(self.state));
        }
        self.set_state(SimulationState::Running);
        Ok(())
    }

    /// Pause when running, resume when paused. Returns the new state.
    pub fn toggle_pause(&mut self) -> SimulationResult<SimulationState> {
        match self.state {
            SimulationState::Running => self.pause()?,
            SimulationState::Paused => self.resume()?,
            other => return Err(SimulationError::InvalidState(other)),
        }
        Ok(self.state)
    }

    // Commands

    /// Force a station back to Normal
    ///
    /// Returns false when the station was already Normal. A breakdown incident
    /// held by the station is reported as manually resolved.
    pub fn repair_station(&mut self, station_id: &StationId) -> SimulationResult<bool> {
        self.ensure_accepting()?;
        let incident = self.station_or_err(station_id)?.active_incident();

        let Some(transition) = state::repair_station(&mut self.registry, station_id) else {
            return Ok(false);
        };
        self.statistics.manual_actions += 1;
        info!(station = %station_id, "Station repaired");
        self.emit_station(transition);
        if let Some(incident_id) = incident {
            self.emit(SimulationEvent::IncidentResolved {
                incident_id,
                kind: IncidentKind::StationBreakdown,
                target: EntityRef::Station(station_id.clone()),
                manual: true,
            });
        }
        Ok(true)
    }

    /// Take a train out of maintenance and dispatch it immediately
    ///
    /// Returns false when the train was not in maintenance.
    pub fn resume_train(&mut self, train_id: &TrainId) -> SimulationResult<bool> {
        self.ensure_accepting()?;
        let incident = self.train_or_err(train_id)?.active_incident();

        let Some(outcome) = self.motion.resume(&mut self.registry, train_id) else {
            return Ok(false);
        };
        self.statistics.manual_actions += 1;
        info!(train = %train_id, "Train resumed");
        self.handle_departure(train_id, TrainStatus::Maintenance, outcome);
        if let Some(incident_id) = incident {
            self.emit(SimulationEvent::IncidentResolved {
                incident_id,
                kind: IncidentKind::TrainMalfunction,
                target: EntityRef::Train(train_id.clone()),
                manual: true,
            });
        }
        Ok(true)
    }

    /// Put a train into maintenance
    ///
    /// Returns false when it already was.
    pub fn stop_train(&mut self, train_id: &TrainId) -> SimulationResult<bool> {
        self.ensure_accepting()?;
        let from = self.train_or_err(train_id)?.status();

        if !self.motion.stop(&mut self.registry, train_id) {
            return Ok(false);
        }
        self.statistics.manual_actions += 1;
        info!(train = %train_id, "Train stopped for maintenance");
        self.emit(SimulationEvent::TrainStatusChanged {
            train_id: train_id.clone(),
            from,
            to: TrainStatus::Maintenance,
        });
        Ok(true)
    }

    /// Remove every waiting passenger from a station. Returns how many left.
    pub fn evacuate_station(&mut self, station_id: &StationId) -> SimulationResult<u32> {
        self.ensure_accepting()?;
        self.station_or_err(station_id)?;

        let Some((removed, transition)) = self.flow.evacuate(&mut self.registry, station_id)
        else {
            return Ok(0);
        };
        if removed > 0 {
            self.statistics.manual_actions += 1;
            info!(station = %station_id, removed, "Station evacuated");
        }
        if let Some(transition) = transition {
            self.emit_station(transition);
        }
        Ok(removed)
    }

    /// Add a burst of passengers to a station. Returns how many fit.
    pub fn surge_station(&mut self, station_id: &StationId, amount: u32) -> SimulationResult<u32> {
        self.ensure_accepting()?;
        self.station_or_err(station_id)?;

        let Some((added, transition)) =
            self.flow.apply_surge(&mut self.registry, station_id, amount)
        else {
            return Ok(0);
        };
        self.statistics.manual_actions += 1;
        self.statistics.passengers_generated += added as u64;
        if let Some(transition) = transition {
            self.emit_station(transition);
        }
        Ok(added)
    }

    /// Apply an incident now, bypassing the timer and trigger roll
    ///
    /// With no kind given one is drawn from the weighted table. Returns the
    /// incident id, or `None` when no target was eligible.
    pub fn force_incident(
        &mut self,
        kind: Option<IncidentKind>,
    ) -> SimulationResult<Option<IncidentId>> {
        self.ensure_accepting()?;
        let kind = match kind {
            Some(kind) => kind,
            None => self.incidents.choose_kind(self.rng.gen::<f64>()),
        };
        if kind.is_reserved() {
            return Err(SimulationError::invalid_command(format!(
                "{} incidents are reserved and cannot be applied",
                kind
            )));
        }
        self.statistics.manual_actions += 1;
        Ok(self.apply_incident(kind))
    }

    // Queries

    /// Look up a station
    pub fn station(&self, id: &StationId) -> Option<&Station> {
        self.registry.station(id)
    }

    /// Look up a line
    pub fn line(&self, id: &LineId) -> Option<&Line> {
        self.registry.line(id)
    }

    /// Look up a train
    pub fn train(&self, id: &TrainId) -> Option<&Train> {
        self.registry.train(id)
    }

    /// Occupancy ratio of a station
    pub fn station_occupancy(&self, id: &StationId) -> SimulationResult<f64> {
        self.flow
            .station_occupancy(&self.registry, id)
            .ok_or_else(|| SimulationError::not_found(&EntityRef::Station(id.clone())))
    }

    /// Occupancy ratio of a train
    pub fn train_occupancy(&self, id: &TrainId) -> SimulationResult<f64> {
        self.flow
            .train_occupancy(&self.registry, id)
            .ok_or_else(|| SimulationError::not_found(&EntityRef::Train(id.clone())))
    }

    /// Stations adjacent to a station on any line
    pub fn connections(&self, id: &StationId) -> SimulationResult<Vec<StationId>> {
        Ok(self.station_or_err(id)?.connected_stations.iter().cloned().collect())
    }

    /// Ordered stations of a line
    pub fn line_route(&self, id: &LineId) -> SimulationResult<&[StationId]> {
        self.registry
            .line(id)
            .map(|line| line.station_ids.as_slice())
            .ok_or_else(|| SimulationError::not_found(&EntityRef::Line(id.clone())))
    }

    /// Straight-line distance between two stations
    pub fn distance_between(&self, a: &StationId, b: &StationId) -> SimulationResult<f64> {
        self.station_or_err(a)?;
        self.station_or_err(b)?;
        self.registry
            .distance_between(a, b)
            .ok_or_else(|| SimulationError::not_found(&EntityRef::Station(b.clone())))
    }

    /// Current passenger distribution
    pub fn flow_stats(&self) -> FlowStats {
        self.flow.flow_stats(&self.registry)
    }

    /// The registry
    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for scenario setup
    pub fn registry_mut(&mut self) -> &mut NetworkRegistry {
        &mut self.registry
    }

    /// Metrics from the last tick
    pub fn metrics(&self) -> &NetworkMetrics {
        &self.metrics
    }

    /// Run statistics
    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    /// Lifecycle state
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Why the run ended, once it has
    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.game_over_reason
    }

    /// Simulated seconds since start
    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Ticks processed
    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    /// Configuration the simulation was built from
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Entities excluded at build time
    pub fn configuration_issues(&self) -> &[ConfigurationIssue] {
        &self.issues
    }

    /// Deferred actions waiting to fire
    pub fn pending_actions(&self) -> usize {
        self.deferred.len()
    }

    /// Buffered notifications
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every buffered notification
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }

    /// Registry invariant violations; empty when consistent
    pub fn check_invariants(&self) -> Vec<String> {
        self.registry.check_invariants()
    }

    // Internals

    fn ensure_accepting(&self) -> SimulationResult<()> {
        if self.state.accepts_commands() {
            Ok(())
        } else {
            Err(SimulationError::InvalidState(self.state))
        }
    }

    fn station_or_err(&self, id: &StationId) -> SimulationResult<&Station> {
        self.registry
            .station(id)
            .ok_or_else(|| SimulationError::not_found(&EntityRef::Station(id.clone())))
    }

    fn train_or_err(&self, id: &TrainId) -> SimulationResult<&Train> {
        self.registry
            .train(id)
            .ok_or_else(|| SimulationError::not_found(&EntityRef::Train(id.clone())))
    }

    fn emit(&mut self, event: SimulationEvent) {
        self.events.push(self.clock.tick_count(), self.clock.elapsed(), event);
    }

    fn emit_station(&mut self, transition: StationTransition) {
        self.statistics.station_transitions += 1;
        self.emit(SimulationEvent::StationStatusChanged {
            station_id: transition.station_id,
            from: transition.from,
            to: transition.to,
        });
    }

    fn set_state(&mut self, to: SimulationState) {
        let from = self.state;
        self.state = to;
        info!(from = %from, to = %to, "Simulation state changed");
        self.emit(SimulationEvent::StateChanged { from, to });
    }

    fn end(&mut self, reason: GameOverReason) {
        self.game_over_reason = Some(reason);
        let wall = self.wall_start.map(|start| start.elapsed()).unwrap_or_default();
        self.statistics.finish(Some(reason), wall);
        self.set_state(SimulationState::GameOver);
        self.emit(SimulationEvent::GameOver { reason, elapsed: self.clock.elapsed() });
        sim_event!(
            warn,
            "Game over",
            reason = tracing::field::display(reason),
            elapsed = self.clock.elapsed(),
            delay_count = self.metrics.delay_count,
            total_passengers = self.metrics.total_passengers,
        );
    }

    fn apply_incident(&mut self, kind: IncidentKind) -> Option<IncidentId> {
        let now = self.clock.elapsed();
        let Some(applied) = self.incidents.apply(kind, &mut self.registry, &mut self.rng, now)
        else {
            self.statistics.incidents_skipped += 1;
            debug!(kind = %kind, "Incident skipped, no eligible target");
            self.emit(SimulationEvent::IncidentSkipped { kind });
            return None;
        };

        let incident = applied.incident;
        self.statistics.record_incident(kind);
        if let Some(surge) = applied.surge {
            self.statistics.passengers_generated += surge as u64;
        }
        self.emit(SimulationEvent::IncidentApplied {
            incident_id: incident.id,
            kind,
            target: incident.target.clone(),
            duration: incident.duration,
            surge: applied.surge,
        });
        if let Some(update) = applied.line {
            self.emit(SimulationEvent::LineStatusChanged {
                line_id: update.line_id,
                from: update.from,
                to: update.to,
            });
        }
        for transition in applied.stations {
            self.emit_station(transition);
        }
        if let (Some(from), EntityRef::Train(train_id)) = (applied.train_from, &incident.target) {
            self.emit(SimulationEvent::TrainStatusChanged {
                train_id: train_id.clone(),
                from,
                to: TrainStatus::Maintenance,
            });
        }

        let id = incident.id;
        if let Some(at) = incident.resolves_at() {
            self.deferred.schedule(at, DeferredAction::ResolveIncident(incident));
        }
        Some(id)
    }

    fn resolve_incident(&mut self, incident: Incident) {
        if !IncidentScheduler::is_current(&incident, &self.registry) {
            self.statistics.stale_resolutions += 1;
            debug!(incident = %incident.id, kind = %incident.kind, "Incident already cleared");
            return;
        }

        match &incident.target {
            EntityRef::Station(station_id) => {
                if let Some(transition) = state::repair_station(&mut self.registry, station_id) {
                    self.emit_station(transition);
                }
            }
            EntityRef::Line(line_id) => {
                if let Some(update) = state::restore_line(&mut self.registry, line_id) {
                    self.emit(SimulationEvent::LineStatusChanged {
                        line_id: update.line_id,
                        from: update.from,
                        to: update.to,
                    });
                    for transition in update.stations {
                        self.emit_station(transition);
                    }
                }
            }
            EntityRef::Train(train_id) => {
                if let Some(outcome) = self.motion.resume(&mut self.registry, train_id) {
                    self.handle_departure(train_id, TrainStatus::Maintenance, outcome);
                }
            }
        }

        self.statistics.incidents_resolved += 1;
        info!(incident = %incident.id, kind = %incident.kind, target = %incident.target, "Incident resolved");
        self.emit(SimulationEvent::IncidentResolved {
            incident_id: incident.id,
            kind: incident.kind,
            target: incident.target,
            manual: false,
        });
    }

    fn dispatch(&mut self, train_id: &TrainId) {
        let Some(from) = self.registry.train(train_id).map(|t| t.status()) else {
            return;
        };
        if let Some(outcome) = self.motion.depart(&mut self.registry, train_id) {
            self.handle_departure(train_id, from, outcome);
        }
    }

    fn handle_departure(&mut self, train_id: &TrainId, from: TrainStatus, outcome: DepartOutcome) {
        match outcome {
            DepartOutcome::Departed { from: from_station, to, .. } => {
                if from != TrainStatus::Stopped {
                    self.emit(SimulationEvent::TrainStatusChanged {
                        train_id: train_id.clone(),
                        from,
                        to: TrainStatus::Moving,
                    });
                }
                self.emit(SimulationEvent::TrainDeparted {
                    train_id: train_id.clone(),
                    from_station,
                    to_station: to,
                });
            }
            DepartOutcome::Stalled { line_id, first, .. } => {
                if from == TrainStatus::Maintenance {
                    self.emit(SimulationEvent::TrainStatusChanged {
                        train_id: train_id.clone(),
                        from,
                        to: TrainStatus::Stopped,
                    });
                }
                if first {
                    self.statistics.stall_events += 1;
                    self.emit(SimulationEvent::TrainStalled { train_id: train_id.clone(), line_id });
                }
                self.schedule_departure(train_id, self.motion.retry_delay());
            }
        }
    }

    fn handle_arrival(&mut self, train_id: &TrainId) {
        let Some(outcome) = self.flow.process_arrival(&mut self.registry, train_id) else {
            return;
        };
        self.statistics.record_arrival(outcome.alighted, outcome.boarded);
        self.emit(SimulationEvent::TrainArrived {
            train_id: train_id.clone(),
            station_id: outcome.station_id,
            alighted: outcome.alighted,
            boarded: outcome.boarded,
            dwell: outcome.dwell,
        });
        if let Some(transition) = outcome.transition {
            self.emit_station(transition);
        }
        self.schedule_departure(train_id, outcome.dwell);
    }

    fn schedule_departure(&mut self, train_id: &TrainId, delay: f64) {
        if let Some(seq) = self.motion.prepare_departure(&mut self.registry, train_id) {
            self.deferred.schedule(
                self.clock.elapsed() + delay,
                DeferredAction::DepartTrain { train_id: train_id.clone(), seq },
            );
        }
    }
}

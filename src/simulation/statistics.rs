//! Statistics collection and reporting
//!
//! [`RunStatistics`] counts what happened over a run (incidents, arrivals,
//! passenger movements, status changes) and renders the end-of-run report.

use crate::simulation::NetworkMetrics;
use crate::types::{GameOverReason, IncidentKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Counters accumulated over a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatistics {
    // Network overview
    /// Stations in the network
    pub stations: usize,
    /// Lines in the network
    pub lines: usize,
    /// Trains in the network
    pub trains: usize,
    /// Entities excluded because of configuration defects
    pub configuration_issues: usize,

    // Clock
    /// Ticks processed
    pub ticks: u64,
    /// Simulated seconds
    pub simulated_seconds: f64,

    // Incidents
    /// Incident checks performed
    pub incident_checks: u64,
    /// Checks whose roll triggered an incident
    pub incident_attempts: u64,
    /// Incidents applied, by kind
    pub incidents_by_kind: BTreeMap<IncidentKind, u64>,
    /// Incidents skipped for lack of an eligible target
    pub incidents_skipped: u64,
    /// Incidents resolved by their timer
    pub incidents_resolved: u64,
    /// Resolution timers that found their incident already cleared
    pub stale_resolutions: u64,
    /// Manual commands that changed something
    pub manual_actions: u64,

    // Trains and passengers
    /// Train arrivals at stations
    pub arrivals: u64,
    /// Passengers that boarded a train
    pub passengers_boarded: u64,
    /// Passengers that left the network at a station
    pub passengers_alighted: u64,
    /// Passengers that appeared at stations through growth and surges
    pub passengers_generated: u64,
    /// Times a train found every station on its route broken
    pub stall_events: u64,

    // Network health
    /// Station status changes
    pub station_transitions: u64,
    /// Highest delay counter seen
    pub peak_delay_count: u32,
    /// Highest passenger total seen
    pub peak_total_passengers: u64,

    // Run metadata
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Wall-clock end
    pub finished_at: Option<DateTime<Utc>>,
    /// Why the run ended
    pub game_over_reason: Option<GameOverReason>,
    /// Wall-clock duration
    pub wall_duration: Duration,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl RunStatistics {
    /// Create statistics for a network of the given size
    pub fn new(stations: usize, lines: usize, trains: usize, configuration_issues: usize) -> Self {
        Self {
            stations,
            lines,
            trains,
            configuration_issues,
            ticks: 0,
            simulated_seconds: 0.0,
            incident_checks: 0,
            incident_attempts: 0,
            incidents_by_kind: BTreeMap::new(),
            incidents_skipped: 0,
            incidents_resolved: 0,
            stale_resolutions: 0,
            manual_actions: 0,
            arrivals: 0,
            passengers_boarded: 0,
            passengers_alighted: 0,
            passengers_generated: 0,
            stall_events: 0,
            station_transitions: 0,
            peak_delay_count: 0,
            peak_total_passengers: 0,
            started_at: Utc::now(),
            finished_at: None,
            game_over_reason: None,
            wall_duration: Duration::from_secs(0),
        }
    }

    /// Record an applied incident
    pub fn record_incident(&mut self, kind: IncidentKind) {
        *self.incidents_by_kind.entry(kind).or_insert(0) += 1;
    }

    /// Record a passenger exchange
    pub fn record_arrival(&mut self, alighted: u32, boarded: u32) {
        self.arrivals += 1;
        self.passengers_alighted += alighted as u64;
        self.passengers_boarded += boarded as u64;
    }

    /// Fold a metrics snapshot into the peaks
    pub fn observe(&mut self, metrics: &NetworkMetrics) {
        self.peak_delay_count = self.peak_delay_count.max(metrics.delay_count);
        self.peak_total_passengers = self.peak_total_passengers.max(metrics.total_passengers);
    }

    /// Mark the run finished
    pub fn finish(&mut self, reason: Option<GameOverReason>, wall_duration: Duration) {
        self.finished_at = Some(Utc::now());
        self.game_over_reason = reason;
        self.wall_duration = wall_duration;
    }

    /// Incidents applied across all kinds
    pub fn total_incidents(&self) -> u64 {
        self.incidents_by_kind.values().sum()
    }

    /// Share of applied incidents of one kind
    pub fn incident_percentage(&self, kind: IncidentKind) -> f64 {
        let total = self.total_incidents();
        if total == 0 {
            0.0
        } else {
            (self.incidents_by_kind.get(&kind).copied().unwrap_or(0) as f64 / total as f64) * 100.0
        }
    }

    /// Share of incident checks that triggered
    pub fn trigger_rate(&self) -> f64 {
        if self.incident_checks == 0 {
            0.0
        } else {
            (self.incident_attempts as f64 / self.incident_checks as f64) * 100.0
        }
    }

    /// Mean passengers boarding per arrival
    pub fn average_boarding(&self) -> f64 {
        if self.arrivals == 0 {
            0.0
        } else {
            self.passengers_boarded as f64 / self.arrivals as f64
        }
    }

    /// One-line summary suitable for logging
    pub fn summary(&self) -> String {
        format!(
            "Run Summary: {} ticks ({:.1}s simulated) | Incidents: {} applied, {} skipped, {} resolved | Arrivals: {} | Boarded: {} | Peak delays: {}",
            self.ticks,
            self.simulated_seconds,
            self.total_incidents(),
            self.incidents_skipped,
            self.incidents_resolved,
            self.arrivals,
            self.passengers_boarded,
            self.peak_delay_count
        )
    }

    /// Incident counts per kind with percentages
    pub fn detailed_breakdown(&self) -> String {
        let mut breakdown = String::new();
        breakdown.push_str("=== Incident Breakdown ===\n");
        breakdown.push_str(&format!(
            "Checks: {} | Triggered: {} ({:.1}%)\n\n",
            self.incident_checks,
            self.incident_attempts,
            self.trigger_rate()
        ));

        for kind in IncidentKind::GENERATED {
            breakdown.push_str(&format!(
                "  • {}: {} ({:.1}%)\n",
                kind,
                self.incidents_by_kind.get(&kind).copied().unwrap_or(0),
                self.incident_percentage(kind)
            ));
        }

        breakdown.push_str(&format!("\n  • Skipped (no eligible target): {}\n", self.incidents_skipped));
        breakdown.push_str(&format!("  • Resolved by timer: {}\n", self.incidents_resolved));
        breakdown.push_str(&format!("  • Already cleared when timer fired: {}\n", self.stale_resolutions));
        breakdown
    }

    /// Full end-of-run report
    pub fn generate_summary_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Metro Network Simulation Report ===\n\n");

        match self.game_over_reason {
            Some(reason) => report.push_str(&format!("Outcome: Game Over ({})\n", reason)),
            None => report.push_str("Outcome: Stopped before game over\n"),
        }
        report.push_str(&format!(
            "Simulated Time: {:.1} seconds over {} ticks\n",
            self.simulated_seconds, self.ticks
        ));
        report.push_str(&format!(
            "Wall Time: {:.2} seconds\n\n",
            self.wall_duration.as_secs_f64()
        ));

        report.push_str("Network:\n");
        report.push_str(&format!("  • Stations: {}\n", self.stations));
        report.push_str(&format!("  • Lines: {}\n", self.lines));
        report.push_str(&format!("  • Trains: {}\n", self.trains));
        if self.configuration_issues > 0 {
            report.push_str(&format!("  • Excluded entities: {}\n", self.configuration_issues));
        }
        report.push('\n');

        report.push_str("Passengers:\n");
        report.push_str(&format!("  • Generated: {}\n", self.passengers_generated));
        report.push_str(&format!(
            "  • Boarded: {} (avg {:.1} per arrival)\n",
            self.passengers_boarded,
            self.average_boarding()
        ));
        report.push_str(&format!("  • Alighted: {}\n", self.passengers_alighted));
        report.push_str(&format!("  • Peak in network: {}\n\n", self.peak_total_passengers));

        report.push_str("Operations:\n");
        report.push_str(&format!("  • Train arrivals: {}\n", self.arrivals));
        report.push_str(&format!("  • Stalls: {}\n", self.stall_events));
        report.push_str(&format!("  • Station status changes: {}\n", self.station_transitions));
        report.push_str(&format!("  • Peak delayed stations: {}\n", self.peak_delay_count));
        report.push_str(&format!("  • Manual actions: {}\n\n", self.manual_actions));

        report.push_str(&self.detailed_breakdown());
        report
    }
}

//! Network construction
//!
//! This module turns the static network configuration into a populated
//! [`NetworkRegistry`]. Entity-level configuration defects exclude only the
//! affected entity; each one is logged and returned as a [`ConfigurationIssue`].
//!
//! Build order:
//!
//! 1. Stations (ids must be unique and capacity positive)
//! 2. Lines (routes must be non-empty and reference known stations), with
//!    symmetric station connections including the loop-closing edge
//! 3. Default trains per line, numbered `train_1`, `train_2`, ... in line order
//! 4. Explicitly configured trains

use crate::network::{Line, NetworkRegistry, Station, Train};
use crate::simulation::{ConfigurationIssue, IssueKind};
use crate::types::{EntityKind, NetworkConfig, SimulationConfig, TrainId};
use tracing::{info, warn};

/// Builds a registry from configuration and collects configuration issues
#[derive(Debug)]
pub struct NetworkBuilder<'a> {
    network: &'a NetworkConfig,
    train_capacity: u32,
    issues: Vec<ConfigurationIssue>,
}

impl<'a> NetworkBuilder<'a> {
    /// Create a builder over a simulation configuration
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { network: &config.network, train_capacity: config.train_capacity, issues: Vec::new() }
    }

    /// Build the registry
    pub fn build(mut self) -> (NetworkRegistry, Vec<ConfigurationIssue>) {
        let mut registry = NetworkRegistry::new();

        self.add_stations(&mut registry);
        self.add_lines(&mut registry);
        self.add_default_trains(&mut registry);
        self.add_configured_trains(&mut registry);

        info!(
            stations = registry.station_count(),
            lines = registry.line_count(),
            trains = registry.train_count(),
            issues = self.issues.len(),
            "Network built"
        );

        (registry, self.issues)
    }

    fn report(&mut self, issue: ConfigurationIssue) {
        warn!(entity = %issue.entity, id = %issue.id, kind = %issue.kind, "{}", issue.detail);
        self.issues.push(issue);
    }

    fn add_stations(&mut self, registry: &mut NetworkRegistry) {
        let network = self.network;
        for config in &network.stations {
            if config.max_passengers == 0 {
                self.report(ConfigurationIssue::new(
                    EntityKind::Station,
                    config.id.as_str(),
                    IssueKind::InvalidParameter,
                    "station capacity must be greater than 0",
                ));
                continue;
            }
            if !registry.add_station(Station::new(config)) {
                self.report(ConfigurationIssue::new(
                    EntityKind::Station,
                    config.id.as_str(),
                    IssueKind::DuplicateId,
                    "station id already in use",
                ));
            }
        }
    }

    fn add_lines(&mut self, registry: &mut NetworkRegistry) {
        let network = self.network;
        for config in &network.lines {
            if config.station_ids.is_empty() {
                self.report(ConfigurationIssue::new(
                    EntityKind::Line,
                    config.id.as_str(),
                    IssueKind::EmptyRoute,
                    "line has no stations",
                ));
                continue;
            }

            let unknown: Vec<String> = config
                .station_ids
                .iter()
                .filter(|id| registry.station(id).is_none())
                .map(|id| id.to_string())
                .collect();
            if !unknown.is_empty() {
                self.report(ConfigurationIssue::new(
                    EntityKind::Line,
                    config.id.as_str(),
                    IssueKind::UnknownStation,
                    format!("route references unknown stations: {}", unknown.join(", ")),
                ));
                continue;
            }

            let line = Line::new(config);
            let edges: Vec<_> =
                line.segments().map(|(a, b)| (a.clone(), b.clone())).collect();
            if !registry.add_line(line) {
                self.report(ConfigurationIssue::new(
                    EntityKind::Line,
                    config.id.as_str(),
                    IssueKind::DuplicateId,
                    "line id already in use",
                ));
                continue;
            }

            for (a, b) in edges {
                if let Some(station) = registry.station_mut(&a) {
                    station.connect(&b);
                }
                if let Some(station) = registry.station_mut(&b) {
                    station.connect(&a);
                }
            }
        }
    }

    fn add_default_trains(&mut self, registry: &mut NetworkRegistry) {
        let mut counter = 1;
        let lines: Vec<Line> = registry.lines().to_vec();

        for line in &lines {
            if line.nominal_train_count > 0 && !(line.train_speed > 0.0) {
                self.report(ConfigurationIssue::new(
                    EntityKind::Line,
                    line.id.as_str(),
                    IssueKind::InvalidParameter,
                    format!("train speed must be positive, got {}", line.train_speed),
                ));
                continue;
            }

            for _ in 0..line.nominal_train_count {
                let id = TrainId::numbered(counter);
                counter += 1;
                self.spawn(registry, line, id, self.train_capacity, line.train_speed);
            }
        }
    }

    fn add_configured_trains(&mut self, registry: &mut NetworkRegistry) {
        let network = self.network;
        for config in &network.trains {
            let line = match registry.line(&config.line_id) {
                Some(line) => line.clone(),
                None => {
                    self.report(ConfigurationIssue::new(
                        EntityKind::Train,
                        config.id.as_str(),
                        IssueKind::MissingLine,
                        format!("line {} does not exist", config.line_id),
                    ));
                    continue;
                }
            };

            let capacity = config.capacity.unwrap_or(self.train_capacity);
            let speed = config.speed.unwrap_or(line.train_speed);
            if capacity == 0 || !(speed > 0.0) {
                self.report(ConfigurationIssue::new(
                    EntityKind::Train,
                    config.id.as_str(),
                    IssueKind::InvalidParameter,
                    format!("capacity {} and speed {} must be positive", capacity, speed),
                ));
                continue;
            }

            self.spawn(registry, &line, config.id.clone(), capacity, speed);
        }
    }

    fn spawn(
        &mut self,
        registry: &mut NetworkRegistry,
        line: &Line,
        id: TrainId,
        capacity: u32,
        speed: f64,
    ) {
        let start = line
            .station_at(0)
            .and_then(|first| registry.station(first))
            .map(|station| station.position)
            .unwrap_or_default();

        let Some(train) =
            Train::new(id.clone(), line.id.clone(), &line.station_ids, start, capacity, speed)
        else {
            self.report(ConfigurationIssue::new(
                EntityKind::Train,
                id.as_str(),
                IssueKind::EmptyRoute,
                format!("line {} has no stations", line.id),
            ));
            return;
        };

        if !registry.add_train(train) {
            self.report(ConfigurationIssue::new(
                EntityKind::Train,
                id.as_str(),
                IssueKind::DuplicateId,
                "train id already in use",
            ));
        }
    }
}

/// Build a registry from configuration
pub fn build_network(config: &SimulationConfig) -> (NetworkRegistry, Vec<ConfigurationIssue>) {
    NetworkBuilder::new(config).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        LineConfig, LineId, Position, StationConfig, StationId, TrainConfig, TrainStatus,
    };

    fn station(id: &str, x: f64) -> StationConfig {
        StationConfig {
            id: StationId::from(id),
            name: id.to_string(),
            position: Position::new(x, 0.0, 0.0),
            max_passengers: 500,
            initial_passengers: 0,
        }
    }

    fn line(id: &str, stops: &[&str], trains: u32) -> LineConfig {
        LineConfig {
            id: LineId::from(id),
            name: id.to_string(),
            station_ids: stops.iter().map(|s| StationId::from(*s)).collect(),
            default_train_count: trains,
            train_speed: 5.0,
        }
    }

    fn config(lines: Vec<LineConfig>, trains: Vec<TrainConfig>) -> SimulationConfig {
        SimulationConfig {
            network: NetworkConfig {
                stations: vec![station("a", 0.0), station("b", 10.0), station("c", 20.0)],
                lines,
                trains,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_network_builds_cleanly() {
        let (registry, issues) = build_network(&SimulationConfig::default());
        assert!(issues.is_empty());
        assert_eq!(registry.station_count(), 7);
        assert_eq!(registry.line_count(), 2);
        assert_eq!(registry.train_count(), 4);
        assert!(registry.train(&TrainId::from("train_4")).is_some());
        assert!(registry.check_invariants().is_empty());
    }

    #[test]
    fn test_connections_are_symmetric_and_loop_closed() {
        let (registry, _) = build_network(&config(vec![line("red", &["a", "b", "c"], 0)], vec![]));
        let a = registry.station(&StationId::from("a")).unwrap();
        let c = registry.station(&StationId::from("c")).unwrap();
        assert!(a.is_connected_to(&StationId::from("b")));
        assert!(a.is_connected_to(&StationId::from("c")));
        assert!(c.is_connected_to(&StationId::from("a")));
    }

    #[test]
    fn test_trains_start_at_first_station() {
        let (registry, _) = build_network(&config(vec![line("red", &["b", "c"], 2)], vec![]));
        let train = registry.train(&TrainId::from("train_2")).unwrap();
        assert_eq!(train.status(), TrainStatus::Stopped);
        assert_eq!(train.current_station_id().as_str(), "b");
        assert_eq!(train.next_station_id().as_str(), "c");
        assert_eq!(train.position(), Position::new(10.0, 0.0, 0.0));
        assert_eq!(train.capacity, 200);
        assert_eq!(train.speed, 5.0);
    }

    #[test]
    fn test_bad_lines_are_excluded() {
        let (registry, issues) = build_network(&config(
            vec![line("empty", &[], 1), line("ghost", &["a", "zzz"], 1), line("ok", &["a", "b"], 1)],
            vec![],
        ));
        assert_eq!(registry.line_count(), 1);
        assert_eq!(registry.train_count(), 1);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::EmptyRoute);
        assert_eq!(issues[1].kind, IssueKind::UnknownStation);
        assert!(issues[1].detail.contains("zzz"));
        // The excluded line never connected its stations
        assert!(!registry.station(&StationId::from("a")).unwrap().is_connected_to(&"zzz".into()));
    }

    #[test]
    fn test_train_with_missing_line_is_excluded() {
        let trains = vec![
            TrainConfig {
                id: TrainId::from("express"),
                line_id: LineId::from("red"),
                capacity: Some(300),
                speed: Some(8.0),
            },
            TrainConfig {
                id: TrainId::from("orphan"),
                line_id: LineId::from("ghost"),
                capacity: None,
                speed: None,
            },
        ];
        let (registry, issues) = build_network(&config(vec![line("red", &["a", "b"], 1)], trains));

        assert_eq!(registry.train_count(), 2);
        let express = registry.train(&TrainId::from("express")).unwrap();
        assert_eq!(express.capacity, 300);
        assert_eq!(express.speed, 8.0);
        assert!(registry.train(&TrainId::from("orphan")).is_none());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingLine);
        assert_eq!(issues[0].entity, EntityKind::Train);
    }

    #[test]
    fn test_invalid_speed_excludes_trains_only() {
        let mut bad = line("slow", &["a", "b"], 2);
        bad.train_speed = 0.0;
        let (registry, issues) = build_network(&config(vec![bad], vec![]));
        assert_eq!(registry.line_count(), 1);
        assert_eq!(registry.train_count(), 0);
        assert_eq!(issues[0].kind, IssueKind::InvalidParameter);
    }

    #[test]
    fn test_bad_stations_are_excluded() {
        let mut config =
            config(vec![line("red", &["a", "b"], 1), line("blue", &["c", "b"], 1)], vec![]);
        config.network.stations[2].max_passengers = 0;
        config.network.stations.push(station("a", 50.0));

        let (registry, issues) = build_network(&config);
        assert_eq!(registry.station_count(), 2);
        assert!(registry.station(&StationId::from("c")).is_none());
        let a = registry.station(&StationId::from("a")).unwrap();
        assert_eq!(a.position, Position::new(0.0, 0.0, 0.0));

        let kinds: Vec<_> = issues.iter().map(|i| (i.id.as_str(), i.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("c", IssueKind::InvalidParameter),
                ("a", IssueKind::DuplicateId),
                ("blue", IssueKind::UnknownStation),
            ]
        );
        assert_eq!(registry.line_count(), 1);
        assert_eq!(registry.train_count(), 1);
    }
}

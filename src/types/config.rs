//! Configuration structures for the metro network simulator
//!
//! This module contains the simulation configuration structure and validation logic
//! used to control the behavior and parameters of the simulation system.
//!
//! Configuration is layered: built-in defaults (including a small sample network),
//! then an optional JSON file, then command line overrides.

use super::{IncidentKind, LineId, ReportFormat, StationId, TrainId};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Occupancy thresholds driving station status transitions
pub mod occupancy {
    /// Occupancy at or above which a normal station becomes delayed
    pub const DELAY_THRESHOLD: f64 = 0.9;

    /// Occupancy below which a crowding delay clears
    pub const RECOVERY_THRESHOLD: f64 = 0.7;

    /// Occupancy above which a station or train counts as crowded in flow statistics
    pub const CROWDED_THRESHOLD: f64 = 0.9;
}

/// Train motion constants
pub mod motion {
    /// Distance under which a train counts as arrived at its target
    pub const ARRIVAL_EPSILON: f64 = 0.2;
}

/// Point in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate (height)
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Position {
    /// Create a position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Move towards `target` by at most `max_step`, never overshooting
    pub fn move_towards(&self, target: &Position, max_step: f64) -> Position {
        let distance = self.distance_to(target);
        if distance <= max_step || distance == 0.0 {
            return *target;
        }
        let ratio = max_step / distance;
        Position {
            x: self.x + (target.x - self.x) * ratio,
            y: self.y + (target.y - self.y) * ratio,
            z: self.z + (target.z - self.z) * ratio,
        }
    }
}

/// Static description of a station
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationConfig {
    /// Unique station id
    pub id: StationId,
    /// Display name
    pub name: String,
    /// World position
    #[serde(default)]
    pub position: Position,
    /// Passenger capacity
    #[serde(default = "default_station_capacity")]
    pub max_passengers: u32,
    /// Passengers waiting when the run starts (clamped to capacity)
    #[serde(default)]
    pub initial_passengers: u32,
}

fn default_station_capacity() -> u32 {
    500
}

/// Static description of a line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineConfig {
    /// Unique line id
    pub id: LineId,
    /// Display name
    pub name: String,
    /// Ordered station ids; the last station connects back to the first
    pub station_ids: Vec<StationId>,
    /// Trains spawned on this line at start
    #[serde(default = "default_train_count")]
    pub default_train_count: u32,
    /// Speed of the trains spawned on this line
    #[serde(default = "default_train_speed")]
    pub train_speed: f64,
}

fn default_train_count() -> u32 {
    2
}

fn default_train_speed() -> f64 {
    5.0
}

/// Explicitly configured train, in addition to the per-line defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainConfig {
    /// Unique train id
    pub id: TrainId,
    /// Line the train runs on
    pub line_id: LineId,
    /// Passenger capacity (defaults to the global train capacity)
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Speed (defaults to the line's train speed)
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Stations, lines and trains created at initialization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Stations
    pub stations: Vec<StationConfig>,
    /// Lines
    pub lines: Vec<LineConfig>,
    /// Extra trains
    #[serde(default)]
    pub trains: Vec<TrainConfig>,
}

impl NetworkConfig {
    /// Built-in sample network: seven stations served by two loop lines
    pub fn sample() -> Self {
        let station = |id: &str, name: &str, x: f64, z: f64| StationConfig {
            id: StationId::from(id),
            name: name.to_string(),
            position: Position::new(x, 0.0, z),
            max_passengers: default_station_capacity(),
            initial_passengers: 0,
        };
        let line = |id: &str, name: &str, stops: &[&str]| LineConfig {
            id: LineId::from(id),
            name: name.to_string(),
            station_ids: stops.iter().map(|s| StationId::from(*s)).collect(),
            default_train_count: default_train_count(),
            train_speed: default_train_speed(),
        };

        Self {
            stations: vec![
                station("central", "Central", 0.0, 0.0),
                station("harbor", "Harbor", 30.0, 0.0),
                station("museum", "Museum", 30.0, 25.0),
                station("university", "University", 0.0, 30.0),
                station("market", "Market", -30.0, 20.0),
                station("airport", "Airport", -30.0, -25.0),
                station("stadium", "Stadium", 10.0, -30.0),
            ],
            lines: vec![
                line("red", "Red Line", &["central", "harbor", "museum", "university"]),
                line("blue", "Blue Line", &["central", "market", "airport", "stadium"]),
            ],
            trains: Vec::new(),
        }
    }
}

/// Background passenger growth
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrowthConfig {
    /// Mean passengers added per station per second
    pub base_rate: f64,
    /// Half-width of the uniform jitter applied to the rate
    pub variation: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self { base_rate: 2.0, variation: 1.0 }
    }
}

/// Station dwell time policy (passenger-proportional, ceiling-clamped)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DwellConfig {
    /// Minimum stop time in seconds
    pub minimum_stop_time: f64,
    /// Seconds added per full ten passengers moved
    pub time_per_ten_passengers: f64,
    /// Maximum stop time in seconds
    pub maximum_stop_time: f64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self { minimum_stop_time: 1.0, time_per_ten_passengers: 0.5, maximum_stop_time: 10.0 }
    }
}

/// Relative weight of one incident kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentProbability {
    /// Incident kind
    pub kind: IncidentKind,
    /// Relative weight
    pub weight: f64,
}

/// Incident scheduler parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IncidentConfig {
    /// Seconds between incident checks
    pub check_interval: f64,
    /// Probability that a check produces an incident
    pub trigger_probability: f64,
    /// Weighted table used to choose the incident kind
    pub probabilities: Vec<IncidentProbability>,
    /// Seconds before a broken station repairs itself
    pub station_breakdown_duration: f64,
    /// Seconds before a delayed line recovers
    pub line_delay_duration: f64,
    /// Seconds before a malfunctioning train resumes
    pub train_malfunction_duration: f64,
    /// Smallest overcrowding surge
    pub surge_min: u32,
    /// Upper bound of an overcrowding surge, exclusive unless equal to `surge_min`
    pub surge_max: u32,
}

impl Default for IncidentConfig {
    fn default() -> Self {
        Self {
            check_interval: 30.0,
            trigger_probability: 0.4,
            probabilities: vec![
                IncidentProbability { kind: IncidentKind::StationBreakdown, weight: 0.4 },
                IncidentProbability { kind: IncidentKind::LineDelay, weight: 0.3 },
                IncidentProbability { kind: IncidentKind::Overcrowding, weight: 0.2 },
                IncidentProbability { kind: IncidentKind::TrainMalfunction, weight: 0.1 },
            ],
            station_breakdown_duration: 60.0,
            line_delay_duration: 30.0,
            train_malfunction_duration: 18.0,
            surge_min: 150,
            surge_max: 300,
        }
    }
}

impl IncidentConfig {
    /// Auto-resolve delay for a kind, if that kind resolves itself
    pub fn duration_for(&self, kind: IncidentKind) -> Option<f64> {
        match kind {
            IncidentKind::StationBreakdown => Some(self.station_breakdown_duration),
            IncidentKind::LineDelay => Some(self.line_delay_duration),
            IncidentKind::TrainMalfunction => Some(self.train_malfunction_duration),
            _ => None,
        }
    }

    /// Sum of all weights in the table
    pub fn total_weight(&self) -> f64 {
        self.probabilities.iter().map(|p| p.weight).sum()
    }
}

/// Game-over thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Delayed or broken stations that end the run
    pub max_delay_count: u32,
    /// Passengers in the network (waiting plus aboard) that end the run
    pub max_total_passengers: u64,
    /// Simulated seconds after which the run ends
    pub game_duration: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self { max_delay_count: 5, max_total_passengers: 2000, game_duration: 600.0 }
    }
}

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "metro-network-simulator",
    version = "0.1.0",
    about = "Metro Network Simulator - Tick-driven transit network simulation",
    long_about = "Simulates a small transit network: stations accumulate passengers, trains run fixed loop routes between them, and random incidents (breakdowns, line delays, overcrowding, malfunctions) perturb the network until a game-over threshold is reached.

EXAMPLES:
    # Run the built-in sample network
    metro-network-simulator

    # Use a configuration file
    metro-network-simulator --config network.json

    # Reproducible run with a JSON report
    metro-network-simulator --seed 42 --report-format json

    # Write every notification as JSON lines
    metro-network-simulator --events-output events.jsonl

    # Generate configuration template
    metro-network-simulator --print-config > my-network.json

    # Validate configuration without running
    metro-network-simulator --config my-network.json --dry-run

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)

    Use --print-config to generate a template configuration file."
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Random seed for reproducible runs
    #[arg(long, help = "Random seed for reproducible runs")]
    pub seed: Option<u64>,

    /// Simulated seconds per tick
    #[arg(
        long,
        help = "Simulated seconds per tick",
        long_help = "Length of one simulation step in simulated seconds. Must be greater than 0. Default: 0.5"
    )]
    pub tick_interval: Option<f64>,

    /// Run duration in simulated seconds
    #[arg(long, help = "Run duration in simulated seconds (default: 600)")]
    pub duration: Option<f64>,

    /// Delay count that ends the run
    #[arg(long, help = "Delayed/broken station count that ends the run (default: 5)")]
    pub max_delays: Option<u32>,

    /// Passenger total that ends the run
    #[arg(long, help = "Total passengers that end the run (default: 2000)")]
    pub max_passengers: Option<u64>,

    /// Seconds between incident checks
    #[arg(long, help = "Seconds between incident checks (default: 30)")]
    pub incident_interval: Option<f64>,

    /// Probability that an incident check fires (0.0-1.0)
    #[arg(
        long,
        help = "Probability that an incident check fires (0.0-1.0)",
        long_help = "Probability that each incident check produces an incident. Range: 0.0-1.0. Default: 0.4"
    )]
    pub incident_probability: Option<f64>,

    /// Passenger capacity of generated trains
    #[arg(long, help = "Passenger capacity of generated trains (default: 200)")]
    pub train_capacity: Option<u32>,

    /// Base passenger growth per station per second
    #[arg(long, help = "Base passenger growth per station per second (default: 2.0)")]
    pub growth_rate: Option<f64>,

    /// Growth jitter half-width
    #[arg(long, help = "Growth jitter half-width (default: 1.0)")]
    pub growth_variation: Option<f64>,

    /// Stop after this many ticks even if the run has not ended
    #[arg(long, help = "Maximum number of ticks to run")]
    pub max_ticks: Option<u64>,

    /// Write notifications as JSON lines to this path
    #[arg(long, help = "Write notifications as JSON lines to this path")]
    pub events_output: Option<String>,

    /// Report format (text or json)
    #[arg(long, help = "End-of-run report format (text or json)")]
    pub report_format: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub dry_run: bool,

    /// Print the default configuration as JSON and exit
    #[arg(long, help = "Print the default configuration as JSON and exit")]
    pub print_config: bool,
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Network layout
    pub network: Option<NetworkConfig>,
    /// Passenger growth
    pub growth: Option<GrowthConfig>,
    /// Dwell policy
    pub dwell: Option<DwellConfig>,
    /// Incident scheduler
    pub incidents: Option<IncidentConfig>,
    /// Game-over thresholds
    pub thresholds: Option<ThresholdConfig>,
    /// Simulated seconds per tick
    pub tick_interval: Option<f64>,
    /// Passenger capacity of generated trains
    pub train_capacity: Option<u32>,
    /// Smallest random start delay
    pub start_delay_min: Option<f64>,
    /// Largest random start delay
    pub start_delay_max: Option<f64>,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Tick cap
    pub max_ticks: Option<u64>,
    /// Report format
    pub report_format: Option<String>,
    /// JSON lines notification output
    pub events_output: Option<String>,
}

/// Configuration for the metro network simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Network layout
    pub network: NetworkConfig,
    /// Passenger growth
    pub growth: GrowthConfig,
    /// Dwell policy
    pub dwell: DwellConfig,
    /// Incident scheduler
    pub incidents: IncidentConfig,
    /// Game-over thresholds
    pub thresholds: ThresholdConfig,
    /// Simulated seconds per tick
    pub tick_interval: f64,
    /// Passenger capacity of generated trains
    pub train_capacity: u32,
    /// Smallest random delay before a train's first departure
    pub start_delay_min: f64,
    /// Largest random delay before a train's first departure
    pub start_delay_max: f64,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Stop after this many ticks even if no threshold was reached
    pub max_ticks: Option<u64>,
    /// End-of-run report format
    pub report_format: String,
    /// JSON lines notification output
    pub events_output: Option<String>,
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),
}

/// Validation errors for simulation configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// Tick interval is not positive
    #[error("Tick interval must be greater than 0, got {0}")]
    InvalidTickInterval(f64),

    /// The network has no stations
    #[error("Network must contain at least one station")]
    NoStations,

    /// Train capacity is zero
    #[error("Train capacity must be greater than 0, got {0}")]
    InvalidTrainCapacity(u32),

    /// Percentage value is out of range
    #[error("Invalid percentage for {field}: {value} (must be between 0.0 and 1.0)")]
    InvalidPercentage {
        /// Name of the field with invalid percentage
        field: String,
        /// The invalid percentage value
        value: f64,
    },

    /// A value that must be positive is not
    #[error("{field} must be greater than 0, got {value}")]
    NonPositiveValue {
        /// Name of the field
        field: String,
        /// The invalid value
        value: f64,
    },

    /// A value that must not be negative is
    #[error("{field} must not be negative, got {value}")]
    NegativeValue {
        /// Name of the field
        field: String,
        /// The invalid value
        value: f64,
    },

    /// A reserved incident kind appears in the probability table
    #[error("Incident kind {0} is reserved and cannot be generated")]
    ReservedIncidentKind(IncidentKind),

    /// Incident weights do not add up to anything
    #[error("Incident probability weights must sum to more than 0, got {sum}")]
    InvalidWeightTotal {
        /// The actual sum of weights
        sum: f64,
    },

    /// Surge range is inverted
    #[error("Invalid surge range: min ({0}) must be <= max ({1})")]
    InvalidSurgeRange(u32, u32),

    /// Dwell ceiling is below the minimum
    #[error("Invalid stop time range: minimum ({0}) must be <= maximum ({1})")]
    InvalidDwellRange(f64, f64),

    /// Start delay range is inverted
    #[error("Invalid start delay range: min ({0}) must be <= max ({1})")]
    InvalidStartDelayRange(f64, f64),

    /// A game-over threshold is zero
    #[error("Threshold {0} must be greater than 0")]
    InvalidThreshold(String),

    /// Report format is not recognized
    #[error("{0}")]
    InvalidReportFormat(String),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::sample(),
            growth: GrowthConfig::default(),
            dwell: DwellConfig::default(),
            incidents: IncidentConfig::default(),
            thresholds: ThresholdConfig::default(),
            tick_interval: 0.5,
            train_capacity: 200,
            start_delay_min: 0.5,
            start_delay_max: 3.0,
            seed: None,
            max_ticks: None,
            report_format: "text".to_string(),
            events_output: None,
        }
    }
}

impl SimulationConfig {
    /// Create a new configuration from command line arguments and optional config file
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::from_cli_args(args)
    }

    /// Create configuration from parsed CLI arguments
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = &args.config {
            config = Self::from_file(config_path)?;
        }

        // CLI takes precedence over the file
        Self::apply_cli_overrides(&mut config, args);

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config_file: ConfigFile = serde_json::from_str(&content)?;
                Ok(Self::from_config_file(config_file))
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Create configuration from a config file, merging with defaults
    pub fn from_config_file(config_file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            network: config_file.network.unwrap_or(defaults.network),
            growth: config_file.growth.unwrap_or(defaults.growth),
            dwell: config_file.dwell.unwrap_or(defaults.dwell),
            incidents: config_file.incidents.unwrap_or(defaults.incidents),
            thresholds: config_file.thresholds.unwrap_or(defaults.thresholds),
            tick_interval: config_file.tick_interval.unwrap_or(defaults.tick_interval),
            train_capacity: config_file.train_capacity.unwrap_or(defaults.train_capacity),
            start_delay_min: config_file.start_delay_min.unwrap_or(defaults.start_delay_min),
            start_delay_max: config_file.start_delay_max.unwrap_or(defaults.start_delay_max),
            seed: config_file.seed.or(defaults.seed),
            max_ticks: config_file.max_ticks.or(defaults.max_ticks),
            report_format: config_file.report_format.unwrap_or(defaults.report_format),
            events_output: config_file.events_output.or(defaults.events_output),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) {
        if let Some(value) = args.seed {
            config.seed = Some(value);
        }
        if let Some(value) = args.tick_interval {
            config.tick_interval = value;
        }
        if let Some(value) = args.duration {
            config.thresholds.game_duration = value;
        }
        if let Some(value) = args.max_delays {
            config.thresholds.max_delay_count = value;
        }
        if let Some(value) = args.max_passengers {
            config.thresholds.max_total_passengers = value;
        }
        if let Some(value) = args.incident_interval {
            config.incidents.check_interval = value;
        }
        if let Some(value) = args.incident_probability {
            config.incidents.trigger_probability = value;
        }
        if let Some(value) = args.train_capacity {
            config.train_capacity = value;
        }
        if let Some(value) = args.growth_rate {
            config.growth.base_rate = value;
        }
        if let Some(value) = args.growth_variation {
            config.growth.variation = value;
        }
        if let Some(value) = args.max_ticks {
            config.max_ticks = Some(value);
        }
        if let Some(value) = args.events_output {
            config.events_output = Some(value);
        }
        if let Some(value) = args.report_format {
            config.report_format = value;
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the global configuration parameters
    ///
    /// Per-entity problems (a duplicate or zero-capacity station, a line naming an
    /// unknown station, a train on a missing line) are not rejected here; the
    /// network builder excludes those entities and reports them as configuration
    /// issues.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.tick_interval > 0.0) {
            return Err(ConfigValidationError::InvalidTickInterval(self.tick_interval));
        }

        if self.network.stations.is_empty() {
            return Err(ConfigValidationError::NoStations);
        }

        if self.train_capacity == 0 {
            return Err(ConfigValidationError::InvalidTrainCapacity(self.train_capacity));
        }

        // Growth
        self.validate_non_negative("growth.base_rate", self.growth.base_rate)?;
        self.validate_non_negative("growth.variation", self.growth.variation)?;

        // Dwell policy
        self.validate_positive("dwell.minimum_stop_time", self.dwell.minimum_stop_time)?;
        self.validate_non_negative(
            "dwell.time_per_ten_passengers",
            self.dwell.time_per_ten_passengers,
        )?;
        if self.dwell.maximum_stop_time < self.dwell.minimum_stop_time {
            return Err(ConfigValidationError::InvalidDwellRange(
                self.dwell.minimum_stop_time,
                self.dwell.maximum_stop_time,
            ));
        }

        // Incidents
        let incidents = &self.incidents;
        self.validate_positive("incidents.check_interval", incidents.check_interval)?;
        self.validate_percentage("incidents.trigger_probability", incidents.trigger_probability)?;
        for entry in &incidents.probabilities {
            if entry.kind.is_reserved() {
                return Err(ConfigValidationError::ReservedIncidentKind(entry.kind));
            }
            self.validate_non_negative(&format!("incidents.weight.{:?}", entry.kind), entry.weight)?;
        }
        let total = incidents.total_weight();
        if !(total > 0.0) {
            return Err(ConfigValidationError::InvalidWeightTotal { sum: total });
        }
        self.validate_positive(
            "incidents.station_breakdown_duration",
            incidents.station_breakdown_duration,
        )?;
        self.validate_positive("incidents.line_delay_duration", incidents.line_delay_duration)?;
        self.validate_positive(
            "incidents.train_malfunction_duration",
            incidents.train_malfunction_duration,
        )?;
        if incidents.surge_min > incidents.surge_max {
            return Err(ConfigValidationError::InvalidSurgeRange(
                incidents.surge_min,
                incidents.surge_max,
            ));
        }

        // Thresholds
        if self.thresholds.max_delay_count == 0 {
            return Err(ConfigValidationError::InvalidThreshold("max_delay_count".to_string()));
        }
        if self.thresholds.max_total_passengers == 0 {
            return Err(ConfigValidationError::InvalidThreshold(
                "max_total_passengers".to_string(),
            ));
        }
        self.validate_positive("thresholds.game_duration", self.thresholds.game_duration)?;

        // Start delay
        self.validate_non_negative("start_delay_min", self.start_delay_min)?;
        if self.start_delay_min > self.start_delay_max {
            return Err(ConfigValidationError::InvalidStartDelayRange(
                self.start_delay_min,
                self.start_delay_max,
            ));
        }

        self.get_report_format().map_err(ConfigValidationError::InvalidReportFormat)?;

        Ok(())
    }

    /// Helper method to validate percentage values
    fn validate_percentage(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigValidationError::InvalidPercentage {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    fn validate_positive(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if !(value > 0.0) {
            return Err(ConfigValidationError::NonPositiveValue {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    fn validate_non_negative(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if !(value >= 0.0) {
            return Err(ConfigValidationError::NegativeValue { field: field.to_string(), value });
        }
        Ok(())
    }

    /// Get the report format as an enum value
    pub fn get_report_format(&self) -> Result<ReportFormat, String> {
        self.report_format.parse()
    }

    /// Start delay range as a tuple
    pub fn start_delay_range(&self) -> (f64, f64) {
        (self.start_delay_min, self.start_delay_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn empty_args() -> CliArgs {
        CliArgs {
            config: None,
            seed: None,
            tick_interval: None,
            duration: None,
            max_delays: None,
            max_passengers: None,
            incident_interval: None,
            incident_probability: None,
            train_capacity: None,
            growth_rate: None,
            growth_variation: None,
            max_ticks: None,
            events_output: None,
            report_format: None,
            verbose: false,
            debug: false,
            dry_run: false,
            print_config: false,
        }
    }

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();

        assert_eq!(config.network.stations.len(), 7);
        assert_eq!(config.network.lines.len(), 2);
        assert_eq!(config.tick_interval, 0.5);
        assert_eq!(config.train_capacity, 200);
        assert_eq!(config.incidents.check_interval, 30.0);
        assert_eq!(config.incidents.trigger_probability, 0.4);
        assert_eq!(config.thresholds.max_delay_count, 5);
        assert_eq!(config.thresholds.max_total_passengers, 2000);
        assert_eq!(config.thresholds.game_duration, 600.0);
        assert_eq!(config.start_delay_range(), (0.5, 3.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_network_lines_reference_known_stations() {
        let network = NetworkConfig::sample();
        let ids: HashSet<_> = network.stations.iter().map(|s| s.id.clone()).collect();
        for line in &network.lines {
            assert!(!line.station_ids.is_empty());
            assert!(line.station_ids.iter().all(|id| ids.contains(id)));
            assert_eq!(line.default_train_count, 2);
            assert_eq!(line.train_speed, 5.0);
        }
    }

    #[test]
    fn test_default_incident_weights() {
        let incidents = IncidentConfig::default();
        assert!((incidents.total_weight() - 1.0).abs() < 1e-9);
        assert_eq!(incidents.duration_for(IncidentKind::StationBreakdown), Some(60.0));
        assert_eq!(incidents.duration_for(IncidentKind::LineDelay), Some(30.0));
        assert_eq!(incidents.duration_for(IncidentKind::TrainMalfunction), Some(18.0));
        assert_eq!(incidents.duration_for(IncidentKind::Overcrowding), None);
    }

    #[test]
    fn test_position_move_towards() {
        let start = Position::new(0.0, 0.0, 0.0);
        let target = Position::new(10.0, 0.0, 0.0);

        let step = start.move_towards(&target, 4.0);
        assert!((step.x - 4.0).abs() < 1e-9);
        assert!((step.distance_to(&target) - 6.0).abs() < 1e-9);

        // Never overshoots
        assert_eq!(step.move_towards(&target, 100.0), target);
    }

    #[test]
    fn test_config_file_loading() {
        use std::io::Write;
        use tempfile::Builder;

        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let config_json = r#"{
            "network": {
                "stations": [
                    { "id": "a", "name": "Alpha", "max_passengers": 300 },
                    { "id": "b", "name": "Bravo", "position": { "x": 10.0, "y": 0.0, "z": 0.0 } }
                ],
                "lines": [
                    { "id": "l1", "name": "Shuttle", "station_ids": ["a", "b"], "default_train_count": 1 }
                ]
            },
            "growth": { "base_rate": 0.0 },
            "thresholds": { "max_delay_count": 2 },
            "tick_interval": 0.25,
            "seed": 12345
        }"#;

        temp_file.write_all(config_json.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = SimulationConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.network.stations.len(), 2);
        assert_eq!(config.network.stations[0].max_passengers, 300);
        assert_eq!(config.network.stations[1].max_passengers, 500);
        assert_eq!(config.network.lines[0].default_train_count, 1);
        assert_eq!(config.network.lines[0].train_speed, 5.0);
        assert_eq!(config.growth.base_rate, 0.0);
        // Missing fields inside a section keep their defaults
        assert_eq!(config.growth.variation, 1.0);
        assert_eq!(config.thresholds.max_delay_count, 2);
        assert_eq!(config.thresholds.game_duration, 600.0);
        assert_eq!(config.tick_interval, 0.25);
        assert_eq!(config.seed, Some(12345));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_errors() {
        assert!(matches!(
            SimulationConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::FileNotFound(_))
        ));

        let temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            SimulationConfig::from_file(temp_file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs {
            seed: Some(54321),
            duration: Some(120.0),
            max_delays: Some(3),
            incident_probability: Some(0.9),
            growth_rate: Some(4.0),
            report_format: Some("json".to_string()),
            ..empty_args()
        };

        let config = SimulationConfig::from_cli_args(args).unwrap();

        assert_eq!(config.seed, Some(54321));
        assert_eq!(config.thresholds.game_duration, 120.0);
        assert_eq!(config.thresholds.max_delay_count, 3);
        assert_eq!(config.incidents.trigger_probability, 0.9);
        assert_eq!(config.growth.base_rate, 4.0);
        assert_eq!(config.get_report_format().unwrap(), ReportFormat::Json);
        // Default values should remain for non-overridden fields
        assert_eq!(config.thresholds.max_total_passengers, 2000);
        assert_eq!(config.incidents.check_interval, 30.0);
    }

    #[test]
    fn test_validation_rejects_bad_globals() {
        let mut config = SimulationConfig::default();
        config.tick_interval = 0.0;
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidTickInterval(_))));

        let mut config = SimulationConfig::default();
        config.network.stations.clear();
        assert!(matches!(config.validate(), Err(ConfigValidationError::NoStations)));

        // Station-level defects are left to the network builder
        let mut config = SimulationConfig::default();
        let duplicate = config.network.stations[0].clone();
        config.network.stations.push(duplicate);
        config.network.stations[2].max_passengers = 0;
        assert!(config.validate().is_ok());

        let mut config = SimulationConfig::default();
        config.incidents.trigger_probability = 1.5;
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidPercentage { .. })));

        let mut config = SimulationConfig::default();
        config.thresholds.max_delay_count = 0;
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidThreshold(_))));
    }

    #[test]
    fn test_validation_rejects_bad_incident_table() {
        let mut config = SimulationConfig::default();
        config
            .incidents
            .probabilities
            .push(IncidentProbability { kind: IncidentKind::SignalFailure, weight: 0.1 });
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::ReservedIncidentKind(IncidentKind::SignalFailure))
        ));

        let mut config = SimulationConfig::default();
        config.incidents.probabilities.clear();
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidWeightTotal { .. })));

        let mut config = SimulationConfig::default();
        config.incidents.surge_min = 400;
        config.incidents.surge_max = 100;
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidSurgeRange(400, 100))));

        let mut config = SimulationConfig::default();
        config.incidents.line_delay_duration = 0.0;
        assert!(matches!(config.validate(), Err(ConfigValidationError::NonPositiveValue { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        let mut config = SimulationConfig::default();
        config.dwell.maximum_stop_time = 0.5;
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidDwellRange(_, _))));

        let mut config = SimulationConfig::default();
        config.start_delay_min = 5.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidStartDelayRange(_, _))
        ));

        let mut config = SimulationConfig::default();
        config.growth.variation = -1.0;
        assert!(matches!(config.validate(), Err(ConfigValidationError::NegativeValue { .. })));

        let mut config = SimulationConfig::default();
        config.report_format = "xml".to_string();
        assert!(matches!(config.validate(), Err(ConfigValidationError::InvalidReportFormat(_))));
    }

    #[test]
    fn test_simulation_config_serialization() {
        let config = SimulationConfig::default();
        let json = config.print_json().unwrap();
        assert!(json.contains("\"stations\""));
        assert!(json.contains("StationBreakdown"));

        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.network, config.network);
        assert_eq!(back.incidents, config.incidents);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");

        let mut config = SimulationConfig::default();
        config.seed = Some(99);
        config.save_to_file(&path).unwrap();

        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded.seed, Some(99));
        assert_eq!(loaded.network, config.network);
    }
}

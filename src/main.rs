// Metro Network Simulator - Main Entry Point
//
// You can run it via Cargo:
//
// ```console
// $ cargo build --release
// $ ./target/release/metro-network-simulator
// ```
//
// Or with custom configuration:
//
// ```console
// $ ./target/release/metro-network-simulator --config network.json --seed 42 --verbose
// ```

use anyhow::{Context, Result};
use clap::Parser;
use metro_network_simulator::simulation::{LoggingConfig, LoggingGuard, Simulation};
use metro_network_simulator::types::config::CliArgs;
use metro_network_simulator::types::{ReportFormat, SimulationConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use tracing::{error, info, warn};

fn main() {
    // Parse CLI arguments first to check for special flags
    let args = CliArgs::parse();

    // Handle special CLI flags that don't require full initialization
    if args.print_config {
        match SimulationConfig::default().print_json() {
            Ok(json) => {
                println!("{}", json);
                return;
            }
            Err(e) => {
                eprintln!("Failed to serialize default configuration: {}", e);
                process::exit(1);
            }
        }
    }

    // Keep the guard alive until main returns so file logs flush
    let _guard: LoggingGuard =
        match LoggingConfig::from_verbosity(args.verbose, args.debug).init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Failed to initialize logging: {}", e);
                process::exit(1);
            }
        };

    info!("Starting Metro Network Simulator");

    if let Err(e) = run(args) {
        error!("Simulation failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    info!("Metro Network Simulator completed successfully");
}

fn run(args: CliArgs) -> Result<()> {
    let dry_run = args.dry_run;

    // Load configuration from CLI arguments and optional config file
    let config = SimulationConfig::from_cli_args(args).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    let report_format = config
        .get_report_format()
        .map_err(anyhow::Error::msg)
        .context("Invalid report format")?;

    info!("Configuration loaded and validated successfully");

    if dry_run {
        eprintln!("Configuration validation successful!");
        eprintln!("Dry run mode - simulation will not be executed.");
        print_configuration_summary(&config);
        return Ok(());
    }

    print_startup_banner(&config);

    let mut events_writer = match &config.events_output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create events output file '{}'", path))?;
            info!("Writing notifications to: {}", path);
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let max_ticks = config.max_ticks;
    let mut simulation = Simulation::new(config).context("Failed to initialize simulation")?;

    for issue in simulation.configuration_issues() {
        warn!("Excluded from network: {}", issue);
    }

    let reason = simulation
        .run_with(max_ticks, |sim| {
            let records = sim.drain_events();
            if let Some(writer) = events_writer.as_mut() {
                for record in records {
                    serde_json::to_writer(&mut *writer, &record)?;
                    writer.write_all(b"\n")?;
                }
            }
            Ok(())
        })
        .context("Simulation run failed")?;

    if let Some(mut writer) = events_writer {
        writer.flush().context("Failed to flush events output")?;
    }

    match reason {
        Some(reason) => info!(%reason, elapsed = simulation.elapsed(), "Game over"),
        None => info!(ticks = simulation.tick_count(), "Stopped at tick limit"),
    }

    print_report(&simulation, report_format)
}

/// Print startup banner and configuration summary
fn print_startup_banner(config: &SimulationConfig) {
    eprintln!("Metro Network Simulator");
    eprintln!("=======================");
    eprintln!("A tick-driven transit network simulation");
    eprintln!();

    print_configuration_summary(config);
}

/// Print configuration summary
fn print_configuration_summary(config: &SimulationConfig) {
    let network = &config.network;
    let line_trains: u32 = network.lines.iter().map(|l| l.default_train_count).sum();

    eprintln!("Configuration:");
    eprintln!("  Stations: {}", network.stations.len());
    eprintln!("  Lines: {}", network.lines.len());
    eprintln!("  Trains: ~{}", line_trains as usize + network.trains.len());
    eprintln!("  Tick Interval: {:.2}s", config.tick_interval);
    eprintln!(
        "  Passenger Growth: {:.1} ± {:.1} per second",
        config.growth.base_rate, config.growth.variation
    );
    eprintln!(
        "  Incidents: every {:.0}s with {:.0}% chance",
        config.incidents.check_interval,
        config.incidents.trigger_probability * 100.0
    );
    eprintln!(
        "  Game Over: {} delays, {} passengers, or {:.0}s",
        config.thresholds.max_delay_count,
        config.thresholds.max_total_passengers,
        config.thresholds.game_duration
    );
    eprintln!("  Report Format: {}", config.report_format);
    if let Some(seed) = config.seed {
        eprintln!("  Random Seed: {}", seed);
    }
    if let Some(max_ticks) = config.max_ticks {
        eprintln!("  Tick Limit: {}", max_ticks);
    }
    eprintln!();
}

/// Print the end-of-run report to stdout
fn print_report(simulation: &Simulation, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Text => {
            println!("{}", simulation.statistics().generate_summary_report());
            let metrics = simulation.metrics();
            println!("Final Network State:");
            println!("  • Waiting passengers: {}", metrics.waiting_passengers);
            println!("  • Passengers aboard: {}", metrics.in_transit_passengers);
            println!("  • Delayed stations: {}", metrics.delay_count);
        }
        ReportFormat::Json => {
            let report = serde_json::json!({
                "statistics": simulation.statistics(),
                "final_metrics": simulation.metrics(),
                "configuration_issues": simulation.configuration_issues(),
            });
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report")?;
            println!("{}", json);
        }
    }
    Ok(())
}

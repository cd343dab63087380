//! Fermata CLI
//!
//! Runs the ANM arrival-board coordinator in the foreground or issues
//! one-shot queries against the service.

#![allow(clippy::print_stdout)]

mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use application::UpdateCoordinator;
use chrono::Utc;
use clap::{Parser, Subcommand};
use domain::merge_predictions;
use domain::value_objects::{LineFilter, StopId};
use integration_anm::AnmClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;

/// Fermata CLI
#[derive(Parser)]
#[command(name = "fermata")]
#[command(author, version, about = "Fermata ANM arrival board CLI", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Settings file (TOML; extension optional)
    #[arg(short, long, default_value = "fermata", env = "FERMATA_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordinator and print every stop's board each cycle
    Watch,

    /// One-shot arrival query for a single stop
    Arrivals {
        /// Stop id (palina)
        stop_id: String,

        /// Comma-separated line allow-list (e.g., "151,R2")
        #[arg(short, long)]
        lines: Option<String>,
    },

    /// Search the provider's stop directory
    Stops {
        /// Name substring to search for; lists everything when omitted
        query: Option<String>,
    },

    /// Load the settings file and report validation problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load settings '{}'", cli.config))?;

    match cli.command {
        Commands::Watch => watch(&settings).await,
        Commands::Arrivals { stop_id, lines } => {
            arrivals(&settings, &stop_id, lines.as_deref()).await
        },
        Commands::Stops { query } => stops(&settings, query.as_deref()).await,
        Commands::Validate => validate(&settings),
    }
}

/// Run the coordinator until Ctrl-C, printing the boards each period
async fn watch(settings: &Settings) -> anyhow::Result<()> {
    settings.validate().map_err(anyhow::Error::msg)?;

    let client = AnmClient::new(&settings.anm)?;
    let coordinator = UpdateCoordinator::new(
        Arc::new(client),
        settings.stop_configs()?,
        &settings.coordinator,
    )?;

    coordinator.start();
    println!(
        "Watching {} stop(s) every {}s. Ctrl-C to stop.",
        coordinator.stops().len(),
        settings.coordinator.update_interval_secs
    );

    // Give the immediate first cycle a moment to land before printing
    for _ in 0..50 {
        if coordinator.last_outcome().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    print_boards(&coordinator);

    let period = Duration::from_secs(settings.coordinator.update_interval_secs);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            () = tokio::time::sleep(period) => print_boards(&coordinator),
        }
    }

    println!("\nStopping...");
    coordinator.stop().await;
    Ok(())
}

/// Print the current snapshot of every configured stop
fn print_boards(coordinator: &UpdateCoordinator) {
    for snapshot in coordinator.snapshots() {
        println!("\n{} ({})", snapshot.stop_name, snapshot.stop_id);

        if !snapshot.has_succeeded() {
            match &snapshot.error {
                Some(error) => println!("  unavailable: {error}"),
                None => println!("  waiting for first update"),
            }
            continue;
        }

        if let Some(error) = &snapshot.error {
            println!("  showing stale data: {error}");
        }

        if snapshot.arrivals.is_empty() {
            println!("  no matching arrivals right now");
        }
        for arrival in &snapshot.arrivals {
            println!("  {arrival}");
        }
    }

    if let Some(updated) = coordinator.last_updated() {
        println!("\nlast updated {}", updated.format("%H:%M:%S"));
    }
}

/// Fetch, merge, and print arrivals for one stop
async fn arrivals(settings: &Settings, stop_id: &str, lines: Option<&str>) -> anyhow::Result<()> {
    let stop_id = StopId::new(stop_id)?;
    let filter = LineFilter::parse_optional(lines)?;

    let client = AnmClient::new(&settings.anm)?;
    let predictions = client.fetch_predictions(&stop_id).await?;
    let merged = merge_predictions(predictions, filter.as_ref(), Utc::now());

    if merged.is_empty() {
        println!("No matching arrivals for stop {stop_id}");
    }
    for arrival in &merged {
        println!("{arrival}");
    }

    Ok(())
}

/// Search the stop directory by name
async fn stops(settings: &Settings, query: Option<&str>) -> anyhow::Result<()> {
    let client = AnmClient::new(&settings.anm)?;
    let mut directory = client.fetch_stop_directory().await?;

    if let Some(query) = query {
        directory.retain(|stop| stop.matches_name(query));
    }

    println!("{} stop(s)", directory.len());
    for stop in &directory {
        println!("{stop}  [{:.5}, {:.5}]", stop.latitude, stop.longitude);
    }

    Ok(())
}

/// Validate the settings file and report what is configured
fn validate(settings: &Settings) -> anyhow::Result<()> {
    settings.validate().map_err(anyhow::Error::msg)?;
    let stops = settings.stop_configs()?;

    println!(
        "Settings OK: {} stop(s), polling every {}s, request timeout {}s",
        stops.len(),
        settings.coordinator.update_interval_secs,
        settings.anm.timeout_secs
    );
    for stop in &stops {
        match &stop.line_filter {
            Some(filter) => println!("  {} ({}), lines {filter}", stop.stop_name, stop.stop_id),
            None => println!("  {} ({}), all lines", stop.stop_name, stop.stop_id),
        }
    }

    Ok(())
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_filters() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
        assert_eq!(log_filter_from_verbosity(1), "info");
        assert_eq!(log_filter_from_verbosity(2), "debug");
        assert_eq!(log_filter_from_verbosity(9), "trace");
    }
}

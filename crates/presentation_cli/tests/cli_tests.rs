//! Integration tests for the CLI
//!
//! These tests verify command parsing and structure without running actual
//! commands against the service.

#![allow(clippy::panic)] // Allow panic! in tests for clear failure messages

use std::ffi::OsString;

use clap::Parser;

// Mock CLI structure for testing (mirrors main.rs)
#[derive(Parser)]
#[command(name = "fermata")]
#[command(author, version, about = "Fermata ANM arrival board CLI", long_about = None)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, default_value = "fermata")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    Watch,
    Arrivals {
        stop_id: String,
        #[arg(short, long)]
        lines: Option<String>,
    },
    Stops {
        query: Option<String>,
    },
    Validate,
}

fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
    let os_args: Vec<OsString> = args.iter().map(OsString::from).collect();
    Cli::try_parse_from(os_args)
}

#[test]
fn cli_parses_watch_command() {
    let cli = parse_args(&["fermata", "watch"]).unwrap();
    assert!(matches!(cli.command, Commands::Watch));
    assert_eq!(cli.config, "fermata");
}

#[test]
fn cli_parses_watch_with_custom_config() {
    let cli = parse_args(&["fermata", "--config", "naples.toml", "watch"]).unwrap();
    assert_eq!(cli.config, "naples.toml");
}

#[test]
fn cli_parses_arrivals_command() {
    let cli = parse_args(&["fermata", "arrivals", "2103"]).unwrap();
    if let Commands::Arrivals { stop_id, lines } = cli.command {
        assert_eq!(stop_id, "2103");
        assert!(lines.is_none());
    } else {
        panic!("expected arrivals command");
    }
}

#[test]
fn cli_parses_arrivals_with_line_filter() {
    let cli = parse_args(&["fermata", "arrivals", "2103", "--lines", "151,R2"]).unwrap();
    if let Commands::Arrivals { lines, .. } = cli.command {
        assert_eq!(lines.as_deref(), Some("151,R2"));
    } else {
        panic!("expected arrivals command");
    }
}

#[test]
fn cli_parses_stops_search() {
    let cli = parse_args(&["fermata", "stops", "dante"]).unwrap();
    if let Commands::Stops { query } = cli.command {
        assert_eq!(query.as_deref(), Some("dante"));
    } else {
        panic!("expected stops command");
    }
}

#[test]
fn cli_parses_stops_without_query() {
    let cli = parse_args(&["fermata", "stops"]).unwrap();
    if let Commands::Stops { query } = cli.command {
        assert!(query.is_none());
    } else {
        panic!("expected stops command");
    }
}

#[test]
fn cli_parses_validate_command() {
    let cli = parse_args(&["fermata", "validate"]).unwrap();
    assert!(matches!(cli.command, Commands::Validate));
}

#[test]
fn cli_counts_verbosity_flags() {
    let cli = parse_args(&["fermata", "-vv", "watch"]).unwrap();
    assert_eq!(cli.verbose, 2);
}

#[test]
fn cli_rejects_missing_stop_id() {
    assert!(parse_args(&["fermata", "arrivals"]).is_err());
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(parse_args(&["fermata", "frobnicate"]).is_err());
}

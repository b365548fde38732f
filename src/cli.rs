//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::views::ViewKind;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// pulsedash - PhonePe Pulse dashboard reports from the command line
///
/// Aggregates transaction, user and insurance data into the dashboard
/// views and writes them as a Markdown or JSON report.
///
/// Examples:
///   pulsedash --data pulse.db
///   pulsedash --data pulse.db --view market,engagement --year 2023
///   pulsedash --data snapshot.json --state Karnataka --format json
///   pulsedash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Data source: a SQLite database, or a JSON snapshot ending in .json
    ///
    /// Can also be set via PULSEDASH_DATA or the [data] section of
    /// .pulsedash.toml.
    #[arg(short, long, value_name = "FILE", env = "PULSEDASH_DATA")]
    pub data: Option<PathBuf>,

    /// Views to build (comma-separated)
    ///
    /// Values: all, overview, transactions, devices, insurance, market,
    /// engagement
    #[arg(
        long,
        value_name = "VIEWS",
        value_delimiter = ',',
        default_value = "all",
        value_parser = parse_view
    )]
    pub view: Vec<ViewSelection>,

    /// Year to report on
    ///
    /// If not specified, each view uses the latest year in the data
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i64>,

    /// State for per-state breakdowns
    ///
    /// If not specified, the first state in the data is used
    #[arg(short, long, value_name = "STATE")]
    pub state: Option<String>,

    /// Rows shown in top/bottom rankings
    #[arg(short, long, value_name = "N")]
    pub top: Option<usize>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pulsedash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable the in-process query cache
    #[arg(long)]
    pub no_cache: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .pulsedash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// One entry of `--view`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewSelection {
    All,
    One(ViewKind),
}

fn parse_view(value: &str) -> Result<ViewSelection, String> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(ViewSelection::All);
    }
    ViewKind::from_str(value.trim(), true).map(ViewSelection::One)
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("Top must be at least 1".to_string());
        }

        if let Some(ref state) = self.state {
            if state.trim().is_empty() {
                return Err("State must not be empty".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Data source does not exist: {}", data.display()));
            }
            if !data.is_file() {
                return Err(format!("Data source is not a file: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings. `--quiet` wins
    /// over a config file that asks for verbose output.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The views to build, in dashboard order when `all` is present and in
    /// the given order otherwise. Repeats are dropped.
    pub fn selected_views(&self) -> Vec<ViewKind> {
        if self.view.is_empty() || self.view.contains(&ViewSelection::All) {
            return ViewKind::ALL.to_vec();
        }

        let mut kinds = Vec::new();
        for selection in &self.view {
            if let ViewSelection::One(kind) = selection {
                if !kinds.contains(kind) {
                    kinds.push(*kind);
                }
            }
        }
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: None,
            view: vec![ViewSelection::All],
            year: None,
            state: None,
            top: None,
            format: None,
            output: None,
            config: None,
            no_cache: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_view_list() {
        let args = Args::parse_from(["pulsedash", "--view", "market,Overview,market"]);
        assert_eq!(
            args.selected_views(),
            vec![ViewKind::Market, ViewKind::Overview]
        );

        let args = Args::parse_from(["pulsedash"]);
        assert_eq!(args.selected_views(), ViewKind::ALL.to_vec());

        let args = Args::parse_from(["pulsedash", "--view", "devices,all"]);
        assert_eq!(args.selected_views(), ViewKind::ALL.to_vec());
    }

    #[test]
    fn test_parse_view_rejects_unknown() {
        assert!(Args::try_parse_from(["pulsedash", "--view", "weather"]).is_err());
    }

    #[test]
    fn test_parse_filters() {
        let args = Args::parse_from([
            "pulsedash", "--year", "2023", "--state", "Goa", "--top", "5", "--format", "json",
        ]);
        assert_eq!(args.year, Some(2023));
        assert_eq!(args.state.as_deref(), Some("Goa"));
        assert_eq!(args.top, Some(5));
        assert_eq!(args.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_values() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.state = Some("  ".to_string());
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.data = Some(PathBuf::from("/definitely/not/here.db"));
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.top = Some(0);
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_existing_data_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut args = make_args();
        args.data = Some(file.path().to_path_buf());
        assert!(args.validate().is_ok());

        let dir = tempfile::tempdir().unwrap();
        args.data = Some(dir.path().to_path_buf());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_log_level_from_config() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}

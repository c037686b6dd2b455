//! Command-line argument definitions for the agriclime pipeline.
//!
//! Defines the CLI surface with the clap derive API: a `process` command
//! for the weather stage, an `analyze` command for the analysis stage, and
//! a `run` command for the full pipeline.

use crate::error::{AgriclimeError, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the agriclime weather-yield pipeline.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "agriclime",
    version,
    about = "Fuse GHCN-Daily weather observations with crop yields into analysis artifacts",
    long_about = "Processes GHCN-Daily station observations into growing-season weather \
                  features, joins them with state crop-yield records, and derives \
                  correlation tables, a feature-importance yield model, and a ranked \
                  weather-anomaly list for the dashboard frontend."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Process raw weather observations into feature artifacts
    Process(StageArgs),
    /// Analyze weather-yield relations from previously written artifacts
    Analyze(StageArgs),
    /// Run both stages back to back
    Run(StageArgs),
}

/// Arguments shared by every pipeline stage.
#[derive(Debug, Clone, Parser)]
pub struct StageArgs {
    /// Directory holding ghcnd-stations.txt and ghcn_by_year/
    #[arg(
        short = 'd',
        long = "data-dir",
        value_name = "PATH",
        default_value = "Data",
        help = "Directory holding raw weather inputs"
    )]
    pub data_dir: PathBuf,

    /// Directory where JSON artifacts are read from and written to
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "PATH",
        default_value = "public/data",
        help = "Directory for JSON artifacts"
    )]
    pub output_dir: PathBuf,

    /// First observation year to ingest
    #[arg(long = "start-year", value_name = "YEAR", default_value_t = crate::constants::DEFAULT_START_YEAR)]
    pub start_year: i32,

    /// Last observation year to ingest
    #[arg(long = "end-year", value_name = "YEAR", default_value_t = crate::constants::DEFAULT_END_YEAR)]
    pub end_year: i32,

    /// Seed for the model's bootstrap sampling and fallback split
    #[arg(long = "seed", value_name = "SEED", default_value_t = crate::constants::DEFAULT_RANDOM_SEED)]
    pub seed: u64,

    /// Logging verbosity
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
}

impl StageArgs {
    /// Validate argument consistency before running.
    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(AgriclimeError::configuration(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        Ok(())
    }

    /// Log level implied by the verbosity flags.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Progress bars are suppressed in quiet mode.
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> StageArgs {
        StageArgs {
            data_dir: PathBuf::from("Data"),
            output_dir: PathBuf::from("public/data"),
            start_year: 2010,
            end_year: 2024,
            seed: 42,
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_year_range_validation() {
        let mut args = default_args();
        assert!(args.validate().is_ok());

        args.start_year = 2025;
        args.end_year = 2010;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = default_args();
        assert_eq!(args.log_level(), "warn");

        args.verbose = 1;
        assert_eq!(args.log_level(), "info");
        args.verbose = 2;
        assert_eq!(args.log_level(), "debug");
        args.verbose = 5;
        assert_eq!(args.log_level(), "trace");

        args.quiet = true;
        assert_eq!(args.log_level(), "error");
        assert!(!args.show_progress());
    }

    #[test]
    fn test_parse_process_command() {
        let args = Args::parse_from([
            "agriclime",
            "process",
            "--data-dir",
            "/tmp/data",
            "--start-year",
            "2015",
        ]);
        match args.command {
            Some(Commands::Process(stage)) => {
                assert_eq!(stage.data_dir, PathBuf::from("/tmp/data"));
                assert_eq!(stage.start_year, 2015);
                assert_eq!(stage.end_year, crate::constants::DEFAULT_END_YEAR);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}

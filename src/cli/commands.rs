//! Command execution for the agriclime CLI.
//!
//! Wires parsed arguments into pipeline configuration, sets up logging,
//! and dispatches to the weather and analysis stages.

use crate::cli::args::{Args, Commands, StageArgs};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{AnalysisRunner, WeatherProcessor};
use tracing::{debug, info};

/// Execute the parsed command.
pub fn run(args: Args) -> Result<()> {
    let Some(command) = args.command else {
        // main() shows help before calling run(); treat as a no-op.
        return Ok(());
    };

    let stage_args = match &command {
        Commands::Process(stage) | Commands::Analyze(stage) | Commands::Run(stage) => {
            stage.clone()
        }
    };

    setup_logging(&stage_args);
    stage_args.validate()?;

    let config = config_from(&stage_args);
    debug!("Pipeline configuration: {:?}", config);

    match command {
        Commands::Process(_) => {
            WeatherProcessor::new(config).run(stage_args.show_progress())?;
        }
        Commands::Analyze(_) => {
            AnalysisRunner::new(config).run()?;
        }
        Commands::Run(_) => {
            info!("Running full pipeline");
            WeatherProcessor::new(config.clone()).run(stage_args.show_progress())?;
            AnalysisRunner::new(config).run()?;
        }
    }

    Ok(())
}

/// Build the pipeline configuration from stage arguments.
fn config_from(args: &StageArgs) -> PipelineConfig {
    PipelineConfig::new(&args.data_dir, &args.output_dir)
        .with_year_range(args.start_year, args.end_year)
        .with_seed(args.seed)
}

/// Initialize tracing with the CLI-selected verbosity.
fn setup_logging(args: &StageArgs) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("agriclime={}", args.log_level())));

    // Ignore the error if a subscriber is already installed (tests).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

use agriclime::cli::{args::Args, commands};
use clap::Parser;
use std::process;

fn main() {
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    }
}

/// Show help information when no subcommand is provided
fn show_help_and_commands() {
    println!("Agriclime - Weather and Crop Yield Analysis Pipeline");
    println!("====================================================");
    println!();
    println!("Fuse GHCN-Daily weather observations with state crop yields into");
    println!("growing-season metrics, correlation tables, and anomaly reports.");
    println!();
    println!("USAGE:");
    println!("    agriclime <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    process     Reduce raw observations to weather feature artifacts");
    println!("    analyze     Derive correlations, the yield model, and anomalies");
    println!("    run         Run both stages back to back");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("EXAMPLES:");
    println!("    # Process observations with the default layout (Data/ -> public/data/):");
    println!("    agriclime process");
    println!();
    println!("    # Analyze with custom directories:");
    println!("    agriclime analyze --data-dir /path/to/data --output-dir /path/to/out");
    println!();
    println!("For detailed help on any command, use:");
    println!("    agriclime <COMMAND> --help");
}

mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kiln", about = "Detector frame calibration pipeline")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show FITS file metadata
    Info(commands::info::InfoArgs),
    /// Calibrate a single raw frame
    Bake(commands::bake::BakeArgs),
    /// Synthesize a master dark from raw dark frames
    Makedark(commands::makedark::MakeDarkArgs),
    /// Synthesize a master flat from raw flat frames
    Makeflat(commands::makeflat::MakeFlatArgs),
    /// Calibrate a batch of science frames
    Makeobjects(commands::makeobjects::MakeObjectsArgs),
    /// Print or save a default instrument geometry file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Bake(args) => commands::bake::run(args),
        Commands::Makedark(args) => commands::makedark::run(args),
        Commands::Makeflat(args) => commands::makeflat::run(args),
        Commands::Makeobjects(args) => commands::makeobjects::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}

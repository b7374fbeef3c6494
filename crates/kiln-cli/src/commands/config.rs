use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kiln_core::instrument::Instrument;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the geometry to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save the default instrument geometry as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let instrument = Instrument::default();
    let toml_str = toml::to_string_pretty(&instrument)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write instrument file to {}", path.display()))?;
        println!("Default instrument geometry saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}

pub mod bake;
pub mod config;
pub mod info;
pub mod makedark;
pub mod makeflat;
pub mod makeobjects;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use kiln_core::instrument::Instrument;
use kiln_core::paths::Half;

/// Half-selector argument shared by the synthesis commands.
#[derive(Clone, Copy, ValueEnum)]
pub enum HalfArg {
    Firsthalf,
    Secondhalf,
}

impl From<HalfArg> for Half {
    fn from(arg: HalfArg) -> Self {
        match arg {
            HalfArg::Firsthalf => Half::First,
            HalfArg::Secondhalf => Half::Second,
        }
    }
}

/// Load instrument geometry from a TOML file, or fall back to the
/// built-in reference camera.
pub fn load_instrument(path: &Option<PathBuf>) -> Result<Instrument> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read instrument file {}", p.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("Failed to parse instrument file {}", p.display()))
        }
        None => Ok(Instrument::default()),
    }
}

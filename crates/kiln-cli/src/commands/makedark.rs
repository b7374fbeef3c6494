use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use kiln_core::context::CalibrationContext;
use kiln_core::io::quicklook::{save_quicklook, Scaling};
use kiln_core::masters::make_dark;

use super::{load_instrument, HalfArg};
use crate::summary::print_product_summary;

#[derive(Args)]
pub struct MakeDarkArgs {
    /// Glob pattern matching raw dark frames
    pub pattern: String,

    /// Exposure time of the darks to select (seconds)
    #[arg(short, long)]
    pub exposure_time: f64,

    /// Use only one half of the matched frames
    #[arg(long, value_enum)]
    pub half: Option<HalfArg>,

    /// Instrument geometry TOML file
    #[arg(long)]
    pub instrument: Option<PathBuf>,

    /// Directory to read/write master calibration products
    #[arg(long, default_value = ".")]
    pub products: PathBuf,

    /// Also write an 8-bit PNG preview here
    #[arg(long)]
    pub quicklook: Option<PathBuf>,
}

pub fn run(args: &MakeDarkArgs) -> Result<()> {
    let instrument = load_instrument(&args.instrument)?;
    let mut context = CalibrationContext::new(&args.products);

    make_dark(
        &args.pattern,
        args.exposure_time,
        &instrument,
        &mut context,
        args.half.map(Into::into),
    )?;

    if let (Some(path), Some(dark)) = (&args.quicklook, context.dark()) {
        save_quicklook(dark, path, Scaling::Percentile { low: 1.0, high: 99.0 })?;
    }

    print_product_summary(
        "Master dark",
        &args.pattern,
        &context.dark_path(args.exposure_time),
        args.quicklook.as_deref(),
    );
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use kiln_core::context::CalibrationContext;
use kiln_core::io::quicklook::{save_quicklook, Scaling};
use kiln_core::masters::make_flat;

use super::{load_instrument, HalfArg};
use crate::summary::print_product_summary;

#[derive(Args)]
pub struct MakeFlatArgs {
    /// Glob pattern matching raw flat frames
    pub pattern: String,

    /// Subtract the master dark for this exposure time (seconds)
    #[arg(long, value_name = "EXPTIME")]
    pub dark: Option<f64>,

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

pub fn run(args: &MakeFlatArgs) -> Result<()> {
    let instrument = load_instrument(&args.instrument)?;
    let mut context = CalibrationContext::new(&args.products);
    if let Some(exptime) = args.dark {
        context.load_dark(exptime)?;
    }

    make_flat(
        &args.pattern,
        &instrument,
        &mut context,
        args.half.map(Into::into),
    )?;

    if let (Some(path), Some(flat)) = (&args.quicklook, context.flat()) {
        save_quicklook(flat, path, Scaling::MinMax)?;
    }

    print_product_summary(
        "Master flat",
        &args.pattern,
        &context.flat_path(),
        args.quicklook.as_deref(),
    );
    Ok(())
}

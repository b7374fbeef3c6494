use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use kiln_core::bake::{bake, BakeConfig};
use kiln_core::context::CalibrationContext;
use kiln_core::io::fits::{self, ProductMeta};
use kiln_core::io::quicklook::{save_quicklook, Scaling};

use super::load_instrument;

#[derive(Args)]
pub struct BakeArgs {
    /// Input raw FITS file
    pub file: PathBuf,

    /// Crop to the valid detector region
    #[arg(long)]
    pub trim: bool,

    /// Subtract the master dark for this exposure time (seconds)
    #[arg(long, value_name = "EXPTIME")]
    pub dark: Option<f64>,

    /// Divide by the master flat
    #[arg(long)]
    pub flat: bool,

    /// Subtract the median sky level
    #[arg(long)]
    pub sky: bool,

    /// Rotate to the standard sky orientation
    #[arg(long)]
    pub rotate: bool,

    /// Crop a centered square of this side
    #[arg(long, value_name = "N")]
    pub window: Option<usize>,

    /// Instrument geometry TOML file
    #[arg(long)]
    pub instrument: Option<PathBuf>,

    /// Directory holding master calibration products
    #[arg(long, default_value = ".")]
    pub products: PathBuf,

    /// Output file path
    #[arg(short, long, default_value = "baked.fits")]
    pub output: PathBuf,

    /// Also write an 8-bit PNG preview here
    #[arg(long)]
    pub quicklook: Option<PathBuf>,
}

pub fn run(args: &BakeArgs) -> Result<()> {
    let instrument = load_instrument(&args.instrument)?;

    let mut context = CalibrationContext::new(&args.products);
    if let Some(exptime) = args.dark {
        context.load_dark(exptime)?;
    }
    if args.flat {
        context.load_flat()?;
    }

    let config = BakeConfig {
        trim: args.trim,
        dark: args.dark.is_some(),
        flat: args.flat,
        sky: args.sky,
        rotate: args.rotate,
        window: args.window,
    };
    let frame = bake(&args.file, &instrument, &context, &config)?;

    let meta = ProductMeta::from_header(&frame.header);
    fits::write_product(&args.output, &frame.data, &meta)?;
    println!("Calibrated frame saved to {}", args.output.display());

    if let Some(ref path) = args.quicklook {
        save_quicklook(&frame.data, path, Scaling::Percentile { low: 1.0, high: 99.0 })?;
        println!("Quicklook saved to {}", path.display());
    }

    Ok(())
}

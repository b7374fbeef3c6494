use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use kiln_core::context::CalibrationContext;
use kiln_core::io::fits::{self, ProductMeta};
use kiln_core::masters::make_objects;

use super::{load_instrument, HalfArg};

#[derive(Args)]
pub struct MakeObjectsArgs {
    /// Glob pattern matching raw science frames
    pub pattern: String,

    /// Subtract the master dark for this exposure time (seconds)
    #[arg(long, value_name = "EXPTIME")]
    pub dark: Option<f64>,

    /// Divide by the master flat
    #[arg(long)]
    pub flat: bool,

    /// Use only one half of the matched frames
    #[arg(long, value_enum)]
    pub half: Option<HalfArg>,

    /// Instrument geometry TOML file
    #[arg(long)]
    pub instrument: Option<PathBuf>,

    /// Directory to read/write master calibration products
    #[arg(long, default_value = ".")]
    pub products: PathBuf,

    /// Directory to write calibrated frames into
    #[arg(short, long, default_value = ".")]
    pub outdir: PathBuf,
}

pub fn run(args: &MakeObjectsArgs) -> Result<()> {
    let instrument = load_instrument(&args.instrument)?;
    let mut context = CalibrationContext::new(&args.products);
    if let Some(exptime) = args.dark {
        context.load_dark(exptime)?;
    }
    if args.flat {
        context.load_flat()?;
    }

    let frames = make_objects(
        &args.pattern,
        &instrument,
        &context,
        args.half.map(Into::into),
    )?;

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create {}", args.outdir.display()))?;
    let paths = kiln_core::paths::find_raw_frames(&args.pattern, None, args.half.map(Into::into))?;
    for (path, frame) in paths.iter().zip(&frames) {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame")
            .trim_end_matches(".fits");
        let out = args.outdir.join(format!("{stem}-cal.fits"));
        let meta = ProductMeta::from_header(&frame.header);
        fits::write_product(&out, &frame.data, &meta)?;
        println!("Calibrated frame saved to {}", out.display());
    }
    tracing::info!(frames = frames.len(), outdir = %args.outdir.display(), "batch finished");

    Ok(())
}

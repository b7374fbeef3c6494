use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use kiln_core::frame::CardValue;
use kiln_core::io::fits;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file (optionally gzip-compressed)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let frame = fits::read_frame(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", frame.width(), frame.height());
    if let Some(exptime) = frame.header.exposure_time() {
        println!("Exposure:    {} s", exptime);
    }

    if !frame.header.is_empty() {
        println!("Header:");
        for (key, value) in frame.header.iter() {
            let rendered = match value {
                CardValue::Str(s) => s.clone(),
                CardValue::Int(i) => i.to_string(),
                CardValue::Real(r) => r.to_string(),
                CardValue::Logical(b) => if *b { "T" } else { "F" }.to_string(),
            };
            println!("  {:<10} {}", key, rendered);
        }
    }

    Ok(())
}

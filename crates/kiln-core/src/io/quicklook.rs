use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use ndarray::Array2;

use crate::error::Result;

/// Intensity scaling for quicklook rendering.
#[derive(Clone, Copy, Debug)]
pub enum Scaling {
    /// Full range of the finite pixel values.
    MinMax,
    /// Percentile cut, e.g. 1.0/99.0 to suppress outlier pixels.
    Percentile { low: f32, high: f32 },
}

/// Render a frame to an 8-bit grayscale PNG for visual QA.
///
/// Invalid (NaN) pixels render black. No value is returned to the
/// pipeline; this exists purely for a human looking at products.
pub fn save_quicklook(data: &Array2<f32>, path: &Path, scaling: Scaling) -> Result<()> {
    let mut finite: Vec<f32> = data.iter().copied().filter(|v| v.is_finite()).collect();

    let (zmin, zmax) = if finite.is_empty() {
        (0.0, 1.0)
    } else {
        match scaling {
            Scaling::MinMax => {
                let min = finite.iter().copied().fold(f32::INFINITY, f32::min);
                let max = finite.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                (min, max)
            }
            Scaling::Percentile { low, high } => {
                finite.sort_unstable_by(|a, b| a.total_cmp(b));
                (percentile(&finite, low), percentile(&finite, high))
            }
        }
    };
    let span = if zmax > zmin { zmax - zmin } else { 1.0 };

    let (h, w) = data.dim();
    let mut img = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let v = data[[row, col]];
            let level = if v.is_finite() {
                (((v - zmin) / span).clamp(0.0, 1.0) * 255.0) as u8
            } else {
                0
            };
            img.put_pixel(col as u32, row as u32, Luma([level]));
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Value at the given percentile of an ascending-sorted sample.
fn percentile(sorted: &[f32], pct: f32) -> f32 {
    let idx = ((pct / 100.0) * (sorted.len() - 1) as f32).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

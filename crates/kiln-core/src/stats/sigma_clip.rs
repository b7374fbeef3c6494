use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::{MAD_TO_SIGMA, MAX_CLIP_ITERS, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{KilnError, Result};
use crate::stats::nanops::median_mut;

/// Sigma-clipped statistics of one sample.
///
/// The center estimate is the median and the spread estimate is the
/// MAD-derived standard deviation, computed over the values that survive
/// clipping. All NaN for an all-invalid sample.
#[derive(Clone, Copy, Debug)]
pub struct ClippedStats {
    pub mean: f32,
    pub median: f32,
    pub sigma: f32,
}

impl ClippedStats {
    fn invalid() -> Self {
        Self {
            mean: f32::NAN,
            median: f32::NAN,
            sigma: f32::NAN,
        }
    }
}

/// Clip one sample in place.
///
/// Iterates median/MAD rejection until no value is discarded or
/// `MAX_CLIP_ITERS` is reached, then reports statistics of the survivors.
/// NaN entries are dropped up front; `scratch` is reused between calls.
fn clip_sample(values: &mut Vec<f32>, scratch: &mut Vec<f32>, sigma: f32) -> ClippedStats {
    values.retain(|v| !v.is_nan());
    if values.is_empty() {
        return ClippedStats::invalid();
    }

    for _ in 0..MAX_CLIP_ITERS {
        let center = {
            scratch.clear();
            scratch.extend_from_slice(values);
            median_mut(scratch)
        };
        scratch.clear();
        scratch.extend(values.iter().map(|v| (v - center).abs()));
        let spread = median_mut(scratch) * MAD_TO_SIGMA;

        // A zero spread still rejects anything off-center, so a lone
        // discrepant value among identical ones is clipped.
        let limit = sigma * spread;
        let before = values.len();
        values.retain(|v| (v - center).abs() <= limit);
        if values.len() == before || values.is_empty() {
            break;
        }
    }

    if values.is_empty() {
        return ClippedStats::invalid();
    }

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    scratch.clear();
    scratch.extend_from_slice(values);
    let median = median_mut(scratch);
    scratch.clear();
    scratch.extend(values.iter().map(|v| (v - median).abs()));
    let sigma = median_mut(scratch) * MAD_TO_SIGMA;

    ClippedStats { mean, median, sigma }
}

/// Sigma-clipped statistics over every pixel of one array.
pub fn clipped_stats(data: ArrayView2<'_, f32>, sigma: f32) -> ClippedStats {
    let mut values: Vec<f32> = data.iter().copied().collect();
    let mut scratch = Vec::with_capacity(values.len());
    clip_sample(&mut values, &mut scratch, sigma)
}

/// Sigma-clipped mean of one array.
pub fn clipped_mean(data: ArrayView2<'_, f32>, sigma: f32) -> f32 {
    clipped_stats(data, sigma).mean
}

/// Sigma-clipped standard deviation of one array.
pub fn clipped_sigma(data: ArrayView2<'_, f32>, sigma: f32) -> f32 {
    clipped_stats(data, sigma).sigma
}

/// Pixel-wise sigma-clipped mean and sigma across a stack of frames.
///
/// Combines N same-shape frames along the stack axis. The computation runs
/// one image row at a time so peak transient memory stays proportional to
/// N times the row width, never the full per-pixel clip state of the whole
/// stack. Rows are processed in parallel for large images.
pub fn clipped_mean_and_sigma_stack(
    stack: &[Array2<f32>],
    sigma: f32,
) -> Result<(Array2<f32>, Array2<f32>)> {
    let first = stack.first().ok_or(KilnError::EmptyStack)?;
    let (h, w) = first.dim();
    for frame in &stack[1..] {
        if frame.dim() != (h, w) {
            return Err(KilnError::ShapeMismatch {
                expected: (h, w),
                actual: frame.dim(),
            });
        }
    }

    let clip_row = |row: usize| -> (Vec<f32>, Vec<f32>) {
        let mut mean_row = vec![f32::NAN; w];
        let mut sigma_row = vec![f32::NAN; w];
        let mut values = Vec::with_capacity(stack.len());
        let mut scratch = Vec::with_capacity(stack.len());
        for col in 0..w {
            values.clear();
            values.extend(stack.iter().map(|frame| frame[[row, col]]));
            let stats = clip_sample(&mut values, &mut scratch, sigma);
            mean_row[col] = stats.mean;
            sigma_row[col] = stats.sigma;
        }
        (mean_row, sigma_row)
    };

    let rows: Vec<(Vec<f32>, Vec<f32>)> = if h * w >= PARALLEL_PIXEL_THRESHOLD && stack.len() > 1 {
        (0..h).into_par_iter().map(clip_row).collect()
    } else {
        (0..h).map(clip_row).collect()
    };

    let mut mean = Array2::<f32>::zeros((h, w));
    let mut spread = Array2::<f32>::zeros((h, w));
    for (row, (mean_row, sigma_row)) in rows.into_iter().enumerate() {
        for col in 0..w {
            mean[[row, col]] = mean_row[col];
            spread[[row, col]] = sigma_row[col];
        }
    }

    Ok((mean, spread))
}

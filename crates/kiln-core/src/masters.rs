use ndarray::{s, Array2};
use tracing::{info, warn};

use crate::bake::{bake, BakeConfig};
use crate::consts::{STACK_CLIP_SIGMA, SUMMARY_CLIP_SIGMA};
use crate::context::CalibrationContext;
use crate::error::{KilnError, Result};
use crate::frame::Frame;
use crate::instrument::Instrument;
use crate::mask::{center_masked_fraction, flat_quality_mask, masked_fraction};
use crate::paths::{find_raw_frames, Half};
use crate::stats::{clipped_mean, clipped_mean_and_sigma_stack, clipped_stats, nan_median};

/// Synthesize a master dark from raw frames matching `pattern` at one
/// exposure time, install it in the context, and persist it.
///
/// Input frames are baked with trimming only, then combined pixel-wise
/// with sigma rejection. An empty selection is an error and nothing is
/// written.
pub fn make_dark(
    pattern: &str,
    exposure_time: f64,
    instrument: &Instrument,
    context: &mut CalibrationContext,
    half: Option<Half>,
) -> Result<()> {
    info!(pattern, exposure_time, "making master dark");

    let paths = find_raw_frames(pattern, Some(exposure_time), half)?;
    if paths.is_empty() {
        return Err(KilnError::EmptyInputSet {
            pattern: pattern.to_string(),
        });
    }

    let config = BakeConfig {
        trim: true,
        ..BakeConfig::default()
    };
    let mut stack = Vec::with_capacity(paths.len());
    for path in &paths {
        let frame = bake(path, instrument, context, &config)?;
        stack.push(frame.data);
    }

    info!(frames = stack.len(), "averaging darks with rejection");
    let (dark, dark_sigma) = clipped_mean_and_sigma_stack(&stack, STACK_CLIP_SIGMA)?;

    let stats = clipped_stats(dark.view(), SUMMARY_CLIP_SIGMA);
    info!(
        mean = stats.mean,
        sigma = stats.sigma,
        "master dark level (DN)"
    );
    let noise = clipped_mean(dark_sigma.view(), SUMMARY_CLIP_SIGMA) / (stack.len() as f32).sqrt();
    info!(noise, "estimated noise in master dark (DN)");

    context.store_dark(dark, exposure_time)?;
    info!("master dark finished");
    Ok(())
}

/// Synthesize a master flat from raw frames matching `pattern`, install
/// it in the context, and persist it.
///
/// Two passes: the first bakes (trim + dark), rejects saturated or
/// all-invalid exposures, normalizes the four pixel-parity sub-grids,
/// and combines into an unmasked flat from which the quality mask is
/// derived; the second applies the mask to every frame and recombines.
pub fn make_flat(
    pattern: &str,
    instrument: &Instrument,
    context: &mut CalibrationContext,
    half: Option<Half>,
) -> Result<()> {
    info!(pattern, "making master flat");

    let paths = find_raw_frames(pattern, None, half)?;
    if paths.is_empty() {
        return Err(KilnError::EmptyInputSet {
            pattern: pattern.to_string(),
        });
    }

    info!("making flat without mask");
    let config = BakeConfig {
        trim: true,
        dark: true,
        ..BakeConfig::default()
    };
    let mut stack: Vec<Array2<f32>> = Vec::new();
    for path in &paths {
        let frame = bake(path, instrument, context, &config)?;
        let mut data = frame.data;

        let (h, w) = data.dim();
        let center = data.slice(s![h / 4..h * 3 / 4, w / 4..w * 3 / 4]);
        if center.iter().all(|v| v.is_nan()) {
            warn!(path = %path.display(), "rejected: no valid data in center");
            continue;
        }
        let median = nan_median(center);
        if median > instrument.flat_max {
            warn!(
                path = %path.display(),
                median,
                flat_max = instrument.flat_max,
                "rejected: center median too high"
            );
            continue;
        }
        info!(path = %path.display(), median, "accepted flat frame");

        let [m00, m01, m10, m11] = normalize_quadrants(&mut data);
        let mean_median = 0.25 * (m00 + m01 + m10 + m11);
        let q = (m00 - m11) / mean_median;
        let u = (m01 - m10) / mean_median;
        info!(m00, m01, m10, m11, "normalized sub-grids by their medians");
        info!(q, u, "apparent polarization in flat");

        stack.push(data);
    }

    info!(frames = stack.len(), "averaging flats with rejection");
    let (flat, _) = clipped_mean_and_sigma_stack(&stack, STACK_CLIP_SIGMA)?;

    info!("making mask");
    let mask = flat_quality_mask(&flat);
    info!(
        fraction = masked_fraction(&mask),
        "fraction of masked pixels"
    );
    info!(
        fraction = center_masked_fraction(&mask),
        "fraction of masked pixels in center"
    );

    info!("making flat with mask");
    for data in &mut stack {
        for ((row, col), v) in data.indexed_iter_mut() {
            if mask[[row, col]] == 0.0 {
                *v = f32::NAN;
            }
        }
    }

    info!(frames = stack.len(), "averaging masked flats with rejection");
    let (flat, flat_sigma) = clipped_mean_and_sigma_stack(&stack, STACK_CLIP_SIGMA)?;

    let stats = clipped_stats(flat.view(), SUMMARY_CLIP_SIGMA);
    info!(mean = stats.mean, sigma = stats.sigma, "master flat level");
    let noise = clipped_mean(flat_sigma.view(), SUMMARY_CLIP_SIGMA) / (stack.len() as f32).sqrt();
    info!(noise, "estimated noise in master flat");

    context.store_flat(flat)?;
    info!("master flat finished");
    Ok(())
}

/// Calibrate science frames: bake each with trim + dark + flat.
///
/// No aggregation and no persistence; the calibrated frames are handed
/// to downstream analysis.
pub fn make_objects(
    pattern: &str,
    instrument: &Instrument,
    context: &CalibrationContext,
    half: Option<Half>,
) -> Result<Vec<Frame>> {
    info!(pattern, "calibrating object frames");

    let paths = find_raw_frames(pattern, None, half)?;
    if paths.is_empty() {
        return Err(KilnError::EmptyInputSet {
            pattern: pattern.to_string(),
        });
    }

    let config = BakeConfig {
        trim: true,
        dark: true,
        flat: true,
        ..BakeConfig::default()
    };
    let mut frames = Vec::with_capacity(paths.len());
    for path in &paths {
        frames.push(bake(path, instrument, context, &config)?);
    }

    info!(frames = frames.len(), "object frames calibrated");
    Ok(frames)
}

/// Divide each pixel-parity sub-grid by the median of its central
/// sub-region, in place. Returns the four medians in (even/even,
/// even/odd, odd/even, odd/odd) order.
fn normalize_quadrants(data: &mut Array2<f32>) -> [f32; 4] {
    let (h, w) = data.dim();
    // Central sub-region bounds within each half-resolution sub-grid.
    let y0 = (h as f64 / 2.0 * 0.25) as usize;
    let y1 = (h as f64 / 2.0 * 0.75) as usize;
    let x0 = (w as f64 / 2.0 * 0.25) as usize;
    let x1 = (w as f64 / 2.0 * 0.75) as usize;

    let parities: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];
    let mut medians = [0.0f32; 4];
    for (i, (ry, rx)) in parities.into_iter().enumerate() {
        let sub = data.slice(s![ry..;2, rx..;2]);
        medians[i] = nan_median(sub.slice(s![y0..y1, x0..x1]));
    }
    for (i, (ry, rx)) in parities.into_iter().enumerate() {
        let mut sub = data.slice_mut(s![ry..;2, rx..;2]);
        sub /= medians[i];
    }
    medians
}

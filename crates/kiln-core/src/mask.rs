use ndarray::{s, Array2};
use tracing::debug;

use crate::consts::{
    FLAT_GLOBAL_LOW_LIMIT, FLAT_LOCAL_RATIO_HIGH, FLAT_LOCAL_RATIO_LOW, FLAT_MEDIAN_FILTER_SIZE,
    MASK_GROW_FILTER_SIZE, MASK_GROW_LIMIT,
};
use crate::stats::{median_filter, nan_mean, uniform_filter};

/// Build the quality mask for a combined flat.
///
/// The mask is 1.0 for usable pixels and 0.0 for excluded ones. Stages
/// only ever clear pixels, so the set of valid pixels shrinks
/// monotonically: NaN/Inf, globally low (< 0.80), locally discrepant
/// against a median-filtered reference, then neighbor growth (a pixel
/// with more than two masked pixels in its 3x3 neighborhood, itself
/// included, is also masked).
pub fn flat_quality_mask(flat: &Array2<f32>) -> Array2<f32> {
    let mut mask = Array2::<f32>::from_elem(flat.dim(), 1.0);

    debug!("masking nan and inf values");
    for ((row, col), m) in mask.indexed_iter_mut() {
        if !flat[[row, col]].is_finite() {
            *m = 0.0;
        }
    }

    debug!("masking globally low pixels");
    for ((row, col), m) in mask.indexed_iter_mut() {
        if flat[[row, col]] < FLAT_GLOBAL_LOW_LIMIT {
            *m = 0.0;
        }
    }

    debug!("masking locally high or low pixels");
    let low = median_filter(flat, FLAT_MEDIAN_FILTER_SIZE);
    for ((row, col), m) in mask.indexed_iter_mut() {
        let ratio = flat[[row, col]] / low[[row, col]];
        if ratio < FLAT_LOCAL_RATIO_LOW || ratio > FLAT_LOCAL_RATIO_HIGH {
            *m = 0.0;
        }
    }

    debug!("masking pixels with at least two masked neighbors");
    let grow = uniform_filter(&mask, MASK_GROW_FILTER_SIZE);
    for ((row, col), m) in mask.indexed_iter_mut() {
        if grow[[row, col]] <= MASK_GROW_LIMIT {
            *m = 0.0;
        }
    }

    mask
}

/// Fraction of masked pixels over the whole mask.
pub fn masked_fraction(mask: &Array2<f32>) -> f32 {
    1.0 - nan_mean(mask.view())
}

/// Fraction of masked pixels within the central half-region.
pub fn center_masked_fraction(mask: &Array2<f32>) -> f32 {
    let (h, w) = mask.dim();
    let center = mask.slice(s![h / 4..h * 3 / 4, w / 4..w * 3 / 4]);
    1.0 - nan_mean(center)
}

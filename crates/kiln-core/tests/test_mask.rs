use approx::assert_abs_diff_eq;
use ndarray::Array2;

use kiln_core::mask::{center_masked_fraction, flat_quality_mask, masked_fraction};

fn good_flat(h: usize, w: usize) -> Array2<f32> {
    Array2::from_elem((h, w), 1.0)
}

// ---------------------------------------------------------------------------
// Individual masking stages
// ---------------------------------------------------------------------------

#[test]
fn test_clean_flat_unmasked() {
    let mask = flat_quality_mask(&good_flat(10, 10));
    assert!(mask.iter().all(|&m| m == 1.0));
    assert_abs_diff_eq!(masked_fraction(&mask), 0.0, epsilon = 1e-6);
}

#[test]
fn test_nan_masked() {
    let mut flat = good_flat(10, 10);
    flat[[4, 4]] = f32::NAN;
    let mask = flat_quality_mask(&flat);
    assert_eq!(mask[[4, 4]], 0.0);
    assert_eq!(mask[[0, 0]], 1.0);
}

#[test]
fn test_inf_masked() {
    let mut flat = good_flat(10, 10);
    flat[[3, 7]] = f32::INFINITY;
    let mask = flat_quality_mask(&flat);
    assert_eq!(mask[[3, 7]], 0.0);
}

#[test]
fn test_globally_low_masked() {
    let mut flat = good_flat(10, 10);
    flat[[5, 5]] = 0.5;
    let mask = flat_quality_mask(&flat);
    assert_eq!(mask[[5, 5]], 0.0);
}

#[test]
fn test_locally_high_masked() {
    // 1.09 stays inside the local ratio band, 1.2 falls outside it.
    let mut flat = good_flat(12, 12);
    flat[[6, 6]] = 1.2;
    flat[[2, 2]] = 1.09;
    let mask = flat_quality_mask(&flat);
    assert_eq!(mask[[6, 6]], 0.0);
    assert_eq!(mask[[2, 2]], 1.0);
}

#[test]
fn test_grow_two_adjacent_bad() {
    // Two horizontally adjacent bad pixels: pixels whose 3x3 window
    // contains both (uniform average 7/9) are grown into the mask;
    // pixels seeing only one (8/9) are not.
    let mut flat = good_flat(12, 12);
    flat[[5, 5]] = f32::NAN;
    flat[[5, 6]] = f32::NAN;
    let mask = flat_quality_mask(&flat);
    // Between/above the pair: sees both bad pixels.
    assert_eq!(mask[[4, 5]], 0.0);
    assert_eq!(mask[[4, 6]], 0.0);
    assert_eq!(mask[[6, 5]], 0.0);
    // Sees only one bad pixel.
    assert_eq!(mask[[4, 4]], 1.0);
    assert_eq!(mask[[6, 7]], 1.0);
    // Far away, untouched.
    assert_eq!(mask[[0, 0]], 1.0);
}

#[test]
fn test_isolated_bad_pixel_not_grown() {
    let mut flat = good_flat(12, 12);
    flat[[5, 5]] = f32::NAN;
    let mask = flat_quality_mask(&flat);
    assert_eq!(mask[[5, 5]], 0.0);
    for (row, col) in [(4, 4), (4, 5), (4, 6), (5, 4), (5, 6), (6, 4), (6, 5), (6, 6)] {
        assert_eq!(mask[[row, col]], 1.0, "neighbor ({row},{col}) wrongly grown");
    }
}

// ---------------------------------------------------------------------------
// Monotonicity
// ---------------------------------------------------------------------------

#[test]
fn test_mask_monotonic_in_defects() {
    // Adding more bad pixels can only shrink the valid set.
    let mut flat_a = good_flat(16, 16);
    flat_a[[3, 3]] = f32::NAN;
    flat_a[[8, 8]] = 0.2;

    let mut flat_b = flat_a.clone();
    flat_b[[3, 4]] = f32::NAN;
    flat_b[[12, 5]] = f32::INFINITY;

    let mask_a = flat_quality_mask(&flat_a);
    let mask_b = flat_quality_mask(&flat_b);
    for (a, b) in mask_a.iter().zip(mask_b.iter()) {
        assert!(b <= a, "a pixel became valid after adding defects");
    }
}

// ---------------------------------------------------------------------------
// Fractions
// ---------------------------------------------------------------------------

#[test]
fn test_masked_fractions() {
    let mut mask = Array2::from_elem((8, 8), 1.0f32);
    // Mask the whole central half-region (rows/cols 2..6 = 16 pixels).
    for row in 2..6 {
        for col in 2..6 {
            mask[[row, col]] = 0.0;
        }
    }
    assert_abs_diff_eq!(masked_fraction(&mask), 16.0 / 64.0, epsilon = 1e-6);
    assert_abs_diff_eq!(center_masked_fraction(&mask), 1.0, epsilon = 1e-6);
}

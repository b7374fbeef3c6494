mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use kiln_core::bake::{bake, center_window, invalidate_saturated, BakeConfig};
use kiln_core::context::CalibrationContext;
use kiln_core::error::KilnError;
use kiln_core::instrument::{Instrument, PixelRange, Rotation};
use kiln_core::stats::nan_median;

fn nan_mask(data: &Array2<f32>) -> Vec<bool> {
    data.iter().map(|v| v.is_nan()).collect()
}

// ---------------------------------------------------------------------------
// Saturated-pixel invalidation
// ---------------------------------------------------------------------------

#[test]
fn test_invalidation() {
    let mut data = Array2::from_elem((3, 3), 100.0f32);
    data[[1, 1]] = 4095.0;
    invalidate_saturated(&mut data, 4095.0);
    assert!(data[[1, 1]].is_nan());
    assert_eq!(data[[0, 0]], 100.0);
}

#[test]
fn test_invalidation_idempotent() {
    let mut data = Array2::from_elem((4, 4), 50.0f32);
    data[[0, 3]] = 4095.0;
    data[[2, 1]] = 4095.0;

    invalidate_saturated(&mut data, 4095.0);
    let once = nan_mask(&data);
    invalidate_saturated(&mut data, 4095.0);
    let twice = nan_mask(&data);
    assert_eq!(once, twice);
}

// ---------------------------------------------------------------------------
// Center windowing
// ---------------------------------------------------------------------------

#[test]
fn test_window_symmetry() {
    // (H, W) = (7, 10), n = 4: ylo = floor(3/2) = 1, xlo = floor(6/2) = 3.
    let mut data = Array2::<f32>::zeros((7, 10));
    for ((row, col), v) in data.indexed_iter_mut() {
        *v = row as f32 * 100.0 + col as f32;
    }
    let out = center_window(&data, 4).unwrap();
    assert_eq!(out.dim(), (4, 4));
    assert_eq!(out[[0, 0]], 103.0);
    assert_eq!(out[[3, 3]], 406.0);
}

#[test]
fn test_window_full_frame() {
    let data = Array2::from_elem((5, 5), 1.0f32);
    let out = center_window(&data, 5).unwrap();
    assert_eq!(out.dim(), (5, 5));
}

#[test]
fn test_window_too_large() {
    let data = Array2::from_elem((4, 8), 1.0f32);
    match center_window(&data, 5) {
        Err(KilnError::WindowTooLarge {
            nwindow,
            height,
            width,
        }) => {
            assert_eq!((nwindow, height, width), (5, 4, 8));
        }
        other => panic!("expected WindowTooLarge, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// The full bake sequence
// ---------------------------------------------------------------------------

#[test]
fn test_bake_plain_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 6, 4, 100.0, 5.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let frame = bake(&path, &instrument, &context, &BakeConfig::default()).unwrap();

    assert_eq!(frame.data.dim(), (4, 6));
    assert_eq!(frame.data[[0, 0]], 100.0);
    assert_eq!(frame.header.exposure_time(), Some(5.0));
}

#[test]
fn test_bake_invalidates_saturated() {
    let dir = tempfile::tempdir().unwrap();
    let mut pixels = vec![100.0f32; 16];
    pixels[5] = 4095.0;
    let path = common::write_file(
        dir.path(),
        "raw.fits",
        &common::build_fits_f32(4, 4, Some(1.0), &pixels),
    );

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let frame = bake(&path, &instrument, &context, &BakeConfig::default()).unwrap();
    assert!(frame.data[[1, 1]].is_nan());
    assert_eq!(frame.data[[0, 0]], 100.0);
}

#[test]
fn test_bake_trim_noop_without_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 8, 6, 10.0, 1.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        trim: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    assert_eq!(frame.data.dim(), (6, 8));
    assert_eq!(frame.data[[5, 7]], 10.0);
}

#[test]
fn test_bake_trim_crops() {
    let dir = tempfile::tempdir().unwrap();
    let mut pixels = vec![0.0f32; 8 * 6];
    // Row-major 8 wide: mark the pixel at row 1, col 2.
    pixels[8 + 2] = 77.0;
    let path = common::write_file(
        dir.path(),
        "raw.fits",
        &common::build_fits_f32(8, 6, Some(1.0), &pixels),
    );

    let mut instrument = Instrument::untrimmed(4095.0, 3000.0);
    instrument.trim_rows = Some(PixelRange { start: 1, end: 5 });
    instrument.trim_cols = Some(PixelRange { start: 2, end: 7 });
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        trim: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    assert_eq!(frame.data.dim(), (4, 5));
    assert_eq!(frame.data[[0, 0]], 77.0);
}

#[test]
fn test_bake_dark_subtraction() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 4, 4, 300.0, 5.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let mut context = CalibrationContext::new(dir.path());
    context
        .store_dark(Array2::from_elem((4, 4), 120.0), 5.0)
        .unwrap();

    let config = BakeConfig {
        dark: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    assert_abs_diff_eq!(frame.data[[2, 2]], 180.0, epsilon = 1e-4);
}

#[test]
fn test_bake_dark_noop_without_master() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 4, 4, 300.0, 5.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        dark: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    assert_eq!(frame.data[[0, 0]], 300.0);
}

#[test]
fn test_bake_dark_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 4, 4, 300.0, 5.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let mut context = CalibrationContext::new(dir.path());
    context
        .store_dark(Array2::from_elem((6, 6), 120.0), 5.0)
        .unwrap();

    let config = BakeConfig {
        dark: true,
        ..BakeConfig::default()
    };
    assert!(matches!(
        bake(&path, &instrument, &context, &config),
        Err(KilnError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_bake_flat_division() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 4, 4, 500.0, 5.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let mut context = CalibrationContext::new(dir.path());
    context.store_flat(Array2::from_elem((4, 4), 2.0)).unwrap();

    let config = BakeConfig {
        flat: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    assert_abs_diff_eq!(frame.data[[3, 1]], 250.0, epsilon = 1e-4);
}

#[test]
fn test_bake_sky_subtraction() {
    let dir = tempfile::tempdir().unwrap();
    let mut pixels = vec![200.0f32; 25];
    pixels[12] = 210.0;
    let path = common::write_file(
        dir.path(),
        "raw.fits",
        &common::build_fits_f32(5, 5, Some(1.0), &pixels),
    );

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        sky: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    // Median sky (200) removed; the residual median is zero.
    assert_abs_diff_eq!(frame.data[[0, 0]], 0.0, epsilon = 1e-4);
    assert_abs_diff_eq!(frame.data[[2, 2]], 10.0, epsilon = 1e-4);
    assert_abs_diff_eq!(nan_median(frame.data.view()), 0.0, epsilon = 1e-4);
}

#[test]
fn test_bake_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let mut pixels = vec![0.0f32; 6];
    pixels[0] = 9.0;
    let path = common::write_file(
        dir.path(),
        "raw.fits",
        &common::build_fits_f32(3, 2, Some(1.0), &pixels),
    );

    let mut instrument = Instrument::untrimmed(4095.0, 3000.0);
    instrument.rotation = Rotation::Cw90;
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        rotate: true,
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    // (2, 3) rotated clockwise becomes (3, 2); the old top-left lands in
    // the top-right corner.
    assert_eq!(frame.data.dim(), (3, 2));
    assert_eq!(frame.data[[0, 1]], 9.0);
}

#[test]
fn test_bake_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 8, 8, 1.0, 1.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        window: Some(4),
        ..BakeConfig::default()
    };
    let frame = bake(&path, &instrument, &context, &config).unwrap();
    assert_eq!(frame.data.dim(), (4, 4));
}

#[test]
fn test_bake_window_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::constant_frame_file(dir.path(), "raw.fits", 4, 4, 1.0, 1.0);

    let instrument = Instrument::untrimmed(4095.0, 3000.0);
    let context = CalibrationContext::new(dir.path());
    let config = BakeConfig {
        window: Some(10),
        ..BakeConfig::default()
    };
    assert!(matches!(
        bake(&path, &instrument, &context, &config),
        Err(KilnError::WindowTooLarge { .. })
    ));
}

// ---------------------------------------------------------------------------
// Rotation primitives
// ---------------------------------------------------------------------------

#[test]
fn test_rotation_round_trip() {
    let mut data = Array2::<f32>::zeros((3, 4));
    for ((row, col), v) in data.indexed_iter_mut() {
        *v = row as f32 * 10.0 + col as f32;
    }
    let there = Rotation::Cw90.apply(&data);
    let back = Rotation::Ccw90.apply(&there);
    assert_eq!(back, data);

    let twice = Rotation::Rot180.apply(&Rotation::Rot180.apply(&data));
    assert_eq!(twice, data);
}

#[test]
fn test_rotation_flips() {
    let data = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let rows = Rotation::FlipRows.apply(&data);
    assert_eq!(rows, Array2::from_shape_vec((2, 2), vec![3.0, 4.0, 1.0, 2.0]).unwrap());
    let cols = Rotation::FlipCols.apply(&data);
    assert_eq!(cols, Array2::from_shape_vec((2, 2), vec![2.0, 1.0, 4.0, 3.0]).unwrap());
}

use std::path::Path;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::CalibrationContext;
use crate::error::{KilnError, Result};
use crate::frame::Frame;
use crate::instrument::Instrument;
use crate::io::fits;
use crate::stats::nan_median;

/// Per-frame correction toggles.
///
/// Toggles are independent; a step whose required calibration input is
/// absent (no master dark/flat, undefined trim ranges) is a no-op. The
/// configuration is never mutated mid-pipeline.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Crop to the valid detector region.
    pub trim: bool,
    /// Subtract the current master dark.
    pub dark: bool,
    /// Divide by the current master flat.
    pub flat: bool,
    /// Subtract the scalar median sky level.
    pub sky: bool,
    /// Rotate to the standard sky orientation.
    pub rotate: bool,
    /// Crop symmetrically around the center to a square of this side.
    pub window: Option<usize>,
}

/// Read one raw frame and run it through the correction sequence.
///
/// Steps, in order: saturated-pixel invalidation (always), trim, dark
/// subtraction, flat division, sky subtraction, rotation, center
/// windowing. Reads the calibration context, never mutates it.
pub fn bake(
    path: &Path,
    instrument: &Instrument,
    context: &CalibrationContext,
    config: &BakeConfig,
) -> Result<Frame> {
    debug!(path = %path.display(), "reading raw frame");
    let frame = fits::read_frame(path)?;
    let header = frame.header;
    let mut data = frame.data;

    invalidate_saturated(&mut data, instrument.data_max);

    if config.trim {
        if let (Some(rows), Some(cols)) = (instrument.trim_rows, instrument.trim_cols) {
            debug!(
                rows = ?(rows.start, rows.end),
                cols = ?(cols.start, cols.end),
                "trimming"
            );
            data = data
                .slice(s![rows.start..rows.end, cols.start..cols.end])
                .to_owned();
        }
    }

    if config.dark {
        if let Some(dark) = context.dark() {
            debug!("subtracting dark");
            check_shapes(data.dim(), dark.dim())?;
            data -= dark;
        }
    }

    if config.flat {
        if let Some(flat) = context.flat() {
            debug!("dividing by flat");
            check_shapes(data.dim(), flat.dim())?;
            data /= flat;
        }
    }

    if config.sky {
        let sky = nan_median(data.view());
        debug!(sky, "subtracting median sky (DN)");
        data -= sky;
    }

    if config.rotate {
        debug!(rotation = ?instrument.rotation, "rotating to standard orientation");
        data = instrument.rotation.apply(&data);
    }

    if let Some(nwindow) = config.window {
        debug!(nwindow, "windowing");
        data = center_window(&data, nwindow)?;
    }

    Ok(Frame::new(data, header))
}

/// Replace pixels at the saturation value with NaN.
///
/// Idempotent: NaN never compares equal to the saturation value.
pub fn invalidate_saturated(data: &mut Array2<f32>, data_max: f32) {
    data.mapv_inplace(|v| if v == data_max { f32::NAN } else { v });
}

/// Crop a centered square of side `nwindow`, floor-division centering.
pub fn center_window(data: &Array2<f32>, nwindow: usize) -> Result<Array2<f32>> {
    let (h, w) = data.dim();
    if nwindow > h || nwindow > w {
        return Err(KilnError::WindowTooLarge {
            nwindow,
            height: h,
            width: w,
        });
    }
    let ylo = (h - nwindow) / 2;
    let xlo = (w - nwindow) / 2;
    Ok(data
        .slice(s![ylo..ylo + nwindow, xlo..xlo + nwindow])
        .to_owned())
}

fn check_shapes(frame: (usize, usize), master: (usize, usize)) -> Result<()> {
    if frame != master {
        return Err(KilnError::ShapeMismatch {
            expected: master,
            actual: frame,
        });
    }
    Ok(())
}

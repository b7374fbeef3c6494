use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Half-open pixel range `start..end` along one detector axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRange {
    pub start: usize,
    pub end: usize,
}

impl PixelRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Fixed rotation/flip applied to reach the standard sky orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    /// 90 degrees clockwise
    Cw90,
    /// 90 degrees counter-clockwise
    Ccw90,
    Rot180,
    /// Mirror top-to-bottom
    FlipRows,
    /// Mirror left-to-right
    FlipCols,
}

impl Rotation {
    /// Apply the rotation, producing a new standard-layout array.
    pub fn apply(&self, data: &Array2<f32>) -> Array2<f32> {
        let (h, w) = data.dim();
        match self {
            Rotation::None => data.clone(),
            Rotation::Cw90 => {
                let mut out = Array2::<f32>::zeros((w, h));
                for row in 0..h {
                    for col in 0..w {
                        out[[col, h - 1 - row]] = data[[row, col]];
                    }
                }
                out
            }
            Rotation::Ccw90 => {
                let mut out = Array2::<f32>::zeros((w, h));
                for row in 0..h {
                    for col in 0..w {
                        out[[w - 1 - col, row]] = data[[row, col]];
                    }
                }
                out
            }
            Rotation::Rot180 => {
                let mut out = Array2::<f32>::zeros((h, w));
                for row in 0..h {
                    for col in 0..w {
                        out[[h - 1 - row, w - 1 - col]] = data[[row, col]];
                    }
                }
                out
            }
            Rotation::FlipRows => {
                let mut out = Array2::<f32>::zeros((h, w));
                for row in 0..h {
                    for col in 0..w {
                        out[[h - 1 - row, col]] = data[[row, col]];
                    }
                }
                out
            }
            Rotation::FlipCols => {
                let mut out = Array2::<f32>::zeros((h, w));
                for row in 0..h {
                    for col in 0..w {
                        out[[row, w - 1 - col]] = data[[row, col]];
                    }
                }
                out
            }
        }
    }
}

/// Detector geometry and limits for one camera.
///
/// Loadable from a TOML file; `Default` encodes the reference camera.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Instrument {
    /// Saturation/maximum pixel value; pixels at this value are invalid.
    pub data_max: f32,
    /// Ceiling on the central median of an acceptable flat exposure.
    pub flat_max: f32,
    /// Valid detector rows; omitted means no trimming along this axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_rows: Option<PixelRange>,
    /// Valid detector columns; omitted means no trimming along this axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_cols: Option<PixelRange>,
    /// Rotation to the standard sky orientation.
    pub rotation: Rotation,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            data_max: 4095.0,
            flat_max: 3000.0,
            trim_rows: Some(PixelRange { start: 0, end: 2997 }),
            trim_cols: Some(PixelRange { start: 4, end: 4109 }),
            rotation: Rotation::None,
        }
    }
}

impl Instrument {
    /// An instrument with no trimming and no rotation, useful in tests.
    pub fn untrimmed(data_max: f32, flat_max: f32) -> Self {
        Self {
            data_max,
            flat_max,
            trim_rows: None,
            trim_cols: None,
            rotation: Rotation::None,
        }
    }
}

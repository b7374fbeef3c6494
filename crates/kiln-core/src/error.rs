use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KilnError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid FITS file: {0}")]
    InvalidFits(String),

    #[error("Calibration product not found: {}", .0.display())]
    ProductNotFound(PathBuf),

    #[error("No raw frames match '{pattern}'")]
    EmptyInputSet { pattern: String },

    #[error("Empty frame stack")]
    EmptyStack,

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Window of {nwindow} exceeds frame dimensions {height}x{width}")]
    WindowTooLarge {
        nwindow: usize,
        height: usize,
        width: usize,
    },

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, KilnError>;

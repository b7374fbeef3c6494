use std::path::PathBuf;

use ndarray::Array2;
use tracing::info;

use crate::error::{KilnError, Result};
use crate::io::fits::{self, ProductMeta};

/// Holder of the current master calibration frames.
///
/// Owned by the caller and passed by reference into the transform
/// pipeline and the synthesizers; a `&mut` borrow is required for every
/// load/store/clear, so no synthesis can observe a master mid-update.
#[derive(Debug, Default)]
pub struct CalibrationContext {
    product_dir: PathBuf,
    dark: Option<Array2<f32>>,
    flat: Option<Array2<f32>>,
}

impl CalibrationContext {
    pub fn new(product_dir: impl Into<PathBuf>) -> Self {
        Self {
            product_dir: product_dir.into(),
            dark: None,
            flat: None,
        }
    }

    /// Current master dark, if any.
    pub fn dark(&self) -> Option<&Array2<f32>> {
        self.dark.as_ref()
    }

    /// Current master flat, if any.
    pub fn flat(&self) -> Option<&Array2<f32>> {
        self.flat.as_ref()
    }

    /// Path of the persisted master dark for one exposure time.
    pub fn dark_path(&self, exposure_time: f64) -> PathBuf {
        self.product_dir.join(format!("dark-{exposure_time:.0}.fits"))
    }

    /// Path of the persisted master flat.
    pub fn flat_path(&self) -> PathBuf {
        self.product_dir.join("flat.fits")
    }

    /// Load the persisted master dark for the given exposure time.
    pub fn load_dark(&mut self, exposure_time: f64) -> Result<()> {
        let path = self.dark_path(exposure_time);
        if !path.exists() {
            return Err(KilnError::ProductNotFound(path));
        }
        info!(path = %path.display(), "reading master dark");
        self.dark = Some(fits::read_data(&path)?);
        Ok(())
    }

    /// Load the persisted master flat.
    pub fn load_flat(&mut self) -> Result<()> {
        let path = self.flat_path();
        if !path.exists() {
            return Err(KilnError::ProductNotFound(path));
        }
        info!(path = %path.display(), "reading master flat");
        self.flat = Some(fits::read_data(&path)?);
        Ok(())
    }

    /// Install a new master dark and persist it.
    pub fn store_dark(&mut self, data: Array2<f32>, exposure_time: f64) -> Result<()> {
        let path = self.dark_path(exposure_time);
        info!(path = %path.display(), "writing master dark");
        let meta = ProductMeta {
            exposure_time: Some(exposure_time),
            ..Default::default()
        };
        fits::write_product(&path, &data, &meta)?;
        self.dark = Some(data);
        Ok(())
    }

    /// Install a new master flat and persist it.
    pub fn store_flat(&mut self, data: Array2<f32>) -> Result<()> {
        let path = self.flat_path();
        info!(path = %path.display(), "writing master flat");
        fits::write_product(&path, &data, &ProductMeta::default())?;
        self.flat = Some(data);
        Ok(())
    }

    /// Forget the in-memory master dark; dark subtraction becomes a no-op.
    pub fn clear_dark(&mut self) {
        self.dark = None;
    }

    /// Forget the in-memory master flat; flat division becomes a no-op.
    pub fn clear_flat(&mut self) {
        self.flat = None;
    }
}

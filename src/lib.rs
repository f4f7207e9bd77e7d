#![doc = include_str!("../README.md")]

pub mod classifier;
pub mod conv;
pub mod database;
pub mod error;
pub mod features;
pub mod fov;
pub mod image;
pub mod instrument;
pub mod linemask;
pub mod pipeline;
pub mod protocol;

// --- High-level re-exports -------------------------------------------------

// Main entry points: run-level driver + its inputs and outputs.
pub use crate::error::{Error, Result};
pub use crate::pipeline::{classify_image, train_model, ClassifyReport, ImageBundle, SegmenterParams};
pub use crate::protocol::{Metrics, Model, PredictionImage, RocCurve};

/// Small prelude for quick experiments.
///
/// ```no_run
/// use vessel_detector::prelude::*;
///
/// # fn main() -> vessel_detector::Result<()> {
/// let params = SegmenterParams::default();
/// let bank = LineMaskBank::generate(params.kernel_size, params.rotation_resolution)?;
///
/// let image = ImageF32::new(64, 64);
/// let fov = vessel_detector::fov::build_fov(&MaskImage::filled(64, 64), params.kernel_size)?;
/// let bundle = ImageBundle { image, fov, truth: None };
/// # let _ = (bundle, bank);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageF32, MaskImage};
    pub use crate::linemask::LineMaskBank;
    pub use crate::{classify_image, train_model, ImageBundle, Model, SegmenterParams};
}

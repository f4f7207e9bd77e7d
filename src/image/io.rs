//! I/O helpers for fundus photographs, binary masks and JSON reports.
//!
//! - `load_inverted_green`: read a fundus photograph and keep the inverted
//!   green channel (vessels come out bright), scaled to [0, 1].
//! - `load_binary_mask`: read a raster and binarize at half intensity.
//! - `save_prediction`: write a prediction to a grayscale PNG.
//! - `write_json_file` / `read_json_file`: (de)serialize reports and models.
//!
//! All faults here are fatal [`Error::Io`] values; the pipeline never
//! retries I/O.
use super::{ImageF32, MaskImage};
use crate::error::{Error, Result};
use crate::protocol::PredictionImage;
use image::GrayImage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load a fundus photograph, extract the green channel and invert it.
pub fn load_inverted_green(path: &Path) -> Result<ImageF32> {
    let img = image::open(path)
        .map_err(|e| Error::Io(format!("failed to open {}: {e}", path.display())))?
        .into_rgb8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data = img
        .pixels()
        .map(|p| 1.0 - f32::from(p.0[1]) / 255.0)
        .collect();
    Ok(ImageF32::from_vec(w, h, data))
}

/// Load a raster as a boolean mask, thresholding at half intensity.
pub fn load_binary_mask(path: &Path) -> Result<MaskImage> {
    let img = image::open(path)
        .map_err(|e| Error::Io(format!("failed to open {}: {e}", path.display())))?
        .into_luma8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data = img.pixels().map(|p| p.0[0] > 127).collect();
    Ok(MaskImage { w, h, data })
}

/// Save a prediction as a grayscale PNG: vessels white, background black.
pub fn save_prediction(prediction: &PredictionImage, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(prediction.width as u32, prediction.height as u32);
    for (i, &vessel) in prediction.labels.iter().enumerate() {
        let x = (i % prediction.width) as u32;
        let y = (i / prediction.width) as u32;
        out.put_pixel(x, y, image::Luma([if vessel { 255u8 } else { 0u8 }]));
    }
    out.save(path)
        .map_err(|e| Error::Io(format!("failed to save {}: {e}", path.display())))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::Io(format!("failed to serialize JSON for {}: {e}", path.display())))?;
    fs::write(path, json)
        .map_err(|e| Error::Io(format!("failed to write JSON {}: {e}", path.display())))
}

/// Read a JSON file back into a value (e.g. a persisted model).
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&data)
        .map_err(|e| Error::Io(format!("failed to parse JSON {}: {e}", path.display())))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("failed to create {}: {e}", parent.display())))?;
        }
    }
    Ok(())
}

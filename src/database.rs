//! Filename conventions of the supported retinal image databases.
//!
//! The pipeline itself never touches the filesystem layout; the driver
//! resolves an image number to the photograph, field-of-view mask and
//! manual segmentation paths through this module and feeds the loaded
//! rasters in.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported image databases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Database {
    /// Digital Retinal Images for Vessel Extraction (40 images, TIFF/GIF).
    Drive,
    /// DR HAGIS high-resolution fundus set (JPEG/PNG).
    DrHagis,
}

impl Database {
    /// Path of fundus photograph `index` under `root`.
    pub fn image_path(&self, root: &Path, index: u32) -> PathBuf {
        match self {
            Self::Drive => root.join(format!("DRIVE/training/images/{index:02}_training.tif")),
            Self::DrHagis => root.join(format!("DRHAGIS/Fundus_Images/{index}.jpg")),
        }
    }

    /// Path of the raw field-of-view mask for image `index`.
    pub fn mask_path(&self, root: &Path, index: u32) -> PathBuf {
        match self {
            Self::Drive => root.join(format!("DRIVE/training/mask/{index:02}_training_mask.gif")),
            Self::DrHagis => root.join(format!("DRHAGIS/Mask_images/{index}_mask_orig.png")),
        }
    }

    /// Path of the manual vessel segmentation for image `index`.
    pub fn truth_path(&self, root: &Path, index: u32) -> PathBuf {
        match self {
            Self::Drive => root.join(format!("DRIVE/training/1st_manual/{index:02}_manual1.gif")),
            Self::DrHagis => {
                root.join(format!("DRHAGIS/Manual_Segmentations/{index}_manual_orig.png"))
            }
        }
    }
}

impl FromStr for Database {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drive" => Ok(Self::Drive),
            "dr-hagis" | "drhagis" => Ok(Self::DrHagis),
            other => Err(format!("unknown database '{other}' (expected drive or dr-hagis)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_paths_are_zero_padded() {
        let root = Path::new("/data");
        assert_eq!(
            Database::Drive.image_path(root, 3),
            Path::new("/data/DRIVE/training/images/03_training.tif")
        );
        assert_eq!(
            Database::Drive.truth_path(root, 21),
            Path::new("/data/DRIVE/training/1st_manual/21_manual1.gif")
        );
    }

    #[test]
    fn database_parses_both_spellings() {
        assert_eq!("drive".parse::<Database>(), Ok(Database::Drive));
        assert_eq!("dr-hagis".parse::<Database>(), Ok(Database::DrHagis));
        assert_eq!("DRHAGIS".parse::<Database>(), Ok(Database::DrHagis));
        assert!("stare".parse::<Database>().is_err());
    }
}

//! Error kinds surfaced by the segmentation pipeline.
//!
//! I/O faults from the image collaborator are wrapped in [`Error::Io`] and
//! propagate out unrecovered; the remaining variants are configuration or
//! data errors detected before or during feature extraction.

use core::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad kernel size or rotation resolution.
    InvalidParameter(String),
    /// Degenerate or dimension-mismatched field-of-view mask.
    InvalidMask(String),
    /// Training set with fewer than two label classes, or missing labels.
    InvalidTrainingSet(String),
    /// `classify` invoked with more than one image; carries the count.
    MultiImageClassification(usize),
    /// Fatal fault from the image I/O collaborator.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::InvalidMask(msg) => write!(f, "invalid field-of-view mask: {msg}"),
            Self::InvalidTrainingSet(msg) => write!(f, "invalid training set: {msg}"),
            Self::MultiImageClassification(n) => {
                write!(f, "only one image can be classified at once (got {n})")
            }
            Self::Io(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

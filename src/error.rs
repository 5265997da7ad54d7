//! Unified error handling for the pitch-heatmap library.
//!
//! Pipeline conditions such as a missing calibration or an empty sample set
//! are reported through [`crate::HeatmapStatus`], not through this type.
//! Errors here are reserved for misuse (bad corner counts, bad config) and
//! storage failures.

use thiserror::Error;

/// Unified error type for pitch-heatmap operations.
#[derive(Debug, Error)]
pub enum HeatmapError {
    /// No field corners have been captured for this installation
    #[error("Field calibration is missing; capture the four field corners first")]
    MissingCalibration,

    /// A field needs exactly four corners
    #[error("Field calibration needs exactly 4 corners, got {count}")]
    InvalidCornerCount { count: usize },

    /// The capture session already holds four corners
    #[error("Calibration session already has all 4 corners")]
    CalibrationAlreadyComplete,

    /// A GPS sample is non-finite or outside WGS84 range
    #[error("Invalid coordinates: {message}")]
    InvalidCoordinates { message: String },

    /// Persisted calibration could not be parsed
    #[error("Stored calibration is corrupt: {message}")]
    CorruptCalibration { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },

    /// Persistence/storage error
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for HeatmapError {
    fn from(err: rusqlite::Error) -> Self {
        HeatmapError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Result type alias for pitch-heatmap operations.
pub type Result<T> = std::result::Result<T, HeatmapError>;

/// Extension trait for converting Option to HeatmapError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a missing calibration error.
    fn ok_or_missing_calibration(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_calibration(self) -> Result<T> {
        self.ok_or(HeatmapError::MissingCalibration)
    }
}

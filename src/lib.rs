//! # Pitch Heatmap
//!
//! Field-calibrated GPS heatmaps for recreational football and futsal.
//!
//! This library provides:
//! - Field corner calibration capture and storage
//! - Point-in-polygon filtering of GPS samples against the calibrated field
//! - Binning of in-field samples into a fixed 10 × 16 grid
//! - Count-based intensity normalization (0, or 1-10) for heatmap rendering
//! - Quarter report assembly for the match report endpoint
//!
//! ## Features
//!
//! - **`parallel`** - Build quarter reports in parallel with rayon
//! - **`persistence`** - SQLite storage for field calibrations
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use pitch_heatmap::{compute_heatmap, FieldCorners, GeoPoint, HeatmapConfig};
//!
//! let corners = FieldCorners::from_points(&[
//!     GeoPoint::new(0.0, 0.0),
//!     GeoPoint::new(0.0, 10.0),
//!     GeoPoint::new(10.0, 10.0),
//!     GeoPoint::new(10.0, 0.0),
//! ])
//! .unwrap();
//!
//! let samples = vec![GeoPoint::new(5.0, 5.0), GeoPoint::new(15.0, 15.0)];
//! let result = compute_heatmap(&samples, Some(&corners), &HeatmapConfig::default());
//!
//! assert_eq!(result.grid.rows(), 10);
//! assert_eq!(result.grid.cols(), 16);
//! assert_eq!(result.stats.points_in_field, 1);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{HeatmapError, OptionExt, Result};

// Field corner capture and calibration storage
pub mod calibration;
pub use calibration::{
    CalibrationListener, CaptureProgress, CornerCapture, CornerStore, FieldCorners,
    FileCornerStore, InMemoryCornerStore,
};

// Ray casting against the calibrated field
pub mod geofence;
pub use geofence::{
    field_inclusion_ratio, filter_points_in_field, point_in_field, FieldShape,
};

// Mapping of in-field samples to grid cells
pub mod grid;
pub use grid::{CellCounts, CountGrid, GridMapper};

// Count to display intensity normalization
pub mod intensity;
pub use intensity::{normalize, IntensityGrid, MAX_INTENSITY};

// End-to-end heatmap computation
pub mod heatmap;
pub use heatmap::{
    compute_heatmap, try_compute_heatmap, HeatmapResult, HeatmapStats, HeatmapStatus,
};

// Attacking side detection from early samples
pub mod side;
pub use side::{detect_game_side, GameSide};

// Quarter report assembly
pub mod report;
pub use report::{
    build_quarter_report, build_quarter_reports, find_heatmap, ExerciseDataSource,
    ExerciseSegment, GameReportData, MatchReportData, MatchReportRequest, QuarterReport,
};

// Algorithm toolbox - modular access to all algorithms
pub mod algorithms;

// SQLite calibration storage
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteCornerStore;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("PitchHeatmapRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS sample with latitude, longitude and capture time.
///
/// # Example
/// ```
/// use pitch_heatmap::GeoPoint;
/// let point = GeoPoint::with_timestamp(37.5665, 126.9780, 1_700_000_000_000);
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds since the Unix epoch (0 when unknown)
    #[serde(default)]
    pub timestamp_millis: i64,
}

impl GeoPoint {
    /// Create a new point without a timestamp.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::with_timestamp(latitude, longitude, 0)
    }

    /// Create a new point captured at `timestamp_millis`.
    pub fn with_timestamp(latitude: f64, longitude: f64, timestamp_millis: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_millis,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Axis-aligned bounding box of a calibrated field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct FieldBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl FieldBounds {
    /// Create bounds from points, `None` when there are none.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(Self::enclosing(points))
    }

    /// Smallest box around `points`. Inverted (min > max) when empty.
    pub(crate) fn enclosing(points: &[GeoPoint]) -> Self {
        points.iter().fold(
            Self {
                min_lat: f64::MAX,
                max_lat: f64::MIN,
                min_lng: f64::MAX,
                max_lng: f64::MIN,
            },
            |b, p| Self {
                min_lat: b.min_lat.min(p.latitude),
                max_lat: b.max_lat.max(p.latitude),
                min_lng: b.min_lng.min(p.longitude),
                max_lng: b.max_lng.max(p.longitude),
            },
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lng_span(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// True when the box has no area, so normalization would divide by zero.
    pub fn is_degenerate(&self) -> bool {
        let lat_span = self.lat_span();
        let lng_span = self.lng_span();
        !(lat_span.is_finite() && lng_span.is_finite() && lat_span > 0.0 && lng_span > 0.0)
    }
}

/// Shape of a heatmap grid. Rows follow latitude, columns follow longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GridDimensions {
    pub rows: u32,
    pub cols: u32,
}

impl GridDimensions {
    /// 10 rows × 16 columns, the shape the match report endpoint expects.
    pub const CANONICAL: GridDimensions = GridDimensions { rows: 10, cols: 16 };

    /// Largest grid a config may ask for.
    pub const MAX_CELLS: usize = 1 << 16;

    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }
}

impl Default for GridDimensions {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// A cell in a heatmap grid. Both indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CellIndex {
    pub row: u32,
    pub col: u32,
}

impl CellIndex {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Offset into a row-major buffer.
    #[inline]
    pub fn offset(&self, dims: GridDimensions) -> usize {
        self.row as usize * dims.cols as usize + self.col as usize
    }
}

/// Configuration for heatmap computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default)]
pub struct HeatmapConfig {
    /// Grid shape. Default: 10 rows × 16 columns
    pub dimensions: GridDimensions,

    /// Share of samples expected inside the field. Below this a warning is
    /// logged since the calibration probably belongs to another pitch.
    /// Default: 0.8
    pub field_inclusion_threshold: f64,

    /// Number of leading samples averaged to decide the starting side.
    /// Default: 10
    pub side_detection_samples: u32,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            dimensions: GridDimensions::CANONICAL,
            field_inclusion_threshold: 0.8,
            side_detection_samples: 10,
        }
    }
}

impl HeatmapConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: HeatmapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject shapes and thresholds the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions.rows == 0 || self.dimensions.cols == 0 {
            return Err(HeatmapError::InvalidConfig {
                message: format!(
                    "grid must have at least one row and column, got {}x{}",
                    self.dimensions.rows, self.dimensions.cols
                ),
            });
        }
        let cells = (self.dimensions.rows as usize).checked_mul(self.dimensions.cols as usize);
        if !cells.is_some_and(|n| n <= GridDimensions::MAX_CELLS) {
            return Err(HeatmapError::InvalidConfig {
                message: format!(
                    "grid {}x{} exceeds {} cells",
                    self.dimensions.rows,
                    self.dimensions.cols,
                    GridDimensions::MAX_CELLS
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.field_inclusion_threshold) {
            return Err(HeatmapError::InvalidConfig {
                message: format!(
                    "field_inclusion_threshold must be within 0..=1, got {}",
                    self.field_inclusion_threshold
                ),
            });
        }
        if self.side_detection_samples == 0 {
            return Err(HeatmapError::InvalidConfig {
                message: "side_detection_samples must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! # Algorithm Toolbox
//!
//! This module provides direct access to the individual heatmap stages.
//! Use these to run a single step (containment, binning, normalization,
//! side detection) inside your own pipeline without going through
//! [`compute_heatmap`].
//!
//! ## Stages
//!
//! - **Geofence**: Ray casting against the four calibrated corners
//! - **Grid Mapping**: Bounding-box projection of samples onto rows and columns
//! - **Normalization**: Linear scaling of cell counts to 0-10
//! - **Side Detection**: Starting half from the opening samples
//!
//! # Example
//!
//! ```rust
//! use pitch_heatmap::algorithms::{
//!     normalize, point_in_field, FieldCorners, GeoPoint, GridDimensions, GridMapper,
//! };
//!
//! let corners = FieldCorners::from_points(&[
//!     GeoPoint::new(0.0, 0.0),
//!     GeoPoint::new(0.0, 10.0),
//!     GeoPoint::new(10.0, 10.0),
//!     GeoPoint::new(10.0, 0.0),
//! ])
//! .unwrap();
//!
//! let sample = GeoPoint::new(2.5, 7.5);
//! assert!(point_in_field(&sample, &corners));
//!
//! let mapper = GridMapper::new(&corners, GridDimensions::new(4, 4));
//! let intensity = normalize(&mapper.count_grid(&[sample]));
//! assert_eq!(intensity.get(1, 3), 10);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    CellIndex, FieldBounds, FieldCorners, GeoPoint, GridDimensions, HeatmapConfig,
};

// =============================================================================
// Geofence
// =============================================================================

pub use crate::geofence::{
    field_inclusion_ratio, filter_points_in_field, point_in_field, FieldShape,
};

// =============================================================================
// Grid Mapping
// =============================================================================

pub use crate::grid::{CellCounts, CountGrid, GridMapper};

// =============================================================================
// Normalization
// =============================================================================

pub use crate::intensity::{normalize, IntensityGrid, MAX_INTENSITY};

// =============================================================================
// Side Detection
// =============================================================================

pub use crate::side::{detect_game_side, GameSide};

// =============================================================================
// Full Pipeline
// =============================================================================

pub use crate::heatmap::{compute_heatmap, HeatmapResult, HeatmapStatus};

//! End-to-end heatmap computation for one match segment.
//!
//! Pipeline: geofence filter → grid mapping → intensity normalization.
//! Every condition that stops the pipeline early (no calibration, no
//! samples, a collapsed field) still produces a zero grid of the configured
//! shape, so report assembly never has to special-case a missing heatmap.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::calibration::FieldCorners;
use crate::error::{HeatmapError, Result};
use crate::geofence::{filter_points_in_field, FieldShape};
use crate::grid::{CountGrid, GridMapper};
use crate::intensity::{normalize, IntensityGrid};
use crate::{GeoPoint, HeatmapConfig};

/// How a heatmap computation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "snake_case")]
pub enum HeatmapStatus {
    /// Samples were binned and normalized
    Computed,
    /// No field corners were available
    MissingCalibration,
    /// The corners enclose no area
    DegenerateField,
    /// The segment had no GPS samples
    NoSamples,
    /// Samples existed but none were inside the field
    NoSamplesInField,
}

impl Default for HeatmapStatus {
    fn default() -> Self {
        HeatmapStatus::NoSamples
    }
}

impl HeatmapStatus {
    /// Only a skipped calibration is worth telling the player about.
    pub fn needs_user_attention(&self) -> bool {
        matches!(self, HeatmapStatus::MissingCalibration)
    }
}

/// Counters describing one computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct HeatmapStats {
    pub total_points: u32,
    pub points_in_field: u32,
    /// In-field points that landed in a cell
    pub points_mapped: u32,
    /// In-field points discarded by the mapper (non-finite positions)
    pub points_dropped: u32,
    pub filled_cells: u32,
    pub max_count: u32,
}

/// Output of [`compute_heatmap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapResult {
    #[serde(rename = "heatmap")]
    pub grid: IntensityGrid,
    #[serde(skip)]
    pub status: HeatmapStatus,
    #[serde(skip)]
    pub stats: HeatmapStats,
}

impl HeatmapResult {
    fn empty(config: &HeatmapConfig, status: HeatmapStatus, total_points: usize) -> Self {
        Self {
            grid: IntensityGrid::zeros(config.dimensions),
            status,
            stats: HeatmapStats {
                total_points: total_points as u32,
                ..HeatmapStats::default()
            },
        }
    }

    /// Wire payload: `{"heatmap": [[...], ...]}`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Compute the heatmap for one segment.
///
/// Pure and deterministic: the same samples and corners always give the
/// same grid.
///
/// `config` must pass [`HeatmapConfig::validate`]; use
/// [`try_compute_heatmap`] when it comes from outside.
pub fn compute_heatmap(
    points: &[GeoPoint],
    corners: Option<&FieldCorners>,
    config: &HeatmapConfig,
) -> HeatmapResult {
    let Some(corners) = corners else {
        warn!("[Heatmap] No field calibration, returning empty heatmap");
        return HeatmapResult::empty(config, HeatmapStatus::MissingCalibration, points.len());
    };

    if points.is_empty() {
        info!("[Heatmap] No GPS points, returning empty heatmap");
        return HeatmapResult::empty(config, HeatmapStatus::NoSamples, 0);
    }

    let mapper = GridMapper::new(corners, config.dimensions);
    match corners.shape() {
        FieldShape::ZeroArea => {
            warn!("[Heatmap] Field corners enclose no area, returning empty heatmap");
            return HeatmapResult::empty(config, HeatmapStatus::DegenerateField, points.len());
        }
        FieldShape::SelfIntersecting => {
            warn!("[Heatmap] Field corners cross each other; containment may be unreliable");
        }
        FieldShape::Valid => {}
    }
    if mapper.is_degenerate() {
        warn!("[Heatmap] Field bounds are degenerate, returning empty heatmap");
        return HeatmapResult::empty(config, HeatmapStatus::DegenerateField, points.len());
    }

    let in_field = filter_points_in_field(points, corners);
    let ratio = in_field.len() as f64 / points.len() as f64;
    if ratio < config.field_inclusion_threshold {
        warn!(
            "[Heatmap] Only {:.0}% of points inside the field (expected {:.0}%), calibration may be stale",
            ratio * 100.0,
            config.field_inclusion_threshold * 100.0
        );
    }

    if in_field.is_empty() {
        return HeatmapResult::empty(config, HeatmapStatus::NoSamplesInField, points.len());
    }

    let counts = mapper.accumulate(&in_field);
    let mapped = counts.total() as u32;
    let max_count = counts.max_count();
    debug!(
        "[Heatmap] Max cell count {}, {} cells filled",
        max_count,
        counts.len()
    );

    let grid = normalize(&CountGrid::from_counts(&counts, config.dimensions));
    let filled = grid.filled_cells();
    info!(
        "[Heatmap] Generated {}x{} grid, {}/{} cells filled ({}/{} points in field)",
        grid.rows(),
        grid.cols(),
        filled,
        config.dimensions.cell_count(),
        in_field.len(),
        points.len()
    );

    HeatmapResult {
        grid,
        status: HeatmapStatus::Computed,
        stats: HeatmapStats {
            total_points: points.len() as u32,
            points_in_field: in_field.len() as u32,
            points_mapped: mapped,
            points_dropped: (in_field.len() as u32).saturating_sub(mapped),
            filled_cells: filled as u32,
            max_count,
        },
    }
}

/// Like [`compute_heatmap`], but a missing calibration is an error.
pub fn try_compute_heatmap(
    points: &[GeoPoint],
    corners: Option<&FieldCorners>,
    config: &HeatmapConfig,
) -> Result<HeatmapResult> {
    config.validate()?;
    let result = compute_heatmap(points, corners, config);
    if result.status == HeatmapStatus::MissingCalibration {
        return Err(HeatmapError::MissingCalibration);
    }
    Ok(result)
}

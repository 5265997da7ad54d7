//! Projection of in-field samples onto a fixed heatmap grid.
//!
//! The calibrated field's bounding box is stretched over the grid: longitude
//! maps to columns, latitude maps to rows. Samples are expected to have
//! passed the geofence already, but values on or just past the boundary are
//! clamped into the outer cells rather than dropped.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::calibration::FieldCorners;
use crate::{CellIndex, FieldBounds, GeoPoint, GridDimensions};

/// Raw occupancy per cell, built while points are aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellCounts {
    counts: BTreeMap<CellIndex, u32>,
}

impl CellCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, cell: CellIndex) {
        *self.counts.entry(cell).or_insert(0) += 1;
    }

    pub fn get(&self, cell: CellIndex) -> u32 {
        self.counts.get(&cell).copied().unwrap_or(0)
    }

    /// Highest count of any cell (0 when empty).
    pub fn max_count(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// Number of points that were counted.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    /// Number of distinct cells with a count.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellIndex, u32)> + '_ {
        self.counts.iter().map(|(&cell, &count)| (cell, count))
    }
}

/// Row-major grid of raw occupancy counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountGrid {
    dims: GridDimensions,
    cells: Vec<u32>,
}

impl CountGrid {
    pub fn zeros(dims: GridDimensions) -> Self {
        Self {
            dims,
            cells: vec![0; dims.cell_count()],
        }
    }

    /// Fold counts into a grid. Cells outside `dims` are ignored.
    pub fn from_counts(counts: &CellCounts, dims: GridDimensions) -> Self {
        let mut grid = Self::zeros(dims);
        for (cell, count) in counts.iter() {
            if dims.contains(cell) {
                grid.cells[cell.offset(dims)] = count;
            } else {
                warn!(
                    "[Heatmap] Ignoring count for cell ({}, {}) outside {}x{} grid",
                    cell.row, cell.col, dims.rows, dims.cols
                );
            }
        }
        grid
    }

    /// Build from nested rows. Returns `None` if the rows are ragged.
    pub fn from_rows(rows: &[Vec<u32>]) -> Option<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        Some(Self {
            dims: GridDimensions::new(rows.len() as u32, cols as u32),
            cells: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    pub fn get(&self, row: u32, col: u32) -> u32 {
        let cell = CellIndex::new(row, col);
        if self.dims.contains(cell) {
            self.cells[cell.offset(self.dims)]
        } else {
            0
        }
    }

    pub fn max_count(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub(crate) fn cells(&self) -> &[u32] {
        &self.cells
    }
}

/// Maps GPS samples to cells of a grid laid over the calibrated field.
#[derive(Debug, Clone)]
pub struct GridMapper {
    bounds: FieldBounds,
    dims: GridDimensions,
}

impl GridMapper {
    pub fn new(corners: &FieldCorners, dims: GridDimensions) -> Self {
        Self {
            bounds: corners.bounds(),
            dims,
        }
    }

    pub fn bounds(&self) -> &FieldBounds {
        &self.bounds
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// True when the field has no extent on one axis, so no sample can map.
    pub fn is_degenerate(&self) -> bool {
        self.bounds.is_degenerate() || self.dims.rows == 0 || self.dims.cols == 0
    }

    /// Cell for a sample, or `None` when the field is degenerate, the sample
    /// is not a valid WGS84 position, or the normalized position is not finite.
    pub fn map_point(&self, point: &GeoPoint) -> Option<CellIndex> {
        if self.is_degenerate() || !point.is_valid() {
            return None;
        }

        let nx = (point.longitude - self.bounds.min_lng) / self.bounds.lng_span();
        let ny = (point.latitude - self.bounds.min_lat) / self.bounds.lat_span();
        if !nx.is_finite() || !ny.is_finite() {
            return None;
        }

        Some(CellIndex {
            row: scale_to_index(ny, self.dims.rows),
            col: scale_to_index(nx, self.dims.cols),
        })
    }

    /// Count samples per cell. Samples that cannot be mapped are skipped.
    pub fn accumulate(&self, points: &[GeoPoint]) -> CellCounts {
        let mut counts = CellCounts::new();
        for cell in points.iter().filter_map(|p| self.map_point(p)) {
            counts.increment(cell);
        }
        counts
    }

    /// Count samples straight into a grid.
    pub fn count_grid(&self, points: &[GeoPoint]) -> CountGrid {
        CountGrid::from_counts(&self.accumulate(points), self.dims)
    }
}

/// `floor(fraction * size)` clamped to `[0, size - 1]`.
#[inline]
fn scale_to_index(fraction: f64, size: u32) -> u32 {
    let max = size.saturating_sub(1) as f64;
    (fraction * size as f64).floor().clamp(0.0, max) as u32
}

//! Count to display intensity normalization.
//!
//! Renderers colour cells by a small integer scale: 0 for cells nobody
//! visited, 1 to 10 for visited cells relative to the busiest one. The
//! rescale uses integer arithmetic with truncation, so
//! `count = 5, max = 10` gives `1 + 45 / 10 = 5`.

use serde::{Deserialize, Serialize};

use crate::grid::CountGrid;
use crate::{CellIndex, GridDimensions};

/// Highest intensity a cell can reach.
pub const MAX_INTENSITY: u8 = 10;

/// Row-major grid of display intensities in `{0} ∪ [1, 10]`.
///
/// Serializes as nested rows, `[[0, 3, ...], ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<u8>>", try_from = "Vec<Vec<u8>>")]
pub struct IntensityGrid {
    dims: GridDimensions,
    cells: Vec<u8>,
}

impl IntensityGrid {
    /// All-zero grid.
    pub fn zeros(dims: GridDimensions) -> Self {
        Self {
            dims,
            cells: vec![0; dims.cell_count()],
        }
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    pub fn rows(&self) -> usize {
        self.dims.rows as usize
    }

    pub fn cols(&self) -> usize {
        self.dims.cols as usize
    }

    /// Intensity at a cell, 0 outside the grid.
    pub fn get(&self, row: u32, col: u32) -> u8 {
        let cell = CellIndex::new(row, col);
        if self.dims.contains(cell) {
            self.cells[cell.offset(self.dims)]
        } else {
            0
        }
    }

    /// Number of cells with a non-zero intensity.
    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|&&v| v > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.filled_cells() == 0
    }

    pub fn row(&self, row: u32) -> Option<&[u8]> {
        if row >= self.dims.rows {
            return None;
        }
        let cols = self.cols();
        let start = row as usize * cols;
        Some(&self.cells[start..start + cols])
    }

    /// Copy into nested rows, the shape the report endpoint takes.
    pub fn to_nested(&self) -> Vec<Vec<u8>> {
        if self.dims.cols == 0 {
            return vec![Vec::new(); self.rows()];
        }
        self.cells.chunks(self.cols()).map(<[u8]>::to_vec).collect()
    }
}

impl From<IntensityGrid> for Vec<Vec<u8>> {
    fn from(grid: IntensityGrid) -> Self {
        grid.to_nested()
    }
}

impl TryFrom<Vec<Vec<u8>>> for IntensityGrid {
    type Error = String;

    fn try_from(rows: Vec<Vec<u8>>) -> std::result::Result<Self, Self::Error> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
            return Err(format!(
                "row {} has {} cells, expected {}",
                bad,
                rows[bad].len(),
                cols
            ));
        }
        if let Some(v) = rows.iter().flatten().find(|&&v| v > MAX_INTENSITY) {
            return Err(format!("intensity {} exceeds {}", v, MAX_INTENSITY));
        }
        Ok(Self {
            dims: GridDimensions::new(rows.len() as u32, cols as u32),
            cells: rows.into_iter().flatten().collect(),
        })
    }
}

/// Rescale raw counts to intensities.
///
/// Zero stays zero. A non-zero count `c` becomes `1 + (c * 9) / max`, so the
/// busiest cell always gets [`MAX_INTENSITY`]. The input is not modified.
pub fn normalize(counts: &CountGrid) -> IntensityGrid {
    let dims = counts.dimensions();
    let max = counts.max_count() as u64;
    if max == 0 {
        return IntensityGrid::zeros(dims);
    }

    let cells = counts
        .cells()
        .iter()
        .map(|&count| scale_count(count as u64, max))
        .collect();
    IntensityGrid { dims, cells }
}

#[inline]
fn scale_count(count: u64, max: u64) -> u8 {
    if count == 0 {
        0
    } else {
        (1 + (count * 9) / max) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_truncation() {
        assert_eq!(scale_count(5, 10), 5);
        assert_eq!(scale_count(10, 10), 10);
        assert_eq!(scale_count(1, 10), 1);
        assert_eq!(scale_count(1, 3), 4);
        assert_eq!(scale_count(2, 3), 7);
        assert_eq!(scale_count(0, 3), 0);
    }

    #[test]
    fn test_all_zero_grid() {
        let counts = CountGrid::zeros(GridDimensions::CANONICAL);
        let grid = normalize(&counts);
        assert_eq!(grid.rows(), 10);
        assert_eq!(grid.cols(), 16);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_normalize_does_not_touch_input() {
        let counts = CountGrid::from_rows(&[vec![0, 1, 3], vec![9, 0, 0]]).unwrap();
        let before = counts.clone();
        let grid = normalize(&counts);

        assert_eq!(counts, before);
        assert_eq!(grid.to_nested(), vec![vec![0, 2, 4], vec![10, 0, 0]]);
        assert_eq!(grid.filled_cells(), 3);
    }

    #[test]
    fn test_large_counts_do_not_overflow() {
        let counts = CountGrid::from_rows(&[vec![u32::MAX, u32::MAX / 2]]).unwrap();
        let grid = normalize(&counts);
        assert_eq!(grid.get(0, 0), 10);
        assert_eq!(grid.get(0, 1), 5);
    }

    #[test]
    fn test_json_shape() {
        let counts = CountGrid::from_rows(&[vec![0, 2], vec![1, 0]]).unwrap();
        let json = serde_json::to_string(&normalize(&counts)).unwrap();
        assert_eq!(json, "[[0,10],[5,0]]");

        let parsed: IntensityGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.get(0, 1), 10);
        assert!(serde_json::from_str::<IntensityGrid>("[[0,1],[2]]").is_err());
        assert!(serde_json::from_str::<IntensityGrid>("[[11]]").is_err());
    }

    #[test]
    fn test_row_access() {
        let grid = IntensityGrid::zeros(GridDimensions::new(2, 3));
        assert_eq!(grid.row(1), Some(&[0u8, 0, 0][..]));
        assert_eq!(grid.row(2), None);
    }
}

//! Starting side detection.
//!
//! Teams swap ends between quarters, so a heatmap alone cannot tell which
//! half a player was attacking. The side is inferred from where the player
//! stood at kick-off: the average longitude of the first few samples is
//! compared with the midline of the whole track.

use log::info;
use serde::{Deserialize, Serialize};

use crate::GeoPoint;

/// Half of the pitch the player started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "lowercase")]
pub enum GameSide {
    Left,
    Right,
}

impl Default for GameSide {
    fn default() -> Self {
        GameSide::Left
    }
}

impl GameSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameSide::Left => "left",
            GameSide::Right => "right",
        }
    }
}

impl std::fmt::Display for GameSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the starting side from time-ordered samples.
///
/// Averages the longitude of the first `samples` points and compares it with
/// the midpoint of the track's longitude range. West of the midline is
/// [`GameSide::Left`]. No points (or `samples == 0`) defaults to `Left`.
pub fn detect_game_side(points: &[GeoPoint], samples: usize) -> GameSide {
    let valid: Vec<&GeoPoint> = points.iter().filter(|p| p.is_valid()).collect();
    if valid.is_empty() || samples == 0 {
        info!("[Side] No GPS points, defaulting to left");
        return GameSide::Left;
    }

    let (min_lng, max_lng) = valid.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
        (lo.min(p.longitude), hi.max(p.longitude))
    });
    let mid_lng = (min_lng + max_lng) / 2.0;

    let initial = &valid[..valid.len().min(samples)];
    let avg_lng = initial.iter().map(|p| p.longitude).sum::<f64>() / initial.len() as f64;

    let side = if avg_lng < mid_lng {
        GameSide::Left
    } else {
        GameSide::Right
    };
    info!(
        "[Side] Detected {} (midline {:.6}, opening average {:.6})",
        side, mid_lng, avg_lng
    );
    side
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(longitudes: &[f64]) -> Vec<GeoPoint> {
        longitudes.iter().map(|&lng| GeoPoint::new(37.0, lng)).collect()
    }

    #[test]
    fn test_empty_defaults_left() {
        assert_eq!(detect_game_side(&[], 10), GameSide::Left);
        assert_eq!(detect_game_side(&track(&[1.0, 2.0]), 0), GameSide::Left);
    }

    #[test]
    fn test_starts_west_is_left() {
        let mut lngs = vec![0.0; 10];
        lngs.extend(std::iter::repeat(10.0).take(50));
        assert_eq!(detect_game_side(&track(&lngs), 10), GameSide::Left);
    }

    #[test]
    fn test_starts_east_is_right() {
        let mut lngs = vec![9.0; 10];
        lngs.extend(std::iter::repeat(0.0).take(50));
        assert_eq!(detect_game_side(&track(&lngs), 10), GameSide::Right);
    }

    #[test]
    fn test_only_leading_samples_count() {
        // First 3 points east, the rest hover west
        let lngs = [10.0, 10.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(detect_game_side(&track(&lngs), 3), GameSide::Right);
        assert_eq!(detect_game_side(&track(&lngs), 8), GameSide::Left);
    }

    #[test]
    fn test_on_midline_is_right() {
        assert_eq!(detect_game_side(&track(&[5.0]), 10), GameSide::Right);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&GameSide::Left).unwrap(), "\"left\"");
        assert_eq!(
            serde_json::from_str::<GameSide>("\"right\"").unwrap(),
            GameSide::Right
        );
    }
}

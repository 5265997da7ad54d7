//! Quarter report assembly.
//!
//! A match is logged as one exercise segment per quarter. Each segment is
//! turned into a [`QuarterReport`]: workout totals converted to display
//! units, the starting side, and the field heatmap. Reports are later
//! numbered by the player and sent to the match report endpoint as a
//! [`MatchReportRequest`].
//!
//! Segments come from an [`ExerciseDataSource`]; the pipeline does not care
//! whether they were read from a health SDK, a file, or a test fixture.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::calibration::FieldCorners;
use crate::error::{OptionExt, Result};
use crate::heatmap::{compute_heatmap, HeatmapStatus};
use crate::intensity::IntensityGrid;
use crate::side::{detect_game_side, GameSide};
use crate::{GeoPoint, GridDimensions, HeatmapConfig};

const METERS_PER_KM: f64 = 1000.0;
const MPS_TO_KMH: f64 = 3.6;

/// One recorded exercise segment (usually a quarter) in SI units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSegment {
    pub id: String,
    /// Calendar date, e.g. "2025-05-17"
    pub date: String,
    /// Wall clock start, e.g. "19:00"
    pub start_time: String,
    pub end_time: String,
    /// Meters
    pub distance_m: f64,
    /// Meters per second
    pub avg_speed_mps: f64,
    pub max_speed_mps: f64,
    /// Kilocalories
    pub calories: f64,
    pub sprint_count: u32,
    pub avg_heart_rate: u32,
    pub max_heart_rate: u32,
    /// Time-ordered GPS samples
    pub gps_points: Vec<GeoPoint>,
}

/// Supplies recorded segments to the report builder.
pub trait ExerciseDataSource {
    fn segments(&self) -> Result<Vec<ExerciseSegment>>;
}

impl ExerciseDataSource for Vec<ExerciseSegment> {
    fn segments(&self) -> Result<Vec<ExerciseSegment>> {
        Ok(self.clone())
    }
}

/// Per-quarter statistics in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReportData {
    pub start_time: String,
    pub end_time: String,
    /// Kilometers
    pub distance: f64,
    /// Kilometers per hour
    pub avg_speed: f64,
    pub max_speed: f64,
    pub calories: i32,
    pub sprint: u32,
    pub avg_heart_rate: u32,
    pub max_heart_rate: u32,
    pub heatmap: IntensityGrid,
}

/// A quarter report awaiting numbering by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterReport {
    pub id: String,
    pub date: String,
    pub quarter_number: Option<u32>,
    pub game_side: GameSide,
    pub game_report_data: GameReportData,
    /// How the heatmap was produced; not sent to the server
    #[serde(skip)]
    pub heatmap_status: Option<HeatmapStatus>,
}

impl QuarterReport {
    /// Set the quarter number and side chosen by the player.
    pub fn assign(&mut self, quarter_number: u32, game_side: GameSide) {
        self.quarter_number = Some(quarter_number);
        self.game_side = game_side;
    }
}

/// Build the report for one segment.
pub fn build_quarter_report(
    segment: &ExerciseSegment,
    corners: &FieldCorners,
    config: &HeatmapConfig,
) -> QuarterReport {
    let mut ordered = segment.gps_points.clone();
    ordered.sort_by_key(|p| p.timestamp_millis);

    let game_side = detect_game_side(&ordered, config.side_detection_samples as usize);
    let heatmap = compute_heatmap(&ordered, Some(corners), config);
    if heatmap.status != HeatmapStatus::Computed {
        warn!(
            "[Report] Segment {} heatmap not computed: {:?}",
            segment.id, heatmap.status
        );
    }

    QuarterReport {
        id: segment.id.clone(),
        date: segment.date.clone(),
        quarter_number: None,
        game_side,
        game_report_data: GameReportData {
            start_time: segment.start_time.clone(),
            end_time: segment.end_time.clone(),
            distance: segment.distance_m / METERS_PER_KM,
            avg_speed: segment.avg_speed_mps * MPS_TO_KMH,
            max_speed: segment.max_speed_mps * MPS_TO_KMH,
            calories: segment.calories as i32,
            sprint: segment.sprint_count,
            avg_heart_rate: segment.avg_heart_rate,
            max_heart_rate: segment.max_heart_rate,
            heatmap: heatmap.grid,
        },
        heatmap_status: Some(heatmap.status),
    }
}

/// Build reports for every segment not yet used in a match report.
///
/// Fails with [`MissingCalibration`](crate::HeatmapError::MissingCalibration)
/// when there are segments to report but no field has been calibrated.
pub fn build_quarter_reports(
    source: &dyn ExerciseDataSource,
    used_ids: &[String],
    corners: Option<&FieldCorners>,
    config: &HeatmapConfig,
) -> Result<Vec<QuarterReport>> {
    config.validate()?;
    let segments: Vec<ExerciseSegment> = source
        .segments()?
        .into_iter()
        .filter(|s| !used_ids.contains(&s.id))
        .collect();
    debug!("[Report] {} unused segments", segments.len());

    if segments.is_empty() {
        info!("[Report] No new exercise segments to report");
        return Ok(Vec::new());
    }
    let corners = corners
        .ok_or_missing_calibration()
        .inspect_err(|_| warn!("[Report] Field calibration missing, cannot build reports"))?;

    #[cfg(feature = "parallel")]
    let reports: Vec<QuarterReport> = segments
        .par_iter()
        .map(|s| build_quarter_report(s, corners, config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let reports: Vec<QuarterReport> = segments
        .iter()
        .map(|s| build_quarter_report(s, corners, config))
        .collect();

    info!("[Report] Built {} quarter reports", reports.len());
    Ok(reports)
}

/// Heatmap of the report with `id`, or a zero grid of the shape the reports
/// were built with.
pub fn find_heatmap(reports: &[QuarterReport], id: &str, dims: GridDimensions) -> IntensityGrid {
    reports
        .iter()
        .find(|r| r.id == id)
        .map(|r| r.game_report_data.heatmap.clone())
        .unwrap_or_else(|| IntensityGrid::zeros(dims))
}

/// One quarter inside a match report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReportData {
    pub quarter_number: Option<u32>,
    pub game_side: GameSide,
    pub game_report_data: GameReportData,
}

/// Body of the match report upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReportRequest {
    pub match_id: i64,
    pub report_data_list: Vec<MatchReportData>,
}

impl MatchReportRequest {
    pub fn from_quarters(match_id: i64, reports: &[QuarterReport]) -> Self {
        Self {
            match_id,
            report_data_list: reports
                .iter()
                .map(|r| MatchReportData {
                    quarter_number: r.quarter_number,
                    game_side: r.game_side,
                    game_report_data: r.game_report_data.clone(),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeatmapError;

    fn square_field() -> FieldCorners {
        FieldCorners::from_points(&[
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(10.0, 0.0),
        ])
        .unwrap()
    }

    fn segment(id: &str) -> ExerciseSegment {
        ExerciseSegment {
            id: id.to_string(),
            date: "2025-05-17".to_string(),
            start_time: "19:00".to_string(),
            end_time: "19:25".to_string(),
            distance_m: 2500.0,
            avg_speed_mps: 2.0,
            max_speed_mps: 7.5,
            calories: 210.9,
            sprint_count: 6,
            avg_heart_rate: 142,
            max_heart_rate: 181,
            gps_points: (0..20)
                .map(|i| GeoPoint::with_timestamp(2.0 + (i % 5) as f64, 1.0 + (i % 3) as f64, i))
                .collect(),
        }
    }

    #[test]
    fn test_unit_conversion() {
        let report = build_quarter_report(&segment("q1"), &square_field(), &HeatmapConfig::default());
        let data = &report.game_report_data;
        assert!((data.distance - 2.5).abs() < 1e-9);
        assert!((data.avg_speed - 7.2).abs() < 1e-9);
        assert!((data.max_speed - 27.0).abs() < 1e-9);
        assert_eq!(data.calories, 210);
        assert_eq!(data.sprint, 6);
        assert_eq!(report.quarter_number, None);
        assert_eq!(report.heatmap_status, Some(HeatmapStatus::Computed));
        assert!(!data.heatmap.is_empty());
    }

    #[test]
    fn test_side_uses_time_order() {
        let mut seg = segment("q1");
        // Listed east-first, but the western samples happened first
        seg.gps_points = (0..20)
            .map(|i| {
                let lng = if i < 10 { 9.0 } else { 1.0 };
                GeoPoint::with_timestamp(5.0, lng, 100 - i)
            })
            .collect();
        let report = build_quarter_report(&seg, &square_field(), &HeatmapConfig::default());
        assert_eq!(report.game_side, GameSide::Left);
    }

    #[test]
    fn test_used_segments_are_skipped() {
        let source = vec![segment("q1"), segment("q2"), segment("q3")];
        let reports = build_quarter_reports(
            &source,
            &["q2".to_string()],
            Some(&square_field()),
            &HeatmapConfig::default(),
        )
        .unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
    }

    #[test]
    fn test_missing_calibration_fails_batch() {
        let source = vec![segment("q1")];
        let result = build_quarter_reports(&source, &[], None, &HeatmapConfig::default());
        assert!(matches!(result, Err(HeatmapError::MissingCalibration)));

        // Nothing to report is fine even without a field
        let empty: Vec<ExerciseSegment> = Vec::new();
        let result = build_quarter_reports(&empty, &[], None, &HeatmapConfig::default());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_find_heatmap_falls_back_to_zero_grid() {
        let report = build_quarter_report(&segment("q1"), &square_field(), &HeatmapConfig::default());
        let reports = vec![report.clone()];
        let dims = GridDimensions::CANONICAL;
        assert_eq!(find_heatmap(&reports, "q1", dims), report.game_report_data.heatmap);

        let missing = find_heatmap(&reports, "nope", dims);
        assert_eq!(missing.rows(), 10);
        assert_eq!(missing.cols(), 16);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_find_heatmap_keeps_configured_shape() {
        let config = HeatmapConfig {
            dimensions: GridDimensions::new(10, 10),
            ..HeatmapConfig::default()
        };
        let reports =
            build_quarter_reports(&vec![segment("q1")], &[], Some(&square_field()), &config).unwrap();

        let found = find_heatmap(&reports, "q1", config.dimensions);
        let missing = find_heatmap(&reports, "nope", config.dimensions);
        assert_eq!(found.dimensions(), GridDimensions::new(10, 10));
        assert_eq!(missing.dimensions(), found.dimensions());
    }

    #[test]
    fn test_request_payload() {
        let mut report =
            build_quarter_report(&segment("q1"), &square_field(), &HeatmapConfig::default());
        report.assign(2, GameSide::Right);

        let request = MatchReportRequest::from_quarters(77, &[report]);
        let json: serde_json::Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();

        assert_eq!(json["matchId"], 77);
        let quarter = &json["reportDataList"][0];
        assert_eq!(quarter["quarterNumber"], 2);
        assert_eq!(quarter["gameSide"], "right");
        assert_eq!(quarter["gameReportData"]["startTime"], "19:00");
        assert_eq!(quarter["gameReportData"]["avgHeartRate"], 142);

        let heatmap = quarter["gameReportData"]["heatmap"].as_array().unwrap();
        assert_eq!(heatmap.len(), 10);
        assert!(heatmap.iter().all(|row| row.as_array().unwrap().len() == 16));
        assert!(quarter.get("heatmapStatus").is_none());
    }
}

//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose Rust functionality
//! to Kotlin and Swift. Stateless algorithms are prefixed with `ffi_`;
//! calibration functions share one process-wide session and are prefixed
//! with `calibration_`.

use std::sync::Mutex;

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::calibration::{
    CalibrationListener, CaptureProgress, CornerCapture, CornerStore, FieldCorners,
    FileCornerStore,
};
use crate::persistence::SqliteCornerStore;
use crate::{
    build_quarter_reports, compute_heatmap, detect_game_side, init_logging, point_in_field,
    ExerciseSegment, GameSide, GeoPoint, HeatmapConfig, HeatmapStats, HeatmapStatus,
};

// ============================================================================
// Callback Interface
// ============================================================================

/// Callback interface for the calibration completion signal.
/// Implement this in Kotlin/Swift to vibrate and sync the corners.
#[uniffi::export(callback_interface)]
pub trait CalibrationCallback: Send + Sync {
    /// Called once the fourth corner has been saved.
    fn on_calibrated(&self, corners: Vec<GeoPoint>);
}

struct CallbackListener(Box<dyn CalibrationCallback>);

impl CalibrationListener for CallbackListener {
    fn on_calibrated(&self, corners: &FieldCorners) {
        self.0.on_calibrated(corners.points().to_vec());
    }
}

// ============================================================================
// Calibration Session Singleton
// ============================================================================

/// Store plus in-progress capture, shared by all calibration calls.
pub struct CalibrationSession {
    store: Box<dyn CornerStore + Send + Sync>,
    capture: CornerCapture,
    listener: Option<CallbackListener>,
}

/// Global calibration session.
///
/// This singleton lets the watch UI record corners one tap at a time
/// without holding Rust state on the Kotlin side.
pub static CALIBRATION: Lazy<Mutex<Option<CalibrationSession>>> = Lazy::new(|| Mutex::new(None));

/// Get a lock on the global calibration session.
pub fn with_calibration<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut CalibrationSession) -> R,
{
    let mut guard = CALIBRATION.lock().ok()?;
    guard.as_mut().map(f)
}

/// Progress of the calibration session, as seen by the UI.
#[derive(Debug, Clone, uniffi::Record)]
pub struct CaptureState {
    pub recorded: u32,
    pub remaining: u32,
    pub complete: bool,
    /// Set when the last call failed
    pub error: Option<String>,
}

impl CaptureState {
    fn of(capture: &CornerCapture, error: Option<String>) -> Self {
        Self {
            recorded: capture.count() as u32,
            remaining: capture.remaining() as u32,
            complete: capture.is_complete(),
            error,
        }
    }
}

/// Initialize the calibration session.
///
/// Paths ending in `.db` use SQLite, anything else a JSON file.
#[uniffi::export]
pub fn calibration_init(store_path: String) -> bool {
    init_logging();
    info!("[Calibration] Initializing with store: {}", store_path);

    let store: Box<dyn CornerStore + Send + Sync> = if store_path.ends_with(".db") {
        match SqliteCornerStore::new(&store_path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!("[Calibration] Failed to open calibration database: {}", e);
                return false;
            }
        }
    } else {
        Box::new(FileCornerStore::new(store_path))
    };

    match CALIBRATION.lock() {
        Ok(mut guard) => {
            *guard = Some(CalibrationSession {
                store,
                capture: CornerCapture::new(),
                listener: None,
            });
            true
        }
        Err(_) => false,
    }
}

/// Register the completion callback.
#[uniffi::export]
pub fn calibration_set_callback(callback: Box<dyn CalibrationCallback>) {
    with_calibration(|s| s.listener = Some(CallbackListener(callback)));
}

/// Record the next corner. The fourth corner is saved automatically.
#[uniffi::export]
pub fn calibration_record_corner(point: GeoPoint) -> CaptureState {
    init_logging();
    with_calibration(|s| {
        let listener = s.listener.as_ref().map(|l| l as &dyn CalibrationListener);
        match s
            .capture
            .record_corner_and_persist(point, s.store.as_ref(), listener)
        {
            Ok(CaptureProgress::Completed(_)) => {
                info!("[Calibration] Field calibration complete");
                CaptureState::of(&s.capture, None)
            }
            Ok(CaptureProgress::Recorded { .. }) => CaptureState::of(&s.capture, None),
            Err(e) => CaptureState::of(&s.capture, Some(e.to_string())),
        }
    })
    .unwrap_or_else(|| CaptureState {
        recorded: 0,
        remaining: 4,
        complete: false,
        error: Some("calibration not initialized".to_string()),
    })
}

/// Start a new capture, keeping the stored calibration.
#[uniffi::export]
pub fn calibration_reset_session() {
    with_calibration(|s| s.capture = CornerCapture::new());
}

/// Save four corners received from the watch.
#[uniffi::export]
pub fn calibration_save_corners(corners: Vec<GeoPoint>, captured_at_millis: i64) -> bool {
    init_logging();
    let corners = match FieldCorners::from_points(&corners) {
        Ok(c) => c.with_captured_at(captured_at_millis),
        Err(e) => {
            warn!("[Calibration] Rejected corners: {}", e);
            return false;
        }
    };
    with_calibration(|s| s.store.persist(&corners))
        .map(|r| r.map_err(|e| warn!("[Calibration] Save failed: {}", e)).is_ok())
        .unwrap_or(false)
}

/// Stored corners, empty if the field was never calibrated.
#[uniffi::export]
pub fn calibration_load_corners() -> Vec<GeoPoint> {
    stored_corners()
        .map(|c| c.points().to_vec())
        .unwrap_or_default()
}

/// Forget the stored calibration.
#[uniffi::export]
pub fn calibration_clear() -> bool {
    with_calibration(|s| {
        s.capture = CornerCapture::new();
        s.store.clear().is_ok()
    })
    .unwrap_or(false)
}

fn stored_corners() -> Option<FieldCorners> {
    with_calibration(|s| s.store.load())?
        .map_err(|e| warn!("[Calibration] Load failed: {}", e))
        .ok()
        .flatten()
}

// ============================================================================
// Heatmap Functions
// ============================================================================

/// Heatmap computation result for mobile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHeatmap {
    /// Row-major nested rows, values 0-10
    pub grid: Vec<Vec<u8>>,
    pub status: HeatmapStatus,
    pub stats: HeatmapStats,
}

/// Compute a heatmap against the given corners (empty = not calibrated).
#[uniffi::export]
pub fn ffi_compute_heatmap(
    points: Vec<GeoPoint>,
    corners: Vec<GeoPoint>,
    config: Option<HeatmapConfig>,
) -> FfiHeatmap {
    init_logging();
    let corners = if corners.is_empty() {
        None
    } else {
        FieldCorners::from_points(&corners)
            .map_err(|e| warn!("[Heatmap] Ignoring corners: {}", e))
            .ok()
    };
    heatmap_for(&points, corners.as_ref(), config)
}

/// Compute a heatmap against the stored calibration.
#[uniffi::export]
pub fn ffi_compute_heatmap_stored_field(
    points: Vec<GeoPoint>,
    config: Option<HeatmapConfig>,
) -> FfiHeatmap {
    init_logging();
    let corners = stored_corners();
    heatmap_for(&points, corners.as_ref(), config)
}

fn heatmap_for(
    points: &[GeoPoint],
    corners: Option<&FieldCorners>,
    config: Option<HeatmapConfig>,
) -> FfiHeatmap {
    let config = config
        .filter(|c| c.validate().is_ok())
        .unwrap_or_default();
    let result = compute_heatmap(points, corners, &config);
    FfiHeatmap {
        grid: result.grid.to_nested(),
        status: result.status,
        stats: result.stats,
    }
}

/// Test whether a point lies inside four corners.
#[uniffi::export]
pub fn ffi_point_in_field(point: GeoPoint, corners: Vec<GeoPoint>) -> bool {
    FieldCorners::from_points(&corners)
        .map(|c| point_in_field(&point, &c))
        .unwrap_or(false)
}

/// Detect the starting side from time-ordered points.
#[uniffi::export]
pub fn ffi_detect_game_side(points: Vec<GeoPoint>, samples: u32) -> GameSide {
    detect_game_side(&points, samples as usize)
}

/// Build quarter reports against the stored calibration.
///
/// Returns the reports as JSON, or `"[]"` if none could be built.
#[uniffi::export]
pub fn ffi_build_quarter_reports_json(
    segments: Vec<ExerciseSegment>,
    used_ids: Vec<String>,
) -> String {
    init_logging();
    let corners = stored_corners();
    match build_quarter_reports(&segments, &used_ids, corners.as_ref(), &HeatmapConfig::default()) {
        Ok(reports) => serde_json::to_string(&reports).unwrap_or_else(|_| "[]".to_string()),
        Err(e) => {
            warn!("[Report] Failed to build quarter reports: {}", e);
            "[]".to_string()
        }
    }
}

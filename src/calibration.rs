//! # Field Calibration
//!
//! Captures the four corners of a pitch, in the order the player walks them,
//! and stores them so later matches on the same installation can reuse them.
//!
//! ## Capture flow
//!
//! 1. The watch records one position per corner via [`CornerCapture::record_corner`]
//! 2. The fourth corner completes the session and yields [`FieldCorners`]
//! 3. The corners are written to a [`CornerStore`], overwriting any earlier field
//! 4. A [`CalibrationListener`] is notified (vibration, toast, data sync)
//!
//! Corner order is kept as captured. Winding and convexity are not checked,
//! see [`FieldCorners::shape`](crate::geofence) for diagnostics.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{HeatmapError, Result};
use crate::{FieldBounds, GeoPoint};

/// Number of corners that define a field.
pub const CORNER_COUNT: usize = 4;

const CORNER_LABELS: [&str; CORNER_COUNT] = ["first", "second", "third", "fourth"];

// ============================================================================
// Field Corners
// ============================================================================

/// The four calibrated corners of a pitch, in capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCorners {
    corners: [GeoPoint; CORNER_COUNT],
    /// When the calibration finished (Unix millis)
    pub captured_at_millis: i64,
}

impl FieldCorners {
    /// Build corners from exactly four points.
    ///
    /// The capture time is taken from the last point. Duplicate or collinear
    /// corners are accepted; the pipeline treats such fields as degenerate.
    pub fn from_points(points: &[GeoPoint]) -> Result<Self> {
        let corners: [GeoPoint; CORNER_COUNT] = points
            .try_into()
            .map_err(|_| HeatmapError::InvalidCornerCount {
                count: points.len(),
            })?;
        let captured_at_millis = corners[CORNER_COUNT - 1].timestamp_millis;
        Ok(Self {
            corners,
            captured_at_millis,
        })
    }

    /// Override the capture time.
    pub fn with_captured_at(mut self, captured_at_millis: i64) -> Self {
        self.captured_at_millis = captured_at_millis;
        self
    }

    pub fn points(&self) -> &[GeoPoint; CORNER_COUNT] {
        &self.corners
    }

    /// Bounding box of the four corners.
    pub fn bounds(&self) -> FieldBounds {
        FieldBounds::enclosing(self.points())
    }
}

// ============================================================================
// Capture Session
// ============================================================================

/// Progress after recording a corner.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureProgress {
    /// Corner stored, more are needed. `count` is 1..=3.
    Recorded { count: usize },
    /// The fourth corner was recorded.
    Completed(FieldCorners),
}

/// Receives the calibration completion signal.
///
/// Hosts use this for haptic feedback and to forward the corners to the phone.
pub trait CalibrationListener: Send + Sync {
    fn on_calibrated(&self, corners: &FieldCorners);
}

/// An in-progress corner capture. Terminal once four corners are recorded.
#[derive(Debug, Clone, Default)]
pub struct CornerCapture {
    recorded: Vec<GeoPoint>,
    completed: Option<FieldCorners>,
}

impl CornerCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next corner.
    ///
    /// Invalid coordinates are rejected and do not count towards the four.
    pub fn record_corner(&mut self, point: GeoPoint) -> Result<CaptureProgress> {
        if self.completed.is_some() {
            return Err(HeatmapError::CalibrationAlreadyComplete);
        }
        if !point.is_valid() {
            return Err(HeatmapError::InvalidCoordinates {
                message: format!(
                    "corner ({}, {}) is outside WGS84 range",
                    point.latitude, point.longitude
                ),
            });
        }

        self.recorded.push(point);
        debug!(
            "[Calibration] Recorded corner {}/{}: ({}, {})",
            self.recorded.len(),
            CORNER_COUNT,
            point.latitude,
            point.longitude
        );

        if self.recorded.len() < CORNER_COUNT {
            return Ok(CaptureProgress::Recorded {
                count: self.recorded.len(),
            });
        }

        let corners = FieldCorners::from_points(&self.recorded)?;
        self.completed = Some(corners.clone());
        Ok(CaptureProgress::Completed(corners))
    }

    /// Record a corner and, on the fourth, persist and notify.
    ///
    /// If the store rejects the write the fourth corner is discarded so the
    /// player can measure it again.
    pub fn record_corner_and_persist(
        &mut self,
        point: GeoPoint,
        store: &dyn CornerStore,
        listener: Option<&dyn CalibrationListener>,
    ) -> Result<CaptureProgress> {
        let corners = match self.record_corner(point)? {
            CaptureProgress::Completed(corners) => corners,
            recorded => return Ok(recorded),
        };

        if let Err(e) = store.persist(&corners) {
            warn!("[Calibration] Failed to save field corners: {}", e);
            self.recorded.pop();
            self.completed = None;
            return Err(e);
        }

        info!("[Calibration] Field corners saved: {}", describe_corners(&corners));
        if let Some(listener) = listener {
            listener.on_calibrated(&corners);
        }
        Ok(CaptureProgress::Completed(corners))
    }

    /// Number of corners recorded so far.
    pub fn count(&self) -> usize {
        self.recorded.len()
    }

    pub fn remaining(&self) -> usize {
        CORNER_COUNT - self.recorded.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.is_some()
    }

    /// Display label for the next corner ("first" .. "fourth").
    pub fn next_corner_label(&self) -> Option<&'static str> {
        CORNER_LABELS.get(self.recorded.len()).copied()
    }

    pub fn corners(&self) -> Option<&FieldCorners> {
        self.completed.as_ref()
    }
}

fn describe_corners(corners: &FieldCorners) -> String {
    corners
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}=({}, {})", i + 1, p.latitude, p.longitude))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Storage
// ============================================================================

/// Durable storage for the single active field calibration.
pub trait CornerStore {
    /// Store corners, replacing any earlier calibration.
    fn persist(&self, corners: &FieldCorners) -> Result<()>;

    /// Load the active calibration, `None` if the field was never captured.
    fn load(&self) -> Result<Option<FieldCorners>>;

    /// Forget the active calibration.
    fn clear(&self) -> Result<()>;
}

/// Keeps the calibration in memory only.
#[derive(Debug, Default)]
pub struct InMemoryCornerStore {
    corners: Mutex<Option<FieldCorners>>,
}

impl InMemoryCornerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<FieldCorners>>> {
        self.corners.lock().map_err(|_| HeatmapError::Persistence {
            message: "in-memory corner store lock poisoned".to_string(),
        })
    }
}

impl CornerStore for InMemoryCornerStore {
    fn persist(&self, corners: &FieldCorners) -> Result<()> {
        *self.lock()? = Some(corners.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<FieldCorners>> {
        Ok(self.lock()?.clone())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Stores the calibration as a JSON document.
///
/// ```text
/// {"corners":[{"latitude":37.5665,"longitude":126.978,"timestampMillis":0}, ...],
///  "capturedAtMillis":1700000000000}
/// ```
///
/// A missing or blank file means the field was never calibrated.
#[derive(Debug, Clone)]
pub struct FileCornerStore {
    path: PathBuf,
}

impl FileCornerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(content: &str) -> Result<Option<FieldCorners>> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(content)
            .map(Some)
            .map_err(|e| HeatmapError::CorruptCalibration {
                message: e.to_string(),
            })
    }
}

impl CornerStore for FileCornerStore {
    fn persist(&self, corners: &FieldCorners) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(corners)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("[CornerStore] Wrote {}", self.path.display());
        Ok(())
    }

    fn load(&self) -> Result<Option<FieldCorners>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode(&content)
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

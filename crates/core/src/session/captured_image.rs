use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::shared::constants::SESSION_ID_FORMAT;

/// Per-image detection counts recorded alongside a session image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DetectionCounts {
    pub faces: usize,
    pub reading_materials: usize,
}

/// One image written during a session. Append-only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CapturedImage {
    pub filename: PathBuf,
    /// Unix seconds with sub-second precision.
    pub timestamp: f64,
    /// `YYYYMMDD_HHMMSS_mmm` label.
    pub datetime: String,
    pub session_id: String,
    pub detections: DetectionCounts,
}

impl CapturedImage {
    pub fn new(
        filename: PathBuf,
        captured_at: &DateTime<Local>,
        session_id: &str,
        detections: DetectionCounts,
    ) -> Self {
        Self {
            filename,
            timestamp: unix_seconds(captured_at),
            datetime: datetime_label(captured_at),
            session_id: session_id.to_string(),
            detections,
        }
    }
}

/// File name for a session image captured at `t`: `YYYYMMDD_HHMMSS_mmm.jpg`.
pub fn session_image_name(t: &DateTime<Local>) -> String {
    format!("{}.jpg", datetime_label(t))
}

pub fn datetime_label(t: &DateTime<Local>) -> String {
    format!("{}_{}", t.format(SESSION_ID_FORMAT), t.format("%3f"))
}

pub fn unix_seconds(t: &DateTime<Local>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_micros()) / 1_000_000.0
}

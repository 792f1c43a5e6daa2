use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_CAPTURE_INTERVAL, DEFAULT_READ_BACKOFF, DEFAULT_STOP_TIMEOUT, FACE_MODEL_NAME,
    MATERIAL_MODEL_NAME,
};

/// Configuration consumed by the pipeline.
///
/// The core only reads these values; loading and validating them is the
/// caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device index ("0") or device path ("/dev/video2").
    pub device: String,
    pub capture_interval_secs: f64,
    /// JPEG quality, 1-100.
    pub image_quality: u8,
    pub image_dir: PathBuf,
    pub image_width: u32,
    pub image_height: u32,
    pub models_dir: PathBuf,
    pub face_model_file: String,
    pub material_model_file: String,
    pub face_detection_enabled: bool,
    pub material_detection_enabled: bool,
    pub detection_confidence: f64,
    /// Percentage of frame width under which a material counts as centered.
    pub center_threshold_percent: u32,
    pub stop_timeout_secs: f64,
    pub read_backoff_ms: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            capture_interval_secs: DEFAULT_CAPTURE_INTERVAL.as_secs_f64(),
            image_quality: 95,
            image_dir: PathBuf::from("logs/camera_captures"),
            image_width: 640,
            image_height: 480,
            models_dir: PathBuf::from("models/cv"),
            face_model_file: FACE_MODEL_NAME.to_string(),
            material_model_file: MATERIAL_MODEL_NAME.to_string(),
            face_detection_enabled: true,
            material_detection_enabled: true,
            detection_confidence: 0.5,
            center_threshold_percent: 15,
            stop_timeout_secs: DEFAULT_STOP_TIMEOUT.as_secs_f64(),
            read_backoff_ms: DEFAULT_READ_BACKOFF.as_millis() as u64,
        }
    }
}

impl CameraSettings {
    /// Negative values clamp to zero. Values that are not finite fall back
    /// to the default interval.
    pub fn capture_interval(&self) -> Duration {
        seconds_or(self.capture_interval_secs, DEFAULT_CAPTURE_INTERVAL, "capture_interval_secs")
    }

    pub fn stop_timeout(&self) -> Duration {
        seconds_or(self.stop_timeout_secs, DEFAULT_STOP_TIMEOUT, "stop_timeout_secs")
    }

    pub fn read_backoff(&self) -> Duration {
        Duration::from_millis(self.read_backoff_ms)
    }

    pub fn face_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.face_model_file)
    }

    pub fn material_model_path(&self) -> PathBuf {
        self.models_dir.join(&self.material_model_file)
    }
}

fn seconds_or(secs: f64, fallback: Duration, field: &str) -> Duration {
    // `f64::max` would turn NaN into zero; compare instead.
    let clamped = if secs < 0.0 { 0.0 } else { secs };
    Duration::try_from_secs_f64(clamped).unwrap_or_else(|e| {
        log::warn!("Invalid {field} ({secs}): {e}; using {:.1}s", fallback.as_secs_f64());
        fallback
    })
}

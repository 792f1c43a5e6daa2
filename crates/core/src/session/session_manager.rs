//! Session recording state machine.
//!
//! `SessionState` lives inside the pipeline's shared state and is only
//! mutated under that lock. Every activation bumps an epoch; the processing
//! tick records images against the epoch it saw when the tick began, so an
//! image from an ended (or replaced) session is never appended to the next.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::detection::domain::detector::DetectionStatus;
use crate::shared::constants::{SESSION_ID_FORMAT, SESSION_SUMMARY_FILE_NAME};
use crate::shared::error::CameraError;

use super::captured_image::CapturedImage;

#[derive(Debug, Default)]
pub struct SessionState {
    active: bool,
    id: Option<String>,
    dir: Option<PathBuf>,
    images: Vec<CapturedImage>,
    epoch: u64,
}

/// Copy of the current or most recent session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub session_dir: Option<PathBuf>,
    pub images: Vec<CapturedImage>,
}

/// Where the processing tick should record, captured at tick start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordingTarget {
    pub session_id: String,
    pub dir: PathBuf,
    pub epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn session_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Makes `id` the active session and clears the image list.
    ///
    /// Returns the new epoch, which `rollback` needs.
    pub fn activate(&mut self, id: String, dir: PathBuf) -> Result<u64, CameraError> {
        if self.active {
            return Err(CameraError::AlreadyActive);
        }
        self.epoch += 1;
        self.active = true;
        self.id = Some(id);
        self.dir = Some(dir);
        self.images.clear();
        Ok(self.epoch)
    }

    /// Deactivates the session started at `epoch`, if it is still the
    /// active one. Used when the camera fails to start after activation.
    pub fn rollback(&mut self, epoch: u64) {
        if self.active && self.epoch == epoch {
            self.active = false;
        }
    }

    /// Ends the active session and returns its snapshot.
    pub fn deactivate(&mut self) -> Result<SessionSnapshot, CameraError> {
        if !self.active {
            return Err(CameraError::NoActiveSession);
        }
        self.active = false;
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            session_dir: self.dir.clone(),
            images: self.images.clone(),
        }
    }

    pub fn recording_target(&self) -> Option<RecordingTarget> {
        if !self.active {
            return None;
        }
        Some(RecordingTarget {
            session_id: self.id.clone()?,
            dir: self.dir.clone()?,
            epoch: self.epoch,
        })
    }

    /// Appends `image` if the session from `epoch` is still active.
    pub fn record(&mut self, epoch: u64, image: CapturedImage) -> bool {
        if self.active && self.epoch == epoch {
            self.images.push(image);
            true
        } else {
            false
        }
    }
}

pub fn default_session_id(now: &DateTime<Local>) -> String {
    now.format(SESSION_ID_FORMAT).to_string()
}

/// Rejects ids that would escape the image directory.
pub fn validate_session_id(id: &str) -> Result<(), CameraError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CameraError::InvalidParameter("session_id is empty".into()));
    }
    if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
        return Err(CameraError::InvalidParameter(format!(
            "session_id '{id}' is not a plain directory name"
        )));
    }
    Ok(())
}

/// Creates `{image_dir}/{id}`. Existing directories are reused.
pub fn create_session_dir(image_dir: &Path, id: &str) -> Result<PathBuf, CameraError> {
    let dir = image_dir.join(id);
    std::fs::create_dir_all(&dir).map_err(|source| CameraError::DirectoryError {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Writes `session_info.txt` into the session directory.
pub fn write_summary(
    snapshot: &SessionSnapshot,
    status: &DetectionStatus,
    now: &DateTime<Local>,
) -> Result<PathBuf, CameraError> {
    let (Some(id), Some(dir)) = (&snapshot.session_id, &snapshot.session_dir) else {
        return Err(CameraError::NoActiveSession);
    };
    let path = dir.join(SESSION_SUMMARY_FILE_NAME);
    let text = render_summary(id, &snapshot.images, status, now);
    std::fs::write(&path, text).map_err(|e| CameraError::IoWriteFailure {
        path: path.clone(),
        message: e.to_string(),
    })?;
    log::info!("Created session summary at {}", path.display());
    Ok(path)
}

fn render_summary(
    id: &str,
    images: &[CapturedImage],
    status: &DetectionStatus,
    now: &DateTime<Local>,
) -> String {
    let enabled = |on: bool| if on { "Enabled" } else { "Disabled" };
    let material = &status.reading_material_detection;

    let mut out = String::new();
    let _ = writeln!(out, "Session ID: {id}");
    let _ = writeln!(out, "Recorded on: {}", now.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Total images: {}", images.len());
    out.push('\n');
    out.push_str("Detection Models:\n");
    let _ = writeln!(out, "  Face Detection: {}", enabled(status.face_detection.enabled));
    let _ = writeln!(out, "  Reading Material Detection: {}", enabled(material.enabled));
    if let (true, Some(model_type)) = (material.enabled, &material.model_type) {
        let _ = writeln!(out, "  Model Type: {}", model_type.to_uppercase());
    }
    out.push('\n');

    for (i, image) in images.iter().enumerate() {
        let name = image
            .filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "Image {}: {name} - {}", i + 1, image.datetime);
    }
    out
}

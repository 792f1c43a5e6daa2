use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use serde::Serialize;

use crate::capture::acquisition_loop::{AcquisitionLoop, DeviceFactory};
use crate::capture::domain::camera_device::DeviceConfig;
use crate::capture::frame_buffer::SharedState;
use crate::detection::domain::detector::{DetectionStatus, DetectorSet, DetectorStatus};
use crate::session::session_manager::{
    create_session_dir, default_session_id, validate_session_id, write_summary, SessionSnapshot,
};
use crate::shared::camera_settings::CameraSettings;
use crate::shared::constants::{DEVICE_BUFFER_DEPTH, PREVIEW_DIR_NAME, PREVIEW_FILE_NAME};
use crate::shared::error::CameraError;
use crate::video::domain::image_writer::ImageWriter;

use super::capture_observer::CaptureObserver;
use super::frame_report::{build_frame_report, FrameReport};
use super::periodic_processor::{PeriodicProcessor, ProcessorConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub session_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CameraStatus {
    pub running: bool,
    pub session_active: bool,
    pub session_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub face_detection: DetectorStatus,
    pub reading_material_detection: DetectorStatus,
    pub camera_status: CameraStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CapturedImagesReport {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub detection_status: DetectionStatus,
}

/// Owns the shared state handle and drives the camera and session
/// lifecycle on behalf of command callers.
///
/// Lifecycle calls (start/stop) serialize on their own lock, separate from
/// the shared state lock, and never hold the state lock while opening the
/// device or joining the grab thread. Queries never take the lifecycle lock.
pub struct CameraPipeline {
    settings: CameraSettings,
    state: Arc<SharedState>,
    processor: Arc<PeriodicProcessor>,
    detection_status: DetectionStatus,
    device_factory: DeviceFactory,
    acquisition: Mutex<AcquisitionLoop>,
    running: Arc<AtomicBool>,
    preview_path: PathBuf,
}

impl CameraPipeline {
    /// Builds a stopped pipeline and creates the image and preview
    /// directories.
    pub fn new(
        settings: CameraSettings,
        detectors: DetectorSet,
        device_factory: DeviceFactory,
        writer: Arc<dyn ImageWriter>,
        observer: Arc<dyn CaptureObserver>,
    ) -> Result<Self, CameraError> {
        let preview_dir = settings.image_dir.join(PREVIEW_DIR_NAME);
        std::fs::create_dir_all(&preview_dir).map_err(|source| CameraError::DirectoryError {
            path: preview_dir.clone(),
            source,
        })?;
        let preview_path = preview_dir.join(PREVIEW_FILE_NAME);

        let detection_status = detectors.status();
        let state = Arc::new(SharedState::new());
        let processor = Arc::new(PeriodicProcessor::new(
            state.clone(),
            detectors,
            writer,
            observer,
            ProcessorConfig {
                interval: settings.capture_interval(),
                image_quality: settings.image_quality,
                center_threshold_percent: settings.center_threshold_percent,
                preview_path: preview_path.clone(),
            },
        ));
        log::info!(
            "Camera pipeline ready (images in {}, interval {:.2}s)",
            settings.image_dir.display(),
            settings.capture_interval_secs
        );

        let acquisition = AcquisitionLoop::new();
        Ok(Self {
            settings,
            state,
            processor,
            detection_status,
            device_factory,
            running: acquisition.running_flag(),
            acquisition: Mutex::new(acquisition),
            preview_path,
        })
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn preview_path(&self) -> &Path {
        &self.preview_path
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start_camera(&self) -> Result<StartOutcome, CameraError> {
        let mut acquisition = self.acquisition();
        if acquisition.is_running() {
            log::info!("Camera is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        let device = (self.device_factory)();
        let config = DeviceConfig {
            device: self.settings.device.clone(),
            width: self.settings.image_width,
            height: self.settings.image_height,
            buffer_depth: DEVICE_BUFFER_DEPTH,
        };
        match acquisition.start(
            device,
            &config,
            self.state.clone(),
            self.processor.clone(),
            self.settings.read_backoff(),
        ) {
            Ok(()) => Ok(StartOutcome::Started),
            Err(CameraError::AlreadyRunning) => Ok(StartOutcome::AlreadyRunning),
            Err(e) => {
                log::error!("Failed to start camera: {e}");
                Err(e)
            }
        }
    }

    /// Ends any active session, stops the grab thread and clears both frame
    /// slots. Returns whether the camera was running. Idempotent.
    pub fn stop_camera(&self) -> bool {
        if let Ok(snapshot) = self.state.with_session(|s| s.deactivate()) {
            log::info!(
                "Session {} ended by camera stop with {} images",
                snapshot.session_id.as_deref().unwrap_or("?"),
                snapshot.images.len()
            );
        }
        let was_running = self.acquisition().stop(self.settings.stop_timeout());
        self.state.clear_frames();
        was_running
    }

    /// Starts recording into `{image_dir}/{id}`, starting the camera first
    /// if it is stopped.
    pub fn start_session(&self, session_id: Option<&str>) -> Result<SessionInfo, CameraError> {
        if self.state.with_session(|s| s.is_active()) {
            log::warn!("A session is already active");
            return Err(CameraError::AlreadyActive);
        }
        let id = match session_id {
            Some(id) => {
                validate_session_id(id)?;
                id.trim().to_string()
            }
            None => default_session_id(&Local::now()),
        };
        let dir = create_session_dir(&self.settings.image_dir, &id)?;
        let epoch = self
            .state
            .with_session(|s| s.activate(id.clone(), dir.clone()))?;
        log::info!("Starting camera session with ID: {id}");

        if let Err(e) = self.start_camera() {
            self.state.with_session(|s| s.rollback(epoch));
            return Err(e);
        }
        Ok(SessionInfo {
            session_id: id,
            session_dir: dir,
        })
    }

    /// Ends the active session. The camera keeps running.
    pub fn end_session(&self) -> Result<SessionSnapshot, CameraError> {
        match self.state.with_session(|s| s.deactivate()) {
            Ok(snapshot) => {
                log::info!("Session ended with {} captured images", snapshot.images.len());
                Ok(snapshot)
            }
            Err(e) => {
                log::warn!("No active session to end");
                Err(e)
            }
        }
    }

    /// The current or most recent session.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.state.with_session(|s| s.snapshot())
    }

    pub fn captured_images(&self) -> CapturedImagesReport {
        CapturedImagesReport {
            session: self.session_snapshot(),
            detection_status: self.detection_status.clone(),
        }
    }

    /// Writes the summary file for the current or most recent session.
    pub fn write_session_summary(&self) -> Result<PathBuf, CameraError> {
        write_summary(
            &self.session_snapshot(),
            &self.detection_status,
            &Local::now(),
        )
    }

    /// Report for the latest processed frame, or `None` before the first
    /// tick (and after stop).
    pub fn current_frame(&self) -> Option<FrameReport> {
        let (processed, session_id, session_active) = {
            let state = self.state.lock();
            (
                state.processed_frame(),
                state.session.session_id().map(str::to_string),
                state.session.is_active(),
            )
        };
        processed.map(|p| {
            build_frame_report(
                &p,
                &self.preview_path,
                session_id,
                session_active,
                self.settings.center_threshold_percent,
            )
        })
    }

    pub fn detection_status(&self) -> StatusReport {
        let running = self.is_running();
        let (session_active, session_id) = self
            .state
            .with_session(|s| (s.is_active(), s.session_id().map(str::to_string)));
        StatusReport {
            face_detection: self.detection_status.face_detection.clone(),
            reading_material_detection: self.detection_status.reading_material_detection.clone(),
            camera_status: CameraStatus {
                running,
                session_active,
                session_id,
            },
        }
    }

    fn acquisition(&self) -> MutexGuard<'_, AcquisitionLoop> {
        self.acquisition
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for CameraPipeline {
    fn drop(&mut self) {
        self.acquisition().stop(self.settings.stop_timeout());
    }
}

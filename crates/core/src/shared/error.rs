use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for the camera pipeline and its command API.
///
/// Only command-level operations return these to callers; failures inside
/// the acquisition thread are logged and contained.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("camera is already running")]
    AlreadyRunning,
    #[error("a session is already active, end it first")]
    AlreadyActive,
    #[error("no active session to end")]
    NoActiveSession,
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("detector failed: {0}")]
    DetectorFailure(String),
    #[error("failed to write {path}: {message}")]
    IoWriteFailure { path: PathBuf, message: String },
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

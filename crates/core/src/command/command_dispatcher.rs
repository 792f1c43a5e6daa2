use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::pipeline::camera_pipeline::{CameraPipeline, StartOutcome};
use crate::shared::error::CameraError;

/// Uniform result of every command.
///
/// Serializes flat: `success`, `message`, then the command's own fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            log::error!("Failed to serialize '{key}': {e}");
            Value::Null
        });
        self.data.insert(key.to_string(), value);
        self
    }

    /// Merges the fields of a serializable struct into the result.
    pub fn with_fields(mut self, value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::Object(fields)) => self.data.extend(fields),
            Ok(other) => log::error!("Expected an object, got {other}"),
            Err(e) => log::error!("Failed to serialize result fields: {e}"),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Translates named commands into pipeline calls.
///
/// Never panics on input; every failure becomes `success = false`.
pub struct CommandDispatcher {
    pipeline: Arc<CameraPipeline>,
}

impl CommandDispatcher {
    pub const COMMANDS: [&'static str; 8] = [
        "start_camera",
        "stop_camera",
        "start_session",
        "end_session",
        "get_current_frame",
        "get_captured_images",
        "get_detection_status",
        "write_session_summary",
    ];

    pub fn new(pipeline: Arc<CameraPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &CameraPipeline {
        &self.pipeline
    }

    pub fn process_command(&self, name: &str, params: &Value) -> CommandResult {
        log::debug!("Processing command: {name}");
        match name {
            "start_camera" => self.start_camera(),
            "stop_camera" => self.stop_camera(),
            "start_session" => self.start_session(params),
            "end_session" => self.end_session(),
            "get_current_frame" => self.current_frame(),
            "get_captured_images" => self.captured_images(),
            "get_detection_status" => self.detection_status(),
            "write_session_summary" => self.write_session_summary(),
            other => {
                let err = CameraError::UnknownCommand(other.to_string());
                log::warn!("{err}");
                CommandResult::failure(format!(
                    "{err}. Available commands: {}",
                    Self::COMMANDS.join(", ")
                ))
            }
        }
    }

    fn start_camera(&self) -> CommandResult {
        match self.pipeline.start_camera() {
            Ok(StartOutcome::Started) => CommandResult::ok("Camera started successfully"),
            Ok(StartOutcome::AlreadyRunning) => CommandResult::ok("Camera is already running"),
            Err(e) => CommandResult::failure(format!("Failed to start camera: {e}")),
        }
    }

    fn stop_camera(&self) -> CommandResult {
        if self.pipeline.stop_camera() {
            CommandResult::ok("Camera stopped successfully")
        } else {
            CommandResult::ok("Camera is not running")
        }
    }

    fn start_session(&self, params: &Value) -> CommandResult {
        let session_id = match params.get("session_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.as_str()),
            Some(other) => {
                let err = CameraError::InvalidParameter(format!(
                    "session_id must be a string, got {other}"
                ));
                return CommandResult::failure(err.to_string());
            }
        };

        match self.pipeline.start_session(session_id) {
            Ok(info) => {
                CommandResult::ok(format!("Session started successfully: {}", info.session_id))
                    .with("session_info", &info)
            }
            Err(CameraError::AlreadyActive) => {
                CommandResult::failure("A session is already active. End it first.")
            }
            Err(e @ CameraError::DeviceUnavailable(_)) => {
                CommandResult::failure(format!("Failed to start camera: {e}"))
            }
            Err(e) => CommandResult::failure(format!("Failed to start session: {e}")),
        }
    }

    fn end_session(&self) -> CommandResult {
        match self.pipeline.end_session() {
            Ok(snapshot) => CommandResult::ok(format!(
                "Session ended successfully with {} images",
                snapshot.images.len()
            ))
            .with("session_data", &snapshot),
            Err(e) => CommandResult::failure(capitalize(&e.to_string()))
                .with("session_data", self.pipeline.session_snapshot()),
        }
    }

    fn current_frame(&self) -> CommandResult {
        match self.pipeline.current_frame() {
            Some(report) => {
                CommandResult::ok("Current frame and detection data retrieved").with_fields(&report)
            }
            None => CommandResult::failure("No processed frame available")
                .with("frame_path", Value::Null)
                .with("timestamp", Value::Null)
                .with("detection_data", json!({})),
        }
    }

    fn captured_images(&self) -> CommandResult {
        let report = self.pipeline.captured_images();
        CommandResult::ok(format!(
            "Retrieved {} captured images",
            report.session.images.len()
        ))
        .with("session_data", &report)
    }

    fn detection_status(&self) -> CommandResult {
        CommandResult::ok("Detection status retrieved")
            .with_fields(self.pipeline.detection_status())
    }

    fn write_session_summary(&self) -> CommandResult {
        match self.pipeline.write_session_summary() {
            Ok(path) => CommandResult::ok(format!("Session summary written to {}", path.display()))
                .with("summary_path", &path),
            Err(e) => CommandResult::failure(format!("Failed to write session summary: {e}")),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

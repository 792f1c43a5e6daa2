use std::time::Duration;

pub const PREVIEW_DIR_NAME: &str = "preview";
pub const PREVIEW_FILE_NAME: &str = "current_frame.jpg";
pub const SESSION_SUMMARY_FILE_NAME: &str = "session_info.txt";

pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const MATERIAL_MODEL_NAME: &str = "read_material-yolo11n-best.onnx";

/// Time between processing ticks.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep after a failed device read before trying again.
pub const DEFAULT_READ_BACKOFF: Duration = Duration::from_millis(100);

/// How long `stop_camera` waits for the grab thread before detaching it.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Device-side frame queue depth. One slot means reads return the newest frame.
pub const DEVICE_BUFFER_DEPTH: u32 = 1;

/// Session ids and image filenames share this date layout.
pub const SESSION_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

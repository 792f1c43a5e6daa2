use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::capture::frame_buffer::ProcessedFrame;
use crate::detection::domain::centering::center_threshold_px;
use crate::detection::domain::guidance::{compute_guidance, frame_center, GuidanceVector};
use crate::session::captured_image::unix_seconds;
use crate::shared::detection::Detection;

/// The latest processed frame with its detections, positioning and
/// guidance, as returned by the current-frame query.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub frame_path: PathBuf,
    pub timestamp: f64,
    pub detection_data: DetectionData,
}

#[derive(Clone, Debug, Serialize)]
pub struct DetectionData {
    pub reading_materials: Vec<Detection>,
    pub faces: Vec<Detection>,
    pub face_count: usize,
    pub positioning: Positioning,
    #[serde(serialize_with = "guidance_or_empty")]
    pub robot_guidance: Option<GuidanceVector>,
    pub session_info: FrameSessionInfo,
}

#[derive(Clone, Debug, Serialize)]
pub struct Positioning {
    pub img_center_x: i32,
    pub img_center_y: i32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub center_threshold_px: u32,
    pub center_threshold_percent: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_from_center: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FrameSessionInfo {
    pub session_id: Option<String>,
    pub session_active: bool,
    pub timestamp: f64,
    pub datetime: String,
    pub filename: String,
}

/// Builds the report for `processed`.
///
/// Guidance targets the first material detection of the tick, which is the
/// detector's highest-ranked box.
pub fn build_frame_report(
    processed: &ProcessedFrame,
    preview_path: &Path,
    session_id: Option<String>,
    session_active: bool,
    center_threshold_percent: u32,
) -> FrameReport {
    let width = processed.annotated.width();
    let height = processed.annotated.height();
    let (img_center_x, img_center_y) = frame_center(width, height);
    let detections = &processed.detections;

    let robot_guidance = compute_guidance(
        width,
        height,
        detections.materials.first().map(|d| &d.bbox),
    );
    let timestamp = unix_seconds(&processed.processed_at);

    FrameReport {
        frame_path: preview_path.to_path_buf(),
        timestamp,
        detection_data: DetectionData {
            reading_materials: detections.materials.clone(),
            faces: detections.faces.clone(),
            face_count: detections.faces.len(),
            positioning: Positioning {
                img_center_x,
                img_center_y,
                frame_width: width,
                frame_height: height,
                center_threshold_px: center_threshold_px(width, center_threshold_percent),
                center_threshold_percent,
                distance_from_center: robot_guidance.as_ref().map(|g| g.magnitude),
            },
            robot_guidance,
            session_info: FrameSessionInfo {
                session_id,
                session_active,
                timestamp,
                datetime: processed
                    .processed_at
                    .format("%Y-%m-%d_%H%M%S_%3f")
                    .to_string(),
                filename: preview_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            },
        },
    }
}

fn guidance_or_empty<S: Serializer>(
    guidance: &Option<GuidanceVector>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match guidance {
        Some(g) => g.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

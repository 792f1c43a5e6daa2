use std::path::Path;

use crate::detection::domain::detector::{DetectorSet, DetectorSlot};
use crate::shared::camera_settings::CameraSettings;
use crate::shared::detection::DetectionKind;

use super::onnx_yolo_detector::OnnxYoloDetector;

/// The face model is a single-class pose head; only its first score counts.
const FACE_CLASS_COUNT: Option<usize> = Some(1);

/// Builds the face and material detectors described by `settings`.
///
/// A detector that is disabled, whose model file is missing, or whose model
/// fails to load is left empty. The pipeline keeps running without it and
/// the status query reports it as not loaded.
pub fn build_detectors(settings: &CameraSettings) -> DetectorSet {
    let face = build_slot(
        settings.face_detection_enabled,
        &settings.face_model_path(),
        DetectionKind::Face,
        settings.detection_confidence,
        FACE_CLASS_COUNT,
    );
    let material = build_slot(
        settings.material_detection_enabled,
        &settings.material_model_path(),
        DetectionKind::Material,
        settings.detection_confidence,
        None,
    );
    DetectorSet::new(face, material)
}

fn build_slot(
    enabled: bool,
    model_path: &Path,
    kind: DetectionKind,
    confidence: f64,
    class_count: Option<usize>,
) -> DetectorSlot {
    if !enabled {
        log::info!("{kind} detection disabled");
        return DetectorSlot::disabled();
    }
    if !model_path.exists() {
        log::warn!(
            "{kind} model not found at {}; {kind} detection disabled",
            model_path.display()
        );
        return DetectorSlot::disabled();
    }
    match OnnxYoloDetector::new(model_path, kind, confidence, class_count) {
        Ok(detector) => {
            log::info!("{kind} detection ready ({})", model_path.display());
            DetectorSlot::loaded(Box::new(detector))
        }
        Err(e) => {
            log::error!("Failed to load {kind} model {}: {e}", model_path.display());
            DetectorSlot::disabled()
        }
    }
}

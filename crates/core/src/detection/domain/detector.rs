use serde::Serialize;

use crate::shared::detection::Detection;
use crate::shared::error::CameraError;
use crate::shared::frame::Frame;

/// Domain interface for object detection: image in, boxes out.
///
/// Implementations may be stateful, hence `&mut self`. Detections are
/// returned in the detector's own ranking order; the pipeline treats the
/// first material detection as the guidance target.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;

    /// Short backend label reported by the detection status query.
    fn model_type(&self) -> &str {
        "custom"
    }
}

/// Status of one detector as reported to command callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectorStatus {
    pub enabled: bool,
    pub model_loaded: bool,
    pub model_type: Option<String>,
}

/// Status of both detectors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetectionStatus {
    pub face_detection: DetectorStatus,
    pub reading_material_detection: DetectorStatus,
}

/// A detector position that may be empty when its model is disabled or
/// failed to load.
pub struct DetectorSlot {
    detector: Option<Box<dyn Detector>>,
}

impl DetectorSlot {
    pub fn disabled() -> Self {
        Self { detector: None }
    }

    pub fn loaded(detector: Box<dyn Detector>) -> Self {
        Self {
            detector: Some(detector),
        }
    }

    pub fn status(&self) -> DetectorStatus {
        DetectorStatus {
            enabled: self.detector.is_some(),
            model_loaded: self.detector.is_some(),
            model_type: self.detector.as_ref().map(|d| d.model_type().to_string()),
        }
    }

    /// Runs the detector, or returns nothing when the slot is empty.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        match self.detector.as_mut() {
            Some(detector) => detector.detect(frame),
            None => Ok(Vec::new()),
        }
    }
}

/// Detections produced by one processing tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickDetections {
    pub faces: Vec<Detection>,
    pub materials: Vec<Detection>,
}

/// The face and material detectors used by the processing tick.
pub struct DetectorSet {
    face: DetectorSlot,
    material: DetectorSlot,
}

impl DetectorSet {
    pub fn new(face: DetectorSlot, material: DetectorSlot) -> Self {
        Self { face, material }
    }

    pub fn none() -> Self {
        Self::new(DetectorSlot::disabled(), DetectorSlot::disabled())
    }

    pub fn status(&self) -> DetectionStatus {
        DetectionStatus {
            face_detection: self.face.status(),
            reading_material_detection: self.material.status(),
        }
    }

    /// Runs both detectors on the same frame.
    ///
    /// A failing detector is logged and contributes no detections; the
    /// other detector's results are kept.
    pub fn detect_all(&mut self, frame: &Frame) -> TickDetections {
        TickDetections {
            faces: detect_or_empty(&mut self.face, frame, "face"),
            materials: detect_or_empty(&mut self.material, frame, "reading material"),
        }
    }
}

fn detect_or_empty(slot: &mut DetectorSlot, frame: &Frame, label: &str) -> Vec<Detection> {
    slot.detect(frame).unwrap_or_else(|e| {
        let err = CameraError::DetectorFailure(format!("{label}: {e}"));
        log::error!("Frame {}: {err}", frame.sequence());
        Vec::new()
    })
}

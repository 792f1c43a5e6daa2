/// YOLO object detector running on ONNX Runtime via `ort`.
///
/// One type serves both the face model and the reading-material model; the
/// `DetectionKind` it is built with tags every box it reports.
use std::path::Path;

use crate::detection::domain::detector::Detector;
use crate::shared::detection::{BoundingBox, Detection, DetectionKind};
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't declare one.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// Number of leading box values in each output row: cx, cy, w, h.
const BOX_VALUES: usize = 4;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    kind: DetectionKind,
    confidence: f64,
    /// How many class scores follow the box values. `None` scores every
    /// remaining column, which suits plain detection heads.
    class_count: Option<usize>,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 when the shape is dynamic.
    pub fn new(
        model_path: &Path,
        kind: DetectionKind,
        confidence: f64,
        class_count: Option<usize>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded {kind} model {} (input {input_size}px)",
            model_path.display()
        );
        Ok(Self {
            session,
            kind,
            confidence,
            class_count,
            input_size,
        })
    }
}

impl Detector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        // Exported YOLO heads are [1, features, candidates]; some are transposed.
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            let Some(score) = class_score(&row, self.class_count) else {
                continue;
            };
            if score < self.confidence {
                continue;
            }

            let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
            candidates.push(Candidate {
                x1: (cx - w / 2.0 - pad_x as f64) / scale,
                y1: (cy - h / 2.0 - pad_y as f64) / scale,
                x2: (cx + w / 2.0 - pad_x as f64) / scale,
                y2: (cy + h / 2.0 - pad_y as f64) / scale,
                confidence: score,
            });
        }

        let kept = nms(&mut candidates, NMS_IOU_THRESH);
        Ok(kept
            .into_iter()
            .map(|c| to_detection(&c, frame.width(), frame.height(), self.kind))
            .collect())
    }

    fn model_type(&self) -> &str {
        "onnx"
    }
}

fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Best class score of one output row, or `None` for a malformed row.
fn class_score(row: &[f32], class_count: Option<usize>) -> Option<f64> {
    if row.len() <= BOX_VALUES {
        return None;
    }
    let end = match class_count {
        Some(n) => (BOX_VALUES + n).min(row.len()),
        None => row.len(),
    };
    row[BOX_VALUES..end]
        .iter()
        .copied()
        .fold(None, |best: Option<f32>, s| Some(best.map_or(s, |b| b.max(s))))
        .map(f64::from)
}

/// Clamps a candidate to the frame and converts it to integer pixels.
fn to_detection(c: &Candidate, width: u32, height: u32, kind: DetectionKind) -> Detection {
    let (w, h) = (width as f64, height as f64);
    let bbox = BoundingBox::from_corners(
        c.x1.clamp(0.0, w),
        c.y1.clamp(0.0, h),
        c.x2.clamp(0.0, w),
        c.y2.clamp(0.0, h),
    );
    Detection::new(bbox, c.confidence, kind)
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` x `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // YOLO pads with 114 gray.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        let ty = pad_y as usize + y;
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl Candidate {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Greedy NMS. Output is ordered by confidence, highest first.
fn nms(candidates: &mut [Candidate], iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates.iter() {
        let overlaps = keep
            .iter()
            .any(|k| bbox_iou(&k.corners(), &candidate.corners()) > iou_thresh);
        if !overlaps {
            keep.push(candidate.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

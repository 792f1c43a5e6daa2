use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::detection::domain::centering::{distance_from_center, is_centered};
use crate::detection::domain::detector::TickDetections;
use crate::detection::domain::guidance::frame_center;
use crate::shared::detection::BoundingBox;
use crate::shared::frame::Frame;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

const MAX_ARROW_LEN: f64 = 50.0;
const ARROW_HEAD_LEN: f64 = 8.0;
const ARROW_HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;

const RECORDING_MARKER_CENTER: (i32, i32) = (20, 20);
const RECORDING_MARKER_RADIUS: i32 = 8;

/// Draws the preview overlay for one tick onto a copy of `frame`.
///
/// Face boxes are green. Material boxes are green when centered and red
/// otherwise; a non-centered material also gets a yellow arrow from its
/// box center toward the frame center. A red dot in the top-left corner
/// marks an active recording session.
pub fn annotate(
    frame: &Frame,
    detections: &TickDetections,
    recording: bool,
    center_threshold_percent: u32,
) -> Frame {
    let Some(mut img) = frame.to_rgb_image() else {
        return frame.clone();
    };
    let (width, height) = img.dimensions();

    for face in &detections.faces {
        draw_box(&mut img, &face.bbox, GREEN);
    }

    for material in &detections.materials {
        if is_centered(&material.bbox, width, height, center_threshold_percent) {
            draw_box(&mut img, &material.bbox, GREEN);
        } else {
            draw_box(&mut img, &material.bbox, RED);
            draw_guidance_arrow(&mut img, &material.bbox);
        }
    }

    if recording {
        draw_filled_circle_mut(
            &mut img,
            RECORDING_MARKER_CENTER,
            RECORDING_MARKER_RADIUS,
            RED,
        );
    }

    Frame::from_rgb_image(img, frame.sequence())
}

/// Two-pixel outline, inset for the second pass.
fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for inset in 0..2 {
        let w = bbox.width - 2 * inset;
        let h = bbox.height - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x + inset, bbox.y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

fn draw_guidance_arrow(img: &mut RgbImage, bbox: &BoundingBox) {
    let (width, height) = img.dimensions();
    let distance = distance_from_center(bbox, width, height);
    if distance == 0.0 {
        return;
    }
    let (cx, cy) = frame_center(width, height);
    let (bx, by) = bbox.center();
    let ux = (cx - bx) as f64 / distance;
    let uy = (cy - by) as f64 / distance;
    let length = MAX_ARROW_LEN.min(distance / 2.0);

    let start = (bx as f64, by as f64);
    let tip = (start.0 + ux * length, start.1 + uy * length);
    draw_line_segment_mut(img, to_f32(start), to_f32(tip), YELLOW);

    let back = uy.atan2(ux) + std::f64::consts::PI;
    for side in [-ARROW_HEAD_ANGLE, ARROW_HEAD_ANGLE] {
        let angle = back + side;
        let barb = (
            tip.0 + ARROW_HEAD_LEN * angle.cos(),
            tip.1 + ARROW_HEAD_LEN * angle.sin(),
        );
        draw_line_segment_mut(img, to_f32(tip), to_f32(barb), YELLOW);
    }
}

fn to_f32(p: (f64, f64)) -> (f32, f32) {
    (p.0 as f32, p.1 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::detection::{Detection, DetectionKind};

    const BLACK: [u8; 3] = [0, 0, 0];

    fn black_frame() -> Frame {
        Frame::new(vec![0u8; 200 * 100 * 3], 200, 100, 3, 7)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    fn det(x: i32, y: i32, w: i32, h: i32, kind: DetectionKind) -> Detection {
        Detection::new(BoundingBox::new(x, y, w, h), 0.9, kind)
    }

    #[test]
    fn test_no_detections_leaves_pixels_untouched() {
        let frame = black_frame();
        let out = annotate(&frame, &TickDetections::default(), false, 15);
        assert_eq!(out, frame);
    }

    #[test]
    fn test_face_box_is_green_and_input_is_not_modified() {
        let frame = black_frame();
        let dets = TickDetections {
            faces: vec![det(10, 10, 20, 20, DetectionKind::Face)],
            materials: vec![],
        };
        let out = annotate(&frame, &dets, false, 15);
        assert_eq!(pixel(&out, 10, 15), GREEN.0);
        assert_eq!(pixel(&out, 11, 15), GREEN.0);
        assert_eq!(pixel(&out, 20, 20), BLACK);
        assert_eq!(pixel(&frame, 10, 15), BLACK);
        assert_eq!(out.sequence(), 7);
    }

    #[test]
    fn test_centered_material_is_green_without_arrow() {
        // Frame center (100, 50); box center (100, 50).
        let dets = TickDetections {
            faces: vec![],
            materials: vec![det(90, 40, 20, 20, DetectionKind::Material)],
        };
        let out = annotate(&black_frame(), &dets, false, 15);
        assert_eq!(pixel(&out, 90, 50), GREEN.0);
        assert_eq!(pixel(&out, 100, 50), BLACK);
    }

    #[test]
    fn test_off_center_material_is_red_with_arrow() {
        // Box center (20, 50) sits 80px left of the frame center.
        let dets = TickDetections {
            faces: vec![],
            materials: vec![det(10, 40, 20, 20, DetectionKind::Material)],
        };
        let out = annotate(&black_frame(), &dets, false, 15);
        assert_eq!(pixel(&out, 10, 45), RED.0);
        // Arrow runs right from the box center for min(50, 80/2) = 40px.
        assert_eq!(pixel(&out, 40, 50), YELLOW.0);
        assert_eq!(pixel(&out, 70, 50), BLACK);
    }

    #[test]
    fn test_recording_marker() {
        let out = annotate(&black_frame(), &TickDetections::default(), true, 15);
        assert_eq!(pixel(&out, 20, 20), RED.0);
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let dets = TickDetections {
            faces: vec![det(10, 10, 0, 5, DetectionKind::Face)],
            materials: vec![],
        };
        let out = annotate(&black_frame(), &dets, false, 15);
        assert_eq!(out, black_frame());
    }
}

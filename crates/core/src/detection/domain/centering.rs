use crate::shared::detection::BoundingBox;

use super::guidance::frame_center;

/// Centering radius in pixels: `percent` of the frame width, integer division.
pub fn center_threshold_px(frame_width: u32, percent: u32) -> u32 {
    frame_width.saturating_mul(percent) / 100
}

/// Euclidean distance between the box center and the frame center.
pub fn distance_from_center(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> f64 {
    let (cx, cy) = frame_center(frame_width, frame_height);
    let (bx, by) = bbox.center();
    let dx = (bx - cx) as f64;
    let dy = (by - cy) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Annotation-time centering test. Independent of the guidance command,
/// which only reports "CENTERED" for an exact zero offset.
pub fn is_centered(bbox: &BoundingBox, frame_width: u32, frame_height: u32, percent: u32) -> bool {
    distance_from_center(bbox, frame_width, frame_height)
        <= center_threshold_px(frame_width, percent) as f64
}

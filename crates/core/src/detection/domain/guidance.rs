//! Directional guidance toward a detected target.
//!
//! Pure geometry: the vector points from the target's box center to the
//! frame center, and the command names the direction the robot should move
//! to bring the target onto the center.

use serde::Serialize;

use crate::shared::detection::BoundingBox;

pub const CENTERED_COMMAND: &str = "CENTERED";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuidanceVector {
    #[serde(rename = "arrow_dx")]
    pub dx: i32,
    #[serde(rename = "arrow_dy")]
    pub dy: i32,
    #[serde(rename = "movement_magnitude")]
    pub magnitude: f64,
    #[serde(rename = "robot_command")]
    pub command: String,
}

/// Guidance for `target` inside a `frame_width` x `frame_height` frame.
///
/// Returns `None` when there is no target.
pub fn compute_guidance(
    frame_width: u32,
    frame_height: u32,
    target: Option<&BoundingBox>,
) -> Option<GuidanceVector> {
    let target = target?;
    let (center_x, center_y) = frame_center(frame_width, frame_height);
    let (box_x, box_y) = target.center();
    Some(guidance_from_offset(center_x - box_x, center_y - box_y))
}

/// Frame center with floor division.
pub fn frame_center(frame_width: u32, frame_height: u32) -> (i32, i32) {
    ((frame_width / 2) as i32, (frame_height / 2) as i32)
}

pub fn guidance_from_offset(dx: i32, dy: i32) -> GuidanceVector {
    let (fx, fy) = (dx as f64, dy as f64);
    GuidanceVector {
        dx,
        dy,
        magnitude: (fx * fx + fy * fy).sqrt(),
        command: command_for(dx, dy),
    }
}

/// Builds the command token for an offset.
///
/// Horizontal first ("RIGHT"/"LEFT"), then vertical ("DOWN"/"UP") joined by
/// an underscore only when a horizontal token exists, all prefixed by
/// "MOVE_". A zero offset is "CENTERED".
pub fn command_for(dx: i32, dy: i32) -> String {
    let mut direction = String::new();
    if dx > 0 {
        direction.push_str("RIGHT");
    } else if dx < 0 {
        direction.push_str("LEFT");
    }

    let vertical = match dy.signum() {
        1 => Some("DOWN"),
        -1 => Some("UP"),
        _ => None,
    };
    if let Some(token) = vertical {
        if !direction.is_empty() {
            direction.push('_');
        }
        direction.push_str(token);
    }

    if direction.is_empty() {
        CENTERED_COMMAND.to_string()
    } else {
        format!("MOVE_{direction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case::centered(0, 0, "CENTERED")]
    #[case::right(5, 0, "MOVE_RIGHT")]
    #[case::left(-5, 0, "MOVE_LEFT")]
    #[case::up(0, -5, "MOVE_UP")]
    #[case::down(0, 5, "MOVE_DOWN")]
    #[case::right_down(5, 5, "MOVE_RIGHT_DOWN")]
    #[case::right_up(5, -5, "MOVE_RIGHT_UP")]
    #[case::left_down(-5, 5, "MOVE_LEFT_DOWN")]
    #[case::left_up(-5, -5, "MOVE_LEFT_UP")]
    fn test_command_table(#[case] dx: i32, #[case] dy: i32, #[case] expected: &str) {
        assert_eq!(command_for(dx, dy), expected);
    }

    #[rstest]
    #[case(0, 0, 0.0)]
    #[case(3, 4, 5.0)]
    #[case(-5, -5, 50f64.sqrt())]
    #[case(1, -1, 2f64.sqrt())]
    fn test_magnitude(#[case] dx: i32, #[case] dy: i32, #[case] expected: f64) {
        assert_abs_diff_eq!(guidance_from_offset(dx, dy).magnitude, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_no_target_gives_no_guidance() {
        assert_eq!(compute_guidance(640, 480, None), None);
    }

    #[test]
    fn test_vector_points_from_target_to_center() {
        // Box center (100, 100); frame center (320, 240).
        let target = BoundingBox::new(80, 90, 40, 20);
        let g = compute_guidance(640, 480, Some(&target)).unwrap();
        assert_eq!((g.dx, g.dy), (220, 140));
        assert_eq!(g.command, "MOVE_RIGHT_DOWN");
    }

    #[test]
    fn test_target_on_center_is_centered() {
        let target = BoundingBox::new(300, 220, 40, 40);
        let g = compute_guidance(640, 480, Some(&target)).unwrap();
        assert_eq!((g.dx, g.dy), (0, 0));
        assert_eq!(g.command, CENTERED_COMMAND);
    }

    #[test]
    fn test_odd_frame_uses_floor_center() {
        assert_eq!(frame_center(641, 481), (320, 240));
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let json = serde_json::to_value(guidance_from_offset(5, 0)).unwrap();
        assert_eq!(json["arrow_dx"], 5);
        assert_eq!(json["arrow_dy"], 0);
        assert_eq!(json["robot_command"], "MOVE_RIGHT");
        assert_eq!(json["movement_magnitude"], 5.0);
    }
}

use serde::Serialize;

/// Axis-aligned box in frame pixels, top-left origin.
///
/// Serializes as `[x, y, width, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "[i32; 4]")]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from corner coordinates, truncating toward zero.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x = x1 as i32;
        let y = y1 as i32;
        Self::new(x, y, x2 as i32 - x, y2 as i32 - y)
    }

    /// Box center with floor division on the half extents.
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + self.width.div_euclid(2),
            self.y + self.height.div_euclid(2),
        )
    }
}

impl From<BoundingBox> for [i32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionKind {
    Face,
    Material,
}

impl std::fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionKind::Face => write!(f, "face"),
            DetectionKind::Material => write!(f, "material"),
        }
    }
}

/// One detector hit. Recomputed every processing tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub kind: DetectionKind,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f64, kind: DetectionKind) -> Self {
        Self {
            bbox,
            confidence,
            kind,
        }
    }
}

use std::path::Path;

use crate::shared::frame::Frame;

/// Writes a single frame to an image file.
pub trait ImageWriter: Send + Sync {
    /// Encodes `frame` as JPEG at `quality` (1-100) and writes it to `path`,
    /// replacing any existing file.
    fn write_jpeg(
        &self,
        path: &Path,
        frame: &Frame,
        quality: u8,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

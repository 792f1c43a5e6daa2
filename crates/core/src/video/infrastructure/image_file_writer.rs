use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// JPEG writer backed by the `image` crate.
///
/// The encoded image goes to a sibling temp file first and is then renamed
/// over the target, so a reader polling the target never sees a half-written
/// file.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write_jpeg(
        &self,
        path: &Path,
        frame: &Frame,
        quality: u8,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;

        let tmp = temp_path(path);
        if let Err(e) = encode_to(&tmp, &img, quality) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn encode_to(
    path: &Path,
    img: &image::RgbImage,
    quality: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(img)?;
    out.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> Frame {
        let data = [r, g, b].repeat((width * height) as usize);
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_write_creates_jpeg_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview").join("current_frame.jpg");
        let writer = ImageFileWriter::new();
        writer
            .write_jpeg(&path, &make_frame(64, 48, 50, 100, 200), 95)
            .unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_lower_quality_gives_smaller_file() {
        let dir = tempfile::tempdir().unwrap();
        // Noisy content so quality makes a visible difference.
        let data: Vec<u8> = (0..64 * 64 * 3).map(|i| (i * 37 % 251) as u8).collect();
        let frame = Frame::new(data, 64, 64, 3, 0);
        let writer = ImageFileWriter::new();
        let high = dir.path().join("high.jpg");
        let low = dir.path().join("low.jpg");
        writer.write_jpeg(&high, &frame, 95).unwrap();
        writer.write_jpeg(&low, &frame, 10).unwrap();

        let size = |p: &Path| std::fs::metadata(p).unwrap().len();
        assert!(size(&low) < size(&high));
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let writer = ImageFileWriter::new();
        writer.write_jpeg(&path, &make_frame(10, 10, 0, 0, 0), 90).unwrap();
        writer.write_jpeg(&path, &make_frame(20, 10, 0, 0, 0), 90).unwrap();
        assert_eq!(image::open(&path).unwrap().width(), 20);
    }

    #[test]
    fn test_write_to_unwritable_location_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let writer = ImageFileWriter::new();
        let result = writer.write_jpeg(&blocker.join("out.jpg"), &make_frame(4, 4, 0, 0, 0), 90);
        assert!(result.is_err());
    }
}

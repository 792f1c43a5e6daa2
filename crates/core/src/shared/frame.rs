use ndarray::ArrayView3;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// `sequence` is assigned by the acquisition loop and increases by one per
/// successful device read, so two frames can be told apart without
/// comparing pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    sequence: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            sequence,
        }
    }

    /// Wraps an `image` buffer without copying.
    pub fn from_rgb_image(img: image::RgbImage, sequence: u64) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, 3, sequence)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Copies the pixels into an `image::RgbImage` for drawing or encoding.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.channels != 3 {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (
                self.height as usize,
                self.width as usize,
                self.channels as usize,
            ),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.sequence(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_clone_does_not_alias() {
        let frame = Frame::new(vec![100u8; 12], 2, 2, 3, 0);
        let mut img = frame.clone().to_rgb_image().unwrap();
        img.put_pixel(0, 0, image::Rgb([0, 0, 0]));
        assert_eq!(frame.data()[0], 100);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_rgb_image_conversion_keeps_pixels() {
        let mut img = image::RgbImage::new(4, 2);
        img.put_pixel(3, 1, image::Rgb([10, 20, 30]));
        let frame = Frame::from_rgb_image(img, 7);
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.sequence(), 7);

        let back = frame.to_rgb_image().unwrap();
        assert_eq!(back.get_pixel(3, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_to_rgb_image_rejects_non_rgb() {
        let frame = Frame::new(vec![0u8; 4], 2, 2, 1, 0);
        assert!(frame.to_rgb_image().is_none());
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }
}

use crate::capture::domain::camera_device::{CameraDevice, DeviceConfig};
use crate::shared::frame::Frame;

#[cfg(target_os = "linux")]
const INPUT_FORMAT: &str = "video4linux2,v4l2";
#[cfg(target_os = "macos")]
const INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const INPUT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const INPUT_FORMAT: &str = "video4linux2,v4l2";

/// Captures frames from a local camera via libavdevice
/// (V4L2 / AVFoundation / DirectShow).
///
/// Each decoded frame is converted to RGB24 and stamped with a sequence
/// number that increases per successful read.
pub struct FfmpegCamera {
    stream: Option<OpenStream>,
    sequence: u64,
}

struct OpenStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: FfmpegCamera is only used from a single thread at a time. It is
// opened on the caller's thread and then moved, never shared.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn new() -> Self {
        Self {
            stream: None,
            sequence: 0,
        }
    }
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDevice for FfmpegCamera {
    fn open(&mut self, config: &DeviceConfig) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.release();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == INPUT_FORMAT)
            .ok_or_else(|| format!("Capture backend '{INPUT_FORMAT}' is not available"))?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", config.width, config.height),
        );
        options.set("fflags", "nobuffer");
        if cfg!(target_os = "windows") {
            // dshow sizes its real-time buffer in bytes: one RGB frame.
            let bytes = config.width as u64 * config.height as u64 * 3 * config.buffer_depth as u64;
            options.set("rtbufsize", &bytes.to_string());
        }

        let url = device_url(&config.device);
        let ictx = match ffmpeg_next::format::open_with(&url, &format, options)? {
            ffmpeg_next::format::context::Context::Input(ictx) => ictx,
            ffmpeg_next::format::context::Context::Output(_) => {
                return Err(format!("{url} opened as an output").into())
            }
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("Device exposes no video stream")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!("Opened camera {url} at {width}x{height}");
        self.stream = Some(OpenStream {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let stream = self.stream.as_mut().ok_or("FfmpegCamera: not opened")?;

        loop {
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            if stream.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
                stream.scaler.run(&decoded, &mut rgb_frame)?;
                let pixels = extract_rgb_pixels(&rgb_frame, stream.width, stream.height);
                let frame = Frame::new(pixels, stream.width, stream.height, 3, self.sequence);
                self.sequence += 1;
                return Ok(frame);
            }

            let (index, packet) = match stream.ictx.packets().next() {
                Some((s, packet)) => (s.index(), packet),
                None => return Err("Camera stream ended".into()),
            };
            if index != stream.stream_index || stream.decoder.send_packet(&packet).is_err() {
                continue;
            }
        }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Camera device released");
        }
    }
}

/// Maps a bare device index to the platform's device URL.
///
/// Anything that is not a plain integer is passed through unchanged.
fn device_url(device: &str) -> String {
    match device.trim().parse::<u32>() {
        Ok(index) if cfg!(target_os = "linux") => format!("/dev/video{index}"),
        Ok(index) if cfg!(target_os = "windows") => format!("video={index}"),
        Ok(index) => index.to_string(),
        Err(_) => device.to_string(),
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

use std::path::{Path, PathBuf};

/// Outbound notifications from the processing tick.
///
/// Called from the acquisition thread with no locks held. Implementations
/// should return quickly; a slow observer delays the next frame read.
pub trait CaptureObserver: Send + Sync {
    /// A new annotated preview was written to `preview_path`.
    fn on_frame_captured(&self, preview_path: &Path);

    /// A raw frame was saved into the active session.
    fn on_image_captured(&self, image_path: &Path);
}

/// Observer that discards all events.
pub struct NullObserver;

impl CaptureObserver for NullObserver {
    fn on_frame_captured(&self, _preview_path: &Path) {}
    fn on_image_captured(&self, _image_path: &Path) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureEvent {
    FrameCaptured(PathBuf),
    ImageCaptured(PathBuf),
}

/// Forwards events onto a channel so a presentation layer can consume them
/// on its own thread.
///
/// Uses `try_send`: when a bounded receiver falls behind, events are
/// dropped rather than blocking capture.
pub struct ChannelObserver {
    tx: crossbeam_channel::Sender<CaptureEvent>,
}

impl ChannelObserver {
    pub fn new(tx: crossbeam_channel::Sender<CaptureEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: CaptureEvent) {
        if let Err(e) = self.tx.try_send(event) {
            log::debug!("Capture event dropped: {e}");
        }
    }
}

impl CaptureObserver for ChannelObserver {
    fn on_frame_captured(&self, preview_path: &Path) {
        self.forward(CaptureEvent::FrameCaptured(preview_path.to_path_buf()));
    }

    fn on_image_captured(&self, image_path: &Path) {
        self.forward(CaptureEvent::ImageCaptured(image_path.to_path_buf()));
    }
}

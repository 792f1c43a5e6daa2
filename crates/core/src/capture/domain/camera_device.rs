use crate::shared::frame::Frame;

/// How the acquisition loop wants the device configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device index ("0") or platform device path.
    pub device: String,
    pub width: u32,
    pub height: u32,
    /// Frames the device may queue internally. Kept at 1 so every read
    /// returns the newest frame rather than a backlog.
    pub buffer_depth: u32,
}

/// A live frame source.
///
/// `read` blocks until the next frame is available. Implementations are
/// moved onto the acquisition thread after a successful `open`.
pub trait CameraDevice: Send {
    fn open(&mut self, config: &DeviceConfig) -> Result<(), Box<dyn std::error::Error>>;

    fn read(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Releases the device. Safe to call more than once.
    fn release(&mut self);
}

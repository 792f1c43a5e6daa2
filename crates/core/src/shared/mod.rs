pub mod camera_settings;
pub mod constants;
pub mod detection;
pub mod error;
pub mod frame;

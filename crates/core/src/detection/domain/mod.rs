pub mod centering;
pub mod detector;
pub mod guidance;

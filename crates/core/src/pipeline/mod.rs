pub mod annotator;
pub mod camera_pipeline;
pub mod capture_observer;
pub mod frame_report;
pub mod periodic_processor;

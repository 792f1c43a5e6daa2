pub mod captured_image;
pub mod session_manager;

pub mod acquisition_loop;
pub mod domain;
pub mod frame_buffer;
pub mod infrastructure;

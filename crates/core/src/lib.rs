pub mod capture;
pub mod command;
pub mod detection;
pub mod pipeline;
pub mod session;
pub mod shared;
pub mod video;

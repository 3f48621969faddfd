//! Cold path: configuration and logging

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::init_logging;

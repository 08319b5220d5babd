pub mod config;
pub mod logging;
pub mod unified_error;

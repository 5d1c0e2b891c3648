pub mod classify;
pub mod config;
pub mod guidance;
pub mod host;
pub mod pattern;

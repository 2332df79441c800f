//! Configuration loading for the narration engine.
//!
//! All tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Missing or invalid entries fall back to
//! defaults so a session can still start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, LogLevel};

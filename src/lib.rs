//! Timeline narration: turns a timeline page into an ordered list of narration
//! tracks and plays them through a text-to-speech boundary, one at a time.

pub mod bindings;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod gateway;
pub mod media;
pub mod player;
pub mod resource;
pub mod scroll;
pub mod text_utils;
pub mod timeline;
pub mod track;

pub use bindings::export_ts_bindings;

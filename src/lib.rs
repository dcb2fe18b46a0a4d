//! Transcodr - batch video transcoding on top of ffmpeg
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod inputs;
pub mod probe;
pub mod state;

//! # transcodr-av
//!
//! Command-line boundary to the external media tools.
//!
//! This crate provides:
//! - Stream probing through `ffprobe`, one query per stream kind
//! - Construction of `ffmpeg` transcode arguments
//! - Detection of the external tools on `PATH`
//!
//! Nothing here decodes or encodes media itself; codecs, muxing and format
//! conversion all happen inside the external tools.
//!
//! ## Features
//!
//! - `tracing` - Emit debug logs for tool invocations
//!
//! ## Example
//!
//! ```no_run
//! use transcodr_av::probe_streams;
//!
//! let streams = probe_streams("ffprobe", "/path/to/video.mkv")?;
//! if let Some(video) = &streams.video {
//!     println!("Video codec: {}", video.codec_name);
//! }
//! # Ok::<(), transcodr_av::Error>(())
//! ```

mod error;
pub mod probe;
pub mod tools;
pub mod transcode;

// Re-exports
pub use error::{Error, Result};
pub use probe::{AudioStream, Rational, StreamKind, StreamSet, VideoStream};
pub use tools::{check_tool, check_tool_at, get_tool_path, ToolInfo};
pub use transcode::{AudioArgs, TranscodeArgs};

/// Probe the first video and first audio stream of a media file.
///
/// `ffprobe` is the executable to run, either a bare name resolved on
/// `PATH` or a full path.
pub fn probe_streams<T, P>(ffprobe: T, path: P) -> Result<StreamSet>
where
    T: AsRef<std::path::Path>,
    P: AsRef<std::path::Path>,
{
    probe::probe_streams(ffprobe.as_ref(), path.as_ref())
}

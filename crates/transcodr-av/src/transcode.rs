//! ffmpeg transcode invocation.
//!
//! Only argument construction lives here. Spawning, waiting and killing the
//! process belong to the caller, which owns the process lifetime.

use std::ffi::OsString;
use std::path::PathBuf;

/// Audio branch of a transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArgs {
    /// ffmpeg audio encoder (e.g. "aac").
    pub encoder: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
}

/// Everything ffmpeg needs to re-encode one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeArgs {
    /// Source file.
    pub input: PathBuf,
    /// Destination file, overwritten if it exists.
    pub output: PathBuf,
    /// ffmpeg video encoder (e.g. "libx265").
    pub video_encoder: String,
    /// Value for the `fps` filter (e.g. "25" or "30000/1001").
    pub frame_rate: String,
    /// Audio branch; `None` produces a video-only output.
    pub audio: Option<AudioArgs>,
}

impl TranscodeArgs {
    /// Build the ffmpeg argument list.
    ///
    /// Only the first video stream is mapped, plus the first audio stream
    /// when an audio branch is present. Without one, no audio option of any
    /// kind is emitted, so sources without audio never make ffmpeg look for
    /// a stream that does not exist.
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            "error".into(),
            // Overwrite
            "-y".into(),
            "-i".into(),
            self.input.clone().into(),
            "-map".into(),
            "0:v:0".into(),
            "-vf".into(),
            format!("fps={}", self.frame_rate).into(),
            "-c:v".into(),
            self.video_encoder.clone().into(),
        ];

        if let Some(audio) = &self.audio {
            args.extend([
                OsString::from("-map"),
                "0:a:0".into(),
                "-c:a".into(),
                audio.encoder.clone().into(),
                "-ar".into(),
                audio.sample_rate.to_string().into(),
            ]);
        }

        args.push(self.output.clone().into());
        args
    }
}

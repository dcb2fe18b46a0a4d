//! Source inspection.
//!
//! [`MediaProbe`] answers one question per source file: which streams does
//! it have? The answer is always a [`ProbeResult`]. Files that are not media
//! at all, are missing, or make the probe tool fail come back with every
//! stream absent; [`ProbeResult::issue`] records why, so that an unexpected
//! failure (tool missing, permission denied) can still be told apart from an
//! ordinary "this is not a video" in logs and tests.

pub use transcodr_av::probe::{AudioStream, Rational, StreamKind, StreamSet, VideoStream};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Why a probe produced no streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeIssue {
    /// The source path does not exist.
    SourceMissing,
    /// The probe tool ran but could not read the file as media.
    Unreadable { message: String },
    /// The source exists but cannot be opened (e.g. permission denied).
    Inaccessible { message: String },
    /// The probe tool could not be run at all.
    ToolUnavailable { message: String },
}

/// Streams of one source file, produced fresh for every probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// First video stream, if any.
    pub video: Option<VideoStream>,
    /// First audio stream, if any.
    pub audio: Option<AudioStream>,
    /// Set when the probe did not complete normally.
    pub issue: Option<ProbeIssue>,
}

impl ProbeResult {
    /// A result with every stream absent, recording why.
    pub fn absent(issue: ProbeIssue) -> Self {
        Self {
            video: None,
            audio: None,
            issue: Some(issue),
        }
    }

    /// A file is a video source iff it has a video stream.
    pub fn is_video(&self) -> bool {
        self.video.is_some()
    }

    /// Whether an audio stream is present.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

impl From<StreamSet> for ProbeResult {
    fn from(streams: StreamSet) -> Self {
        Self {
            video: streams.video,
            audio: streams.audio,
            issue: None,
        }
    }
}

/// Stream inspection of source files.
pub trait MediaProbe: Send + Sync {
    /// Inspect `path`. Never fails: problems resolve to absent streams.
    fn probe(&self, path: &Path) -> ProbeResult;
}

/// [`MediaProbe`] backed by the `ffprobe` command-line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe: PathBuf,
}

impl FfprobeProbe {
    /// Use the given ffprobe executable (bare name or full path).
    pub fn new(ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
        }
    }

    /// Path of the ffprobe executable in use.
    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl ProbeIssue {
    /// Classify a probe tool error. Only `Unreadable` is an ordinary
    /// "not media" answer; the others point at the environment.
    pub fn from_error(error: &transcodr_av::Error) -> Self {
        match error {
            transcodr_av::Error::FileNotFound { .. } => Self::SourceMissing,
            transcodr_av::Error::SourceUnreadable { .. } => Self::Inaccessible {
                message: error.to_string(),
            },
            e if e.is_tool_unavailable() => Self::ToolUnavailable {
                message: e.to_string(),
            },
            e => Self::Unreadable {
                message: e.to_string(),
            },
        }
    }

    /// Whether this issue is an environment problem rather than a file that
    /// simply is not media.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::ToolUnavailable { .. } | Self::Inaccessible { .. })
    }

    /// Error text, for issues that carry one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::SourceMissing => None,
            Self::Unreadable { message }
            | Self::Inaccessible { message }
            | Self::ToolUnavailable { message } => Some(message),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> ProbeResult {
        match transcodr_av::probe_streams(&self.ffprobe, path) {
            Ok(streams) => {
                tracing::debug!(
                    "Probed {:?}: video={:?} audio={:?}",
                    path,
                    streams.video,
                    streams.audio
                );
                streams.into()
            }
            Err(e) => {
                let issue = ProbeIssue::from_error(&e);
                if issue.is_unexpected() {
                    tracing::warn!("Could not probe {:?} with {:?}: {}", path, self.ffprobe, e);
                } else {
                    tracing::debug!("{:?} is not readable as media: {}", path, e);
                }
                ProbeResult::absent(issue)
            }
        }
    }
}

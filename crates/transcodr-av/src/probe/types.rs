//! Stream information types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of stream a probe query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Video streams.
    Video,
    /// Audio streams.
    Audio,
}

impl StreamKind {
    /// ffprobe `-select_streams` specifier.
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Exact frame rate as reported by the probe tool, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    /// Numerator.
    pub num: u32,
    /// Denominator, never zero.
    pub den: u32,
}

impl Rational {
    /// Create a ratio, rejecting a zero denominator.
    pub fn new(num: u32, den: u32) -> Option<Self> {
        (den != 0).then_some(Self { num, den })
    }

    /// Parse `num/den` or a bare integer.
    ///
    /// ffprobe reports `0/0` for streams without a meaningful rate; that and
    /// any other zero-denominator value yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.split_once('/') {
            Some((num, den)) => Self::new(num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => Self::new(s.parse().ok()?, 1),
        }
    }

    /// Exact value as a float.
    pub fn to_f64(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Value rounded to two decimal digits, for display and comparison.
    pub fn to_decimal(&self) -> f64 {
        (self.to_f64() * 100.0).round() / 100.0
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// The first video stream of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStream {
    /// Codec name as reported by ffprobe (e.g. "h264", "hevc").
    pub codec_name: String,
    /// Frame rate, when the container reports one.
    pub frame_rate: Option<Rational>,
}

/// The first audio stream of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    /// Codec name as reported by ffprobe (e.g. "aac", "mp3").
    pub codec_name: String,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
}

/// Streams found in a media file.
///
/// An absent stream is `None` as a whole; a present stream is never
/// partially filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSet {
    /// First video stream, if any.
    pub video: Option<VideoStream>,
    /// First audio stream, if any.
    pub audio: Option<AudioStream>,
}

impl StreamSet {
    /// A set with no streams.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether a video stream was found.
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    /// Whether an audio stream was found.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

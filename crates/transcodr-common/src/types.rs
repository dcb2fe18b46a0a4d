//! Encode option sets.
//!
//! Every option a user can choose for a transcode is one of a small fixed
//! set. The enums here map each choice to the identifier the media engine
//! expects (encoder name, `fps` filter value, sample rate in Hz).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VideoCodec {
    /// H.264 / AVC, encoded with x264.
    H264,
    /// H.265 / HEVC, encoded with x265.
    H265,
}

impl VideoCodec {
    /// All supported video codecs.
    pub const ALL: [VideoCodec; 2] = [VideoCodec::H264, VideoCodec::H265];

    /// ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
        }
    }

    /// Output subfolder used when one source is encoded to several codecs.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::H264 => "H264",
            Self::H265 => "H265",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::H264 => "H.264",
            Self::H265 => "H.265/HEVC",
        }
    }
}

impl Default for VideoCodec {
    fn default() -> Self {
        Self::H265
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "h264"),
            Self::H265 => write!(f, "h265"),
        }
    }
}

impl FromStr for VideoCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h264" | "h.264" | "avc" | "x264" | "libx264" => Ok(Self::H264),
            "h265" | "h.265" | "hevc" | "x265" | "libx265" => Ok(Self::H265),
            _ => Err(Error::invalid_option("video codec", s, Self::ALL)),
        }
    }
}

impl TryFrom<String> for VideoCodec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VideoCodec> for String {
    fn from(codec: VideoCodec) -> Self {
        codec.to_string()
    }
}

/// Target frame rate.
///
/// NTSC rates are kept as exact ratios so the `fps` filter receives
/// `30000/1001` rather than a truncated decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FrameRate {
    /// 23.976 fps (24000/1001).
    Film,
    /// 24 fps.
    Fps24,
    /// 25 fps.
    Fps25,
    /// 29.97 fps (30000/1001).
    Ntsc,
    /// 30 fps.
    Fps30,
    /// 50 fps.
    Fps50,
    /// 60 fps.
    Fps60,
}

impl FrameRate {
    /// All supported frame rates, slowest first.
    pub const ALL: [FrameRate; 7] = [
        FrameRate::Film,
        FrameRate::Fps24,
        FrameRate::Fps25,
        FrameRate::Ntsc,
        FrameRate::Fps30,
        FrameRate::Fps50,
        FrameRate::Fps60,
    ];

    /// Exact rate as `(numerator, denominator)`.
    pub fn as_fraction(&self) -> (u32, u32) {
        match self {
            Self::Film => (24_000, 1_001),
            Self::Fps24 => (24, 1),
            Self::Fps25 => (25, 1),
            Self::Ntsc => (30_000, 1_001),
            Self::Fps30 => (30, 1),
            Self::Fps50 => (50, 1),
            Self::Fps60 => (60, 1),
        }
    }

    /// Rate in frames per second.
    pub fn as_f64(&self) -> f64 {
        let (num, den) = self.as_fraction();
        f64::from(num) / f64::from(den)
    }

    /// Value for ffmpeg's `fps` filter.
    pub fn filter_value(&self) -> String {
        match self.as_fraction() {
            (num, 1) => num.to_string(),
            (num, den) => format!("{}/{}", num, den),
        }
    }

    /// Label as shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Film => "23.976",
            Self::Fps24 => "24",
            Self::Fps25 => "25",
            Self::Ntsc => "29.97",
            Self::Fps30 => "30",
            Self::Fps50 => "50",
            Self::Fps60 => "60",
        }
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::Fps25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FrameRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|rate| rate.label() == trimmed || rate.filter_value() == trimmed)
            .or(match trimmed {
                "23.98" => Some(Self::Film),
                "24.0" => Some(Self::Fps24),
                "25.0" => Some(Self::Fps25),
                "30.0" => Some(Self::Fps30),
                "50.0" => Some(Self::Fps50),
                "60.0" => Some(Self::Fps60),
                _ => None,
            })
            .ok_or_else(|| Error::invalid_option("frame rate", s, Self::ALL))
    }
}

impl TryFrom<String> for FrameRate {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<FrameRate> for String {
    fn from(rate: FrameRate) -> Self {
        rate.label().to_string()
    }
}

/// Target audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AudioCodec {
    /// Advanced Audio Coding, ffmpeg's native encoder.
    Aac,
    /// MPEG-1 Layer III via LAME.
    Mp3,
}

impl AudioCodec {
    /// All supported audio codecs.
    pub const ALL: [AudioCodec; 2] = [AudioCodec::Aac, AudioCodec::Mp3];

    /// ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "libmp3lame",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Aac => "AAC",
            Self::Mp3 => "MP3",
        }
    }
}

impl Default for AudioCodec {
    fn default() -> Self {
        Self::Aac
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aac => write!(f, "aac"),
            Self::Mp3 => write!(f, "mp3"),
        }
    }
}

impl FromStr for AudioCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aac" => Ok(Self::Aac),
            "mp3" | "libmp3lame" | "lame" => Ok(Self::Mp3),
            _ => Err(Error::invalid_option("audio codec", s, Self::ALL)),
        }
    }
}

impl TryFrom<String> for AudioCodec {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AudioCodec> for String {
    fn from(codec: AudioCodec) -> Self {
        codec.to_string()
    }
}

/// Target audio sample rate in Hz, restricted to the standard set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SampleRate(u32);

impl SampleRate {
    /// Standard sample rates in Hz.
    pub const STANDARD: [u32; 9] = [
        8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
    ];

    /// Validate a sample rate against the standard set.
    pub fn new(hz: u32) -> Result<Self> {
        if Self::STANDARD.contains(&hz) {
            Ok(Self(hz))
        } else {
            Err(Error::invalid_option(
                "sample rate",
                hz.to_string(),
                Self::STANDARD,
            ))
        }
    }

    /// All standard sample rates.
    pub fn all() -> impl Iterator<Item = SampleRate> {
        Self::STANDARD.into_iter().map(SampleRate)
    }

    /// Rate in Hz.
    pub fn hz(&self) -> u32 {
        self.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self(44_100)
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hz = s
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::invalid_option("sample rate", s, Self::STANDARD))?;
        Self::new(hz)
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.0
    }
}

//! Job requests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use transcodr_common::{AudioCodec, FrameRate, SampleRate, VideoCodec};

/// The encode options a user picks for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeOptions {
    #[serde(default)]
    pub video_codec: VideoCodec,

    #[serde(default)]
    pub frame_rate: FrameRate,

    #[serde(default)]
    pub audio_codec: AudioCodec,

    #[serde(default)]
    pub sample_rate: SampleRate,
}

/// One requested conversion of a source file.
///
/// A spec may name extra `variants`: further video codecs produced from the
/// same source in the same pass. Each target codec then gets its own
/// subfolder next to `destination_path` (`<dir>/H264/<name>`,
/// `<dir>/H265/<name>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub video_codec: VideoCodec,
    pub frame_rate: FrameRate,
    pub audio_codec: AudioCodec,
    pub sample_rate: SampleRate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VideoCodec>,
}

impl JobSpec {
    /// Convert `source` to `destination` with the given options.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: &TranscodeOptions,
    ) -> Self {
        Self {
            source_path: source.into(),
            destination_path: destination.into(),
            video_codec: options.video_codec,
            frame_rate: options.frame_rate,
            audio_codec: options.audio_codec,
            sample_rate: options.sample_rate,
            variants: Vec::new(),
        }
    }

    /// Convert `source` into `output_dir`, keeping its file name.
    ///
    /// Returns `None` if `source` has no file name.
    pub fn in_dir(
        source: impl Into<PathBuf>,
        output_dir: &Path,
        options: &TranscodeOptions,
    ) -> Option<Self> {
        let source = source.into();
        let file_name = source.file_name()?.to_owned();
        Some(Self::new(source, output_dir.join(file_name), options))
    }

    /// Also produce `codec` from the same source.
    #[must_use]
    pub fn with_variant(mut self, codec: VideoCodec) -> Self {
        self.variants.push(codec);
        self
    }

    /// Target video codecs in request order, without duplicates.
    pub fn targets(&self) -> Vec<VideoCodec> {
        let mut targets = vec![self.video_codec];
        for codec in &self.variants {
            if !targets.contains(codec) {
                targets.push(*codec);
            }
        }
        targets
    }

    /// Whether more than one codec is produced from this source.
    pub fn is_fan_out(&self) -> bool {
        self.targets().len() > 1
    }

    /// Output path for one target codec.
    pub fn destination_for(&self, codec: VideoCodec) -> PathBuf {
        if !self.is_fan_out() {
            return self.destination_path.clone();
        }

        let dir = self
            .destination_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        match self.destination_path.file_name() {
            Some(name) => dir.join(codec.dir_name()).join(name),
            None => dir.join(codec.dir_name()),
        }
    }

    /// File name of the source, for display.
    pub fn source_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

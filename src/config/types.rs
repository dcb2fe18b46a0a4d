use crate::conversion::TranscodeOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    /// Encode options used when the command line does not override them
    #[serde(default)]
    pub defaults: TranscodeOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Maximum encoder processes running at once (0 = number of CPUs)
    #[serde(default)]
    pub max_concurrent: usize,

    /// Cancel the other codec variants of a job as soon as one fails
    #[serde(default)]
    pub cancel_siblings_on_failure: bool,

    /// Where converted files go unless `--output` is given
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("~/Videos/transcoded")
}

impl TranscodeConfig {
    /// Concurrency bound with 0 resolved to the CPU count.
    pub fn effective_max_concurrent(&self) -> usize {
        if self.max_concurrent == 0 {
            num_cpus::get().max(1)
        } else {
            self.max_concurrent
        }
    }

    /// Output directory with `~` expanded.
    pub fn expanded_output_dir(&self) -> PathBuf {
        let raw = self.output_dir.to_string_lossy();
        PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 0,
            cancel_siblings_on_failure: false,
            output_dir: default_output_dir(),
        }
    }
}

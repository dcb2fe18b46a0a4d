//! Encode executor.
//!
//! Runs one [`EncodePlan`] as a separate ffmpeg process. The process handle
//! is owned by the future returned from [`EncodeExecutor::execute`]; dropping
//! that future kills the process, so an encode never outlives its caller.

use super::planner::EncodePlan;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Lines of engine stderr kept in a failure diagnostic.
const DIAGNOSTIC_LINES: usize = 20;

/// Why an encode did not produce its output.
#[derive(Debug, thiserror::Error)]
pub enum EncodeFailure {
    /// The engine process could not be started.
    #[error("failed to start {}: {source}", engine.display())]
    Spawn {
        engine: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully.
    #[error("encoder exited with {status}: {diagnostic}")]
    Exited {
        status: ExitStatus,
        /// Tail of the engine's stderr, unparsed.
        diagnostic: String,
    },

    /// Waiting on the engine process failed.
    #[error("lost track of encoder process: {0}")]
    Wait(#[source] std::io::Error),

    /// The encode was cancelled and its process terminated.
    #[error("encode cancelled")]
    Cancelled,
}

impl EncodeFailure {
    /// Whether this failure is a cancellation rather than an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Runs encode plans through an external ffmpeg executable.
#[derive(Debug, Clone)]
pub struct EncodeExecutor {
    ffmpeg: PathBuf,
}

impl EncodeExecutor {
    /// Use the given ffmpeg executable (bare name or full path).
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Path of the ffmpeg executable in use.
    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Run `plan` to completion.
    ///
    /// On success exactly one file exists at the plan's destination. On
    /// failure the destination may be absent, partial or stale.
    pub async fn execute(&self, plan: &EncodePlan) -> Result<(), EncodeFailure> {
        self.execute_cancellable(plan, &CancellationToken::new()).await
    }

    /// Run `plan`, terminating the process if `cancel` fires first.
    ///
    /// A cancelled process is killed and reaped before this returns
    /// [`EncodeFailure::Cancelled`]. Partial output is left in place.
    pub async fn execute_cancellable(
        &self,
        plan: &EncodePlan,
        cancel: &CancellationToken,
    ) -> Result<(), EncodeFailure> {
        if cancel.is_cancelled() {
            return Err(EncodeFailure::Cancelled);
        }

        let args = plan.transcode_args().to_args();
        debug!("FFmpeg args: {:?}", args);

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncodeFailure::Spawn {
                engine: self.ffmpeg.clone(),
                source,
            })?;

        // Drain stderr while waiting so a chatty engine cannot block on a full pipe
        let stderr = child.stderr.take();
        let stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                if let Err(e) = stderr.read_to_end(&mut buf).await {
                    debug!("Reading encoder stderr failed: {}", e);
                }
            }
            buf
        });

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let status = match waited {
            Some(status) => status.map_err(EncodeFailure::Wait)?,
            None => {
                info!("Terminating encoder for {:?}", plan.destination_path);
                if let Err(e) = child.kill().await {
                    debug!("Encoder already gone while cancelling: {}", e);
                }
                stderr_reader.abort();
                return Err(EncodeFailure::Cancelled);
            }
        };

        let stderr = stderr_reader.await.unwrap_or_else(|e| {
            debug!("Encoder stderr reader ended abnormally: {}", e);
            Vec::new()
        });

        if !status.success() {
            return Err(EncodeFailure::Exited {
                status,
                diagnostic: diagnostic_tail(&stderr),
            });
        }

        Ok(())
    }
}

impl Default for EncodeExecutor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Last few lines of engine output.
fn diagnostic_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::planner::VideoParams;
    use transcodr_common::{FrameRate, VideoCodec};

    fn plan() -> EncodePlan {
        EncodePlan {
            source_path: PathBuf::from("/in/clip.mp4"),
            destination_path: PathBuf::from("/out/clip.mp4"),
            video: VideoParams {
                codec: VideoCodec::H264,
                frame_rate: FrameRate::Fps25,
            },
            audio: None,
        }
    }

    #[test]
    fn test_diagnostic_tail_keeps_last_lines() {
        let stderr: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let tail = diagnostic_tail(stderr.as_bytes());
        assert_eq!(tail.lines().count(), DIAGNOSTIC_LINES);
        assert!(tail.starts_with("line 10"));
        assert!(tail.ends_with("line 29"));
    }

    #[test]
    fn test_diagnostic_tail_skips_blank_lines() {
        assert_eq!(
            diagnostic_tail(b"\n\nUnknown encoder 'libx265'\n\n"),
            "Unknown encoder 'libx265'"
        );
        assert_eq!(diagnostic_tail(b""), "");
    }

    #[tokio::test]
    async fn test_missing_engine_is_spawn_failure() {
        let executor = EncodeExecutor::new("/nonexistent/bin/ffmpeg");
        let err = executor.execute(&plan()).await.unwrap_err();
        assert!(matches!(err, EncodeFailure::Spawn { .. }), "got {err}");
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_spawns() {
        let executor = EncodeExecutor::new("/nonexistent/bin/ffmpeg");
        let token = CancellationToken::new();
        token.cancel();
        let err = executor
            .execute_cancellable(&plan(), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}

//! Turning job requests into encode plans.
//!
//! Planning is pure: the same spec and probe result always give the same
//! plans. Two rules carry all the policy:
//!
//! - a source without a video stream is rejected, never encoded;
//! - a source without an audio stream gets a video-only plan, even if the
//!   spec asked for an audio codec. The audio request is dropped rather than
//!   failing the job.
//!
//! The frame-rate filter is always applied, whatever the source rate.

use super::spec::JobSpec;
use crate::probe::ProbeResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use transcodr_av::{AudioArgs, TranscodeArgs};
use transcodr_common::{AudioCodec, FrameRate, SampleRate, VideoCodec};

/// Video parameters of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoParams {
    pub codec: VideoCodec,
    pub frame_rate: FrameRate,
}

/// Audio parameters of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioParams {
    pub codec: AudioCodec,
    pub sample_rate: SampleRate,
}

/// A fully resolved encode, ready to hand to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodePlan {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub video: VideoParams,
    /// `None` when the source has no audio; the output is then video-only.
    pub audio: Option<AudioParams>,
}

impl EncodePlan {
    /// Whether the output carries an audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// The video codec this plan produces.
    pub fn variant(&self) -> VideoCodec {
        self.video.codec
    }

    /// Engine arguments for this plan.
    pub fn transcode_args(&self) -> TranscodeArgs {
        TranscodeArgs {
            input: self.source_path.clone(),
            output: self.destination_path.clone(),
            video_encoder: self.video.codec.encoder().to_string(),
            frame_rate: self.video.frame_rate.filter_value(),
            audio: self.audio.map(|audio| AudioArgs {
                encoder: audio.codec.encoder().to_string(),
                sample_rate: audio.sample_rate.hz(),
            }),
        }
    }
}

/// Why a spec produced no plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanRejection {
    /// The source has no video stream.
    #[error("not a video file: {}", path.display())]
    NotAVideo { path: PathBuf },
}

/// Plan the primary target of `spec`, writing to its destination path.
pub fn plan(spec: &JobSpec, probe: &ProbeResult) -> Result<EncodePlan, PlanRejection> {
    plan_variant(spec, probe, spec.video_codec, &spec.destination_path)
}

/// Plan every target codec of `spec`, one plan per codec.
///
/// With a single target this is `plan`. With several, each plan writes
/// into its codec's subfolder.
pub fn plan_all(spec: &JobSpec, probe: &ProbeResult) -> Result<Vec<EncodePlan>, PlanRejection> {
    spec.targets()
        .into_iter()
        .map(|codec| plan_variant(spec, probe, codec, &spec.destination_for(codec)))
        .collect()
}

fn plan_variant(
    spec: &JobSpec,
    probe: &ProbeResult,
    codec: VideoCodec,
    destination: &Path,
) -> Result<EncodePlan, PlanRejection> {
    if !probe.is_video() {
        return Err(PlanRejection::NotAVideo {
            path: spec.source_path.clone(),
        });
    }

    let audio = probe.has_audio().then_some(AudioParams {
        codec: spec.audio_codec,
        sample_rate: spec.sample_rate,
    });

    Ok(EncodePlan {
        source_path: spec.source_path.clone(),
        destination_path: destination.to_path_buf(),
        video: VideoParams {
            codec,
            frame_rate: spec.frame_rate,
        },
        audio,
    })
}

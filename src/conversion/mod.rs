//! Transcode jobs.
//!
//! A batch goes through four steps:
//!
//! - a [`JobSpec`] describes one requested conversion of a source file;
//! - [`plan_all`] turns a spec plus the source's probe result into one
//!   [`EncodePlan`] per target codec, or rejects a source without video;
//! - [`EncodeExecutor`] runs a plan as a separate ffmpeg process;
//! - [`JobCoordinator`] owns the job table and runs plans on a bounded pool.

mod coordinator;
mod executor;
mod planner;
mod spec;

pub use coordinator::{CoordinatorSettings, JobCoordinator};
pub use executor::{EncodeExecutor, EncodeFailure};
pub use planner::{plan, plan_all, AudioParams, EncodePlan, PlanRejection, VideoParams};
pub use spec::{JobSpec, TranscodeOptions};
pub use transcodr_common::{AudioCodec, FrameRate, SampleRate, VideoCodec};

//! Transcodr-Common: Shared types used across transcodr.
//!
//! - **Typed IDs**: [`JobId`], a UUID wrapper identifying a submitted job
//! - **Option sets**: the fixed choices a user can pick for an encode
//!   ([`VideoCodec`], [`FrameRate`], [`AudioCodec`], [`SampleRate`])
//! - **Error Handling**: parse/validation errors for those option sets
//!
//! # Examples
//!
//! ```
//! use transcodr_common::{FrameRate, SampleRate, VideoCodec};
//!
//! let codec: VideoCodec = "hevc".parse().unwrap();
//! assert_eq!(codec.encoder(), "libx265");
//!
//! let rate: FrameRate = "29.97".parse().unwrap();
//! assert_eq!(rate.filter_value(), "30000/1001");
//!
//! assert!(SampleRate::new(44_100).is_ok());
//! assert!(SampleRate::new(44_000).is_err());
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;

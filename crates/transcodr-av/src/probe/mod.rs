//! Media file probing.
//!
//! Stream metadata comes from the `ffprobe` command-line tool. Each query is
//! restricted to one stream kind, and only the first stream of that kind is
//! kept.

mod ffprobe;
mod types;

pub use ffprobe::{parse_ffprobe_output, probe_stream_kind};
pub use types::*;

use crate::{Error, Result};
use std::path::Path;

/// Probe the first video and first audio stream of `path`.
///
/// A file that exists but holds no stream of a kind yields `None` for that
/// kind. A missing or unopenable file, a tool that cannot be run, or a tool
/// that rejects the file is an error; callers decide how to surface it.
pub fn probe_streams(ffprobe: &Path, path: &Path) -> Result<StreamSet> {
    // Tell an inaccessible source apart from one ffprobe cannot parse
    if let Err(e) = std::fs::File::open(path) {
        return Err(match e.kind() {
            std::io::ErrorKind::NotFound => Error::file_not_found(path),
            _ => Error::source_unreadable(path, e),
        });
    }

    let video = parse_ffprobe_output(&probe_stream_kind(ffprobe, path, StreamKind::Video)?)?.video;
    let audio = parse_ffprobe_output(&probe_stream_kind(ffprobe, path, StreamKind::Audio)?)?.audio;

    Ok(StreamSet { video, audio })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_missing_file() {
        let err = probe_streams(Path::new("ffprobe"), Path::new("/nonexistent/clip.mp4"))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_unopenable_file() {
        use std::os::unix::fs::PermissionsExt;

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::File::open(file.path()).is_ok() {
            // Running as root: permissions are not enforced
            return;
        }

        let err = probe_streams(Path::new("/nonexistent/bin/ffprobe"), file.path()).unwrap_err();
        assert!(matches!(err, Error::SourceUnreadable { .. }), "unexpected error: {err}");
        assert!(!err.is_tool_unavailable());
    }

    #[test]
    fn test_probe_missing_tool() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = probe_streams(Path::new("/nonexistent/bin/ffprobe"), file.path()).unwrap_err();
        assert!(err.is_tool_unavailable(), "unexpected error: {err}");
    }
}

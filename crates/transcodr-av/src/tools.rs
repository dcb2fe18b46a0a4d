//! Locating and checking the ffmpeg tools.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Outcome of running a tool with `-version`.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name the tool is reported under.
    pub name: String,
    /// Whether `-version` ran and exited successfully.
    pub available: bool,
    /// First line of the version banner.
    pub version: Option<String>,
    /// Resolved executable, when it could be located.
    pub path: Option<PathBuf>,
}

impl ToolInfo {
    fn unavailable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        }
    }
}

/// Check a tool found on `PATH`.
///
/// ```no_run
/// let ffprobe = transcodr_av::check_tool("ffprobe");
/// if let Some(version) = &ffprobe.version {
///     println!("{version}");
/// }
/// ```
pub fn check_tool(name: &str) -> ToolInfo {
    check_tool_at(name, Path::new(name))
}

/// Check the executable at `program`, reporting it under `name`.
pub fn check_tool_at(name: &str, program: &Path) -> ToolInfo {
    let output = match Command::new(program).arg("-version").output() {
        Ok(output) if output.status.success() => output,
        _ => return ToolInfo::unavailable(name),
    };

    ToolInfo {
        name: name.to_string(),
        available: true,
        version: String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(str::to_string),
        path: which::which(program).ok(),
    }
}

/// Executable for `name`: the configured path if it exists, else the
/// `PATH` match.
///
/// # Errors
///
/// [`Error::ToolNotFound`] when neither is available.
pub fn get_tool_path(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("Configured {} {:?} does not exist, using PATH", name, path);
    }

    which::which(name).map_err(|_| Error::tool_not_found(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING: &str = "transcodr_missing_tool_12345";

    #[test]
    fn test_check_missing_tool() {
        let info = check_tool(MISSING);
        assert_eq!(info.name, MISSING);
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_check_tool_at_reads_version_banner() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ffprobe");
        let mut file = std::fs::File::create(&script).unwrap();
        writeln!(file, "#!/bin/sh\necho 'ffprobe version 6.1'\necho 'built with gcc'").unwrap();
        drop(file);
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let info = check_tool_at("ffprobe", &script);
        assert!(info.available);
        assert_eq!(info.version.as_deref(), Some("ffprobe version 6.1"));
        assert!(info.path.is_some());
    }

    #[test]
    fn test_configured_path_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = get_tool_path(MISSING, Some(file.path())).unwrap();
        assert_eq!(path, file.path());
    }

    #[test]
    fn test_missing_configured_path_falls_back_to_path() {
        let err = get_tool_path(MISSING, Some(Path::new("/nonexistent/bin/ffprobe"))).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));

        let err = get_tool_path(MISSING, None).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}

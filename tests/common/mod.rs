//! Shared test harness for integration tests.
//!
//! Provides [`FakeProbe`], which decides a file's streams from its name, and
//! fake `ffmpeg` / `ffprobe` shell scripts so the coordinator spawns real
//! processes without the real tools installed.
//!
//! The fake ffmpeg writes its argument list next to the output
//! (`<output>.args`) and then, depending on the source file name:
//! - `fail-all` or `fail-<encoder>` (e.g. `fail-libx265`): exits 1;
//! - `slow`: sleeps for 30 seconds;
//! - otherwise writes the output file and exits 0.
//!
//! Both scripts answer `-version` like the real tools.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tempfile::TempDir;
use transcodr::conversion::{
    CoordinatorSettings, EncodeExecutor, JobCoordinator, JobSpec, TranscodeOptions,
};
use transcodr::probe::{AudioStream, MediaProbe, ProbeIssue, ProbeResult, Rational, VideoStream};
use transcodr::state::JobStatus;
use transcodr_common::JobId;

const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-fake"
  exit 0
fi
out=""
input=""
venc=""
prev=""
for arg in "$@"; do
  case "$prev" in
    -i) input="$arg" ;;
    -c:v) venc="$arg" ;;
  esac
  prev="$arg"
  out="$arg"
done
printf '%s\n' "$@" > "$out.args"
name=$(basename "$input")
case "$name" in
  *fail-all*|*fail-$venc*)
    echo "[$venc @ 0x5581] Error while opening encoder for output stream #0:0" >&2
    echo "Conversion failed!" >&2
    exit 1 ;;
esac
case "$name" in
  *slow*) exec sleep 30 ;;
esac
echo "encoded by $venc" > "$out"
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffprobe version 6.1-fake"
  exit 0
fi
kind=""
prev=""
file=""
for arg in "$@"; do
  [ "$prev" = "-select_streams" ] && kind="$arg"
  prev="$arg"
  file="$arg"
done
name=$(basename "$file")
case "$name" in
  *.txt) echo "$file: Invalid data found when processing input" >&2; exit 1 ;;
esac
if [ "$kind" = "v" ]; then
  echo '{"streams":[{"index":0,"codec_type":"video","codec_name":"h264","r_frame_rate":"30/1"}]}'
else
  case "$name" in
    *silent*) echo '{"streams":[]}' ;;
    *) echo '{"streams":[{"index":1,"codec_type":"audio","codec_name":"aac","sample_rate":"48000"}]}' ;;
  esac
fi
"#;

fn tools_dir() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().expect("failed to create tools dir");
        for (name, script) in [("ffmpeg", FAKE_FFMPEG), ("ffprobe", FAKE_FFPROBE)] {
            let path = dir.path().join(name);
            fs::write(&path, script).expect("failed to write fake tool");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("failed to make fake tool executable");
        }
        dir
    })
    .path()
}

/// Path of the fake ffmpeg script.
pub fn fake_ffmpeg() -> PathBuf {
    tools_dir().join("ffmpeg")
}

/// Path of the fake ffprobe script.
pub fn fake_ffprobe() -> PathBuf {
    tools_dir().join("ffprobe")
}

/// Probe that reads stream layout from the file name.
///
/// Missing files are absent; `.txt` files are unreadable; names containing
/// `locked` cannot be opened; names containing `silent` have video only;
/// everything else has video at 30 fps and audio.
pub struct FakeProbe;

impl MediaProbe for FakeProbe {
    fn probe(&self, path: &Path) -> ProbeResult {
        if !path.exists() {
            return ProbeResult::absent(ProbeIssue::SourceMissing);
        }
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        if name.contains("locked") {
            return ProbeResult::absent(ProbeIssue::Inaccessible {
                message: format!("cannot read {}: Permission denied", path.display()),
            });
        }
        if name.ends_with(".txt") {
            return ProbeResult::absent(ProbeIssue::Unreadable {
                message: "Invalid data found when processing input".to_string(),
            });
        }

        let video = Some(VideoStream {
            codec_name: "h264".to_string(),
            frame_rate: Rational::new(30, 1),
        });
        let audio = (!name.contains("silent")).then(|| AudioStream {
            codec_name: "aac".to_string(),
            sample_rate: Some(48_000),
        });
        ProbeResult {
            video,
            audio,
            issue: None,
        }
    }
}

/// Scratch directories for one test: `input/` and `output/`.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create workspace");
        fs::create_dir(dir.path().join("input")).unwrap();
        Self { dir }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.path().join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    /// Create a source file with placeholder content.
    pub fn source(&self, name: &str) -> PathBuf {
        let path = self.input_dir().join(name);
        fs::write(&path, b"not really media").unwrap();
        path
    }

    /// Spec converting `source` into the output directory.
    pub fn spec(&self, source: &Path, options: &TranscodeOptions) -> JobSpec {
        JobSpec::in_dir(source, &self.output_dir(), options).unwrap()
    }
}

pub fn settings(max_concurrent: usize) -> CoordinatorSettings {
    CoordinatorSettings {
        max_concurrent,
        cancel_siblings_on_failure: false,
    }
}

/// Coordinator using [`FakeProbe`] and the fake ffmpeg.
pub fn coordinator(settings: CoordinatorSettings) -> JobCoordinator {
    JobCoordinator::new(
        Arc::new(FakeProbe),
        EncodeExecutor::new(fake_ffmpeg()),
        settings,
    )
}

/// Wait for all dispatched jobs, failing the test if that takes too long.
pub async fn wait_all(coordinator: &JobCoordinator) {
    tokio::time::timeout(Duration::from_secs(20), coordinator.wait())
        .await
        .expect("jobs did not finish in time");
}

/// Poll until `id` reaches `status`.
pub async fn wait_for_status(coordinator: &JobCoordinator, id: JobId, status: JobStatus) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while coordinator.status(id) != Some(status) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("job never reached {status}, now {:?}", coordinator.status(id)));
}

/// Arguments the fake ffmpeg received for `output`.
pub fn recorded_args(output: &Path) -> Vec<String> {
    let mut args_path = output.as_os_str().to_owned();
    args_path.push(".args");
    fs::read_to_string(PathBuf::from(args_path))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

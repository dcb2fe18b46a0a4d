//! FFprobe-based stream probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

/// Run ffprobe restricted to one stream kind and return its raw JSON.
///
/// A file with no stream of that kind is not an error: ffprobe exits zero
/// and prints an empty stream list.
pub fn probe_stream_kind(ffprobe: &Path, path: &Path, kind: StreamKind) -> Result<String> {
    let tool = ffprobe.display().to_string();

    #[cfg(feature = "tracing")]
    tracing::debug!("Probing {} streams of {:?} with {}", kind, path, tool);

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            kind.selector(),
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found(&tool)
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(tool, stderr.trim().to_string()));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))
}

/// Parse ffprobe `-show_streams` JSON into the first video and audio stream.
///
/// Embedded cover art (`attached_pic`) is reported by ffprobe as a video
/// stream but is not one for transcoding purposes.
pub fn parse_ffprobe_output(json: &str) -> Result<StreamSet> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let mut set = StreamSet::empty();

    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") if set.video.is_none() && stream.disposition.attached_pic == 0 => {
                set.video = Some(VideoStream {
                    codec_name: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
                    frame_rate: stream.r_frame_rate.as_deref().and_then(Rational::parse),
                });
            }
            Some("audio") if set.audio.is_none() => {
                set.audio = Some(AudioStream {
                    codec_name: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
                    sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
                });
            }
            _ => {}
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_AND_AUDIO: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "r_frame_rate": "30000/1001",
                "disposition": {"default": 1, "attached_pic": 0}
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "48000",
                "r_frame_rate": "0/0"
            }
        ]
    }"#;

    #[test]
    fn test_parse_video_and_audio() {
        let set = parse_ffprobe_output(VIDEO_AND_AUDIO).unwrap();

        let video = set.video.unwrap();
        assert_eq!(video.codec_name, "h264");
        assert_eq!(video.frame_rate, Rational::new(30_000, 1_001));

        let audio = set.audio.unwrap();
        assert_eq!(audio.codec_name, "aac");
        assert_eq!(audio.sample_rate, Some(48_000));
    }

    #[test]
    fn test_parse_no_streams() {
        let set = parse_ffprobe_output(r#"{"streams": []}"#).unwrap();
        assert_eq!(set, StreamSet::empty());

        // ffprobe omits the key entirely for some inputs
        let set = parse_ffprobe_output("{}").unwrap();
        assert_eq!(set, StreamSet::empty());
    }

    #[test]
    fn test_parse_skips_cover_art() {
        let json = r#"{
            "streams": [
                {"codec_name": "mp3", "codec_type": "audio", "sample_rate": "44100"},
                {"codec_name": "mjpeg", "codec_type": "video", "r_frame_rate": "90000/1",
                 "disposition": {"attached_pic": 1}}
            ]
        }"#;
        let set = parse_ffprobe_output(json).unwrap();
        assert!(set.video.is_none());
        assert_eq!(set.audio.unwrap().codec_name, "mp3");
    }

    #[test]
    fn test_parse_keeps_first_stream_of_each_kind() {
        let json = r#"{
            "streams": [
                {"codec_name": "hevc", "codec_type": "video", "r_frame_rate": "25/1"},
                {"codec_name": "h264", "codec_type": "video", "r_frame_rate": "30/1"}
            ]
        }"#;
        let video = parse_ffprobe_output(json).unwrap().video.unwrap();
        assert_eq!(video.codec_name, "hevc");
        assert_eq!(video.frame_rate, Rational::new(25, 1));
    }

    #[test]
    fn test_parse_unknown_rate_is_absent() {
        let json = r#"{"streams": [{"codec_name": "h264", "codec_type": "video", "r_frame_rate": "0/0"}]}"#;
        let video = parse_ffprobe_output(json).unwrap().video.unwrap();
        assert!(video.frame_rate.is_none());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_ffprobe_output("not json"),
            Err(Error::Json(_))
        ));
    }
}

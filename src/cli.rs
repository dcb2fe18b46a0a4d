use clap::{Parser, Subcommand};
use std::path::PathBuf;
use transcodr::conversion::{AudioCodec, FrameRate, SampleRate, VideoCodec};

#[derive(Parser)]
#[command(name = "transcodr")]
#[command(author, version, about = "Batch video transcoder driving ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcode files (directories are expanded one level deep)
    Transcode {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (defaults to transcode.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Video codec: h264 or h265
        #[arg(long)]
        video_codec: Option<VideoCodec>,

        /// Also produce this video codec; outputs go to per-codec subfolders
        #[arg(long = "also", value_name = "CODEC")]
        also: Vec<VideoCodec>,

        /// Frame rate: 23.976, 24, 25, 29.97, 30, 50 or 60
        #[arg(long)]
        frame_rate: Option<FrameRate>,

        /// Audio codec: aac or mp3
        #[arg(long)]
        audio_codec: Option<AudioCodec>,

        /// Audio sample rate in Hz
        #[arg(long)]
        sample_rate: Option<SampleRate>,

        /// Maximum encodes at once (defaults to transcode.max_concurrent)
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
    },

    /// Probe a media file and display its streams
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

mod cli;

use transcodr::{
    config,
    conversion::{JobCoordinator, JobSpec, TranscodeOptions, VideoCodec},
    inputs,
    probe::{FfprobeProbe, MediaProbe},
    state::{EncodeOutcome, JobEvent, JobStatus},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Options of the `transcode` command.
struct TranscodeRequest {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    options: TranscodeOptions,
    also: Vec<VideoCodec>,
    jobs: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "transcodr=debug,transcodr_av=debug,transcodr_common=debug".to_string()
        } else {
            "transcodr=info,transcodr_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Transcode {
            inputs,
            output,
            video_codec,
            also,
            frame_rate,
            audio_codec,
            sample_rate,
            jobs,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let defaults = config.defaults;
            let request = TranscodeRequest {
                inputs,
                output,
                options: TranscodeOptions {
                    video_codec: video_codec.unwrap_or(defaults.video_codec),
                    frame_rate: frame_rate.unwrap_or(defaults.frame_rate),
                    audio_codec: audio_codec.unwrap_or(defaults.audio_codec),
                    sample_rate: sample_rate.unwrap_or(defaults.sample_rate),
                },
                also,
                jobs,
            };

            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            let all_ok = rt.block_on(transcode(config, request))?;
            if !all_ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Probe { file, json } => probe_file(&file, json, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("transcodr {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Run one batch. Returns false if any job failed.
async fn transcode(mut config: config::Config, request: TranscodeRequest) -> Result<bool> {
    if let Some(jobs) = request.jobs {
        config.transcode.max_concurrent = jobs;
    }

    let output_dir = request
        .output
        .unwrap_or_else(|| config.transcode.expanded_output_dir());

    let sources = inputs::collect_sources(&request.inputs);
    if sources.is_empty() {
        anyhow::bail!("No input files found");
    }

    let specs: Vec<JobSpec> = sources
        .into_iter()
        .filter_map(|source| {
            let spec = JobSpec::in_dir(&source, &output_dir, &request.options);
            if spec.is_none() {
                tracing::warn!("Ignoring input without a file name: {:?}", source);
            }
            spec
        })
        .map(|spec| {
            request
                .also
                .iter()
                .fold(spec, |spec, codec| spec.with_variant(*codec))
        })
        .collect();

    tracing::info!(
        "Transcoding {} file(s) into {:?} ({}, {} fps, {} @ {} Hz)",
        specs.len(),
        output_dir,
        request.options.video_codec.label(),
        request.options.frame_rate.label(),
        request.options.audio_codec.label(),
        request.options.sample_rate.hz()
    );

    let coordinator = JobCoordinator::from_config(&config);

    // Subscribe before submitting so the initial statuses are printed too
    let done = CancellationToken::new();
    let printer = tokio::spawn(print_events(
        coordinator.clone(),
        coordinator.events(),
        done.clone(),
    ));

    let submitter = coordinator.clone();
    tokio::task::spawn_blocking(move || submitter.submit(specs))
        .await
        .context("Submitting jobs failed")?;

    coordinator.start();

    tokio::select! {
        _ = coordinator.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling all jobs");
            coordinator.shutdown().await;
        }
    }

    done.cancel();
    if let Err(e) = printer.await {
        tracing::warn!("Event printer stopped abnormally: {}", e);
    }

    let summary = coordinator.summary();
    println!();
    println!(
        "{} succeeded, {} failed, {} skipped, {} cancelled",
        summary.succeeded,
        summary.failures(),
        summary.skipped,
        summary.cancelled
    );

    Ok(summary.failures() == 0)
}

/// Print job events until `done` fires, then drain what is left.
async fn print_events(
    coordinator: JobCoordinator,
    mut events: broadcast::Receiver<JobEvent>,
    done: CancellationToken,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => print_event(&coordinator, &event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} job event(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = done.cancelled() => break,
        }
    }

    while let Ok(event) = events.try_recv() {
        print_event(&coordinator, &event);
    }
}

fn print_event(coordinator: &JobCoordinator, event: &JobEvent) {
    let name = coordinator
        .snapshot(event.job_id())
        .map(|job| job.spec.source_name())
        .unwrap_or_else(|| event.job_id().short());

    match event {
        JobEvent::StatusChanged { to, error, .. } => match (to, error) {
            (JobStatus::Queued | JobStatus::Running, _) => {
                println!("[{}] {}", to, name);
            }
            (_, Some(error)) if to.is_failure() || *to == JobStatus::SkippedNotAVideo => {
                println!("[{}] {}: {}", to, name, first_line(error));
            }
            _ => println!("[{}] {}", to, name),
        },
        JobEvent::EncodeStarted {
            variant,
            destination,
            ..
        } => {
            println!("  {} -> {} ({})", name, destination.display(), variant.label());
        }
        JobEvent::EncodeFinished {
            variant,
            outcome,
            diagnostic,
            ..
        } => {
            if *outcome == EncodeOutcome::Failed {
                println!("  {} {} failed", name, variant.label());
                if let Some(diagnostic) = diagnostic {
                    for line in diagnostic.lines() {
                        println!("    {}", line);
                    }
                }
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

fn probe_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let ffprobe = transcodr_av::get_tool_path("ffprobe", config.tools.ffprobe_path.as_deref())?;
    let result = FfprobeProbe::new(ffprobe).probe(file);

    if json {
        let json_str = serde_json::to_string_pretty(&result)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", file.display());
    match &result.video {
        Some(video) => {
            let fps = video
                .frame_rate
                .map(|r| format!("{:.2}", r.to_decimal()))
                .unwrap_or_else(|| "-".to_string());
            println!("Video: {}, {} fps", video.codec_name.to_uppercase(), fps);
        }
        None => println!("Video: -"),
    }
    match &result.audio {
        Some(audio) => {
            let rate = audio
                .sample_rate
                .map(|hz| hz.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("Audio: {}, {} Hz", audio.codec_name.to_uppercase(), rate);
        }
        None => println!("Audio: -"),
    }
    if let Some(issue) = &result.issue {
        println!("Note: {:?}", issue);
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let configured = [
        ("ffmpeg", config.tools.ffmpeg_path.as_deref()),
        ("ffprobe", config.tools.ffprobe_path.as_deref()),
    ];
    let mut all_ok = true;

    for (name, path) in configured {
        let tool = match path {
            Some(path) => transcodr_av::check_tool_at(name, path),
            None => transcodr_av::check_tool(name),
        };
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to transcode.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let max = config.transcode.max_concurrent;
    println!(
        "  Max concurrent encodes: {}",
        if max == 0 {
            format!("{} (CPU count)", config.transcode.effective_max_concurrent())
        } else {
            max.to_string()
        }
    );
    println!(
        "  Cancel siblings on failure: {}",
        config.transcode.cancel_siblings_on_failure
    );
    println!("  Output dir: {}", config.transcode.output_dir.display());
    println!(
        "  Defaults: {}, {} fps, {}, {} Hz",
        config.defaults.video_codec.label(),
        config.defaults.frame_rate.label(),
        config.defaults.audio_codec.label(),
        config.defaults.sample_rate.hz()
    );

    Ok(())
}

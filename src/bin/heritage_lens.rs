//! heritage_lens - detection and statistics over heritage-site media
//!
//! Subcommands:
//! 1. `images`: detect on a batch of image files
//! 2. `video`: sample a stored video (a path, or `-` to read it from stdin)
//! 3. `stream`: resolve a video page link and sample the live stream

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use heritage_lens::ingest::{self, load_images, FrameSource, StagedUpload};
use heritage_lens::resolve::{StreamResolver, YtDlpResolver};
use heritage_lens::ui::Ui;
use heritage_lens::{
    aggregate_lists, load_detector, run_session, summary_text, Annotator, CancelFlag, Detection,
    Frame, KeyMetrics, LensConfig, LensError, SampleFrames, SessionConfig, SessionReport,
    SessionState, StatisticsSummary, DEFAULT_SAMPLE_FRAMES,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Heritage site object detection and statistics")]
struct Args {
    /// Config file (TOML, or JSON with a .json extension).
    #[arg(long, env = "HERITAGE_CONFIG")]
    config: Option<PathBuf>,
    /// Print the result as JSON instead of text.
    #[arg(long)]
    json: bool,
    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect objects in image files.
    Images {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Write annotated copies of each image here.
        #[arg(long)]
        annotated_dir: Option<PathBuf>,
    },
    /// Analyze a stored video file.
    Video {
        /// Video path, or `-` to read the video from stdin.
        path: String,
        /// Sample every N-th frame (overrides config).
        #[arg(long)]
        stride: Option<u32>,
        /// File suffix used when staging stdin input.
        #[arg(long, default_value = ".mp4")]
        suffix: String,
        /// Write a few evenly spaced annotated sample frames here.
        #[arg(long)]
        annotated_dir: Option<PathBuf>,
    },
    /// Analyze a live or online video stream.
    Stream {
        /// Video page link, or a direct stream URL with --direct.
        link: String,
        /// Treat the link as a playable stream URL and skip resolution.
        #[arg(long)]
        direct: bool,
        /// Sample every N-th frame (overrides config).
        #[arg(long)]
        stride: Option<u32>,
        /// Stop after this many seconds (overrides config).
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Write a few evenly spaced annotated sample frames here.
        #[arg(long)]
        annotated_dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct ImageResult<'a> {
    path: String,
    detections: &'a [Detection],
    error: Option<String>,
}

#[derive(Serialize)]
struct ImagesOutput<'a> {
    images: Vec<ImageResult<'a>>,
    summary: &'a StatisticsSummary,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        match err.downcast_ref::<LensError>() {
            Some(lens_err) => eprintln!("error: {}", lens_err.user_message()),
            None => eprintln!("error: {err:#}"),
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = LensConfig::load_from(args.config.as_deref())?;
    let ui = Ui::detect(Some(&args.ui));

    let mut detector = {
        let _stage = ui.stage("Load detection model");
        load_detector(&config)?
    };
    detector.ensure_available()?;
    let annotator = Annotator::from_settings(&config.annotate)?;

    match args.command {
        Command::Images {
            paths,
            annotated_dir,
        } => run_images(
            &ui,
            &mut detector,
            &annotator,
            &paths,
            annotated_dir.as_deref(),
            args.json,
        ),
        Command::Video {
            path,
            stride,
            suffix,
            annotated_dir,
        } => {
            // Kept alive until the session ends; the temp file is removed on drop.
            let staged = if path == "-" {
                let _stage = ui.stage("Stage upload");
                Some(StagedUpload::from_reader(std::io::stdin().lock(), &suffix)?)
            } else {
                None
            };
            let location = match &staged {
                Some(upload) => upload.path_string(),
                None => path,
            };
            let mut source = ingest::open_stored(&location)?;
            let mut session = SessionConfig::stored(&config.session);
            if let Some(stride) = stride {
                session = session.with_stride(stride);
            }
            let duration = source.info().duration_secs();
            let (report, samples) =
                run_with_progress(&ui, &mut source, &mut detector, &annotator, &session)?;
            if let Some(dir) = &annotated_dir {
                write_samples(dir, samples)?;
            }
            print_report(&report, duration, args.json)
        }
        Command::Stream {
            link,
            direct,
            stride,
            timeout_secs,
            annotated_dir,
        } => {
            let (stream_url, duration) = if direct {
                (link, None)
            } else {
                let _stage = ui.stage("Resolve stream");
                let info = YtDlpResolver::from_settings(&config.resolver)
                    .resolve(&link)
                    .map_err(LensError::from)?;
                if let Some(title) = &info.title {
                    log::info!("streaming '{}'", title);
                }
                (info.stream_url, info.duration_secs)
            };
            let mut source = ingest::open_streamed(&stream_url)?;
            let mut session = SessionConfig::streamed(&config.session);
            if let Some(stride) = stride {
                session = session.with_stride(stride);
            }
            if let Some(secs) = timeout_secs {
                session = session.with_timeout(Some(Duration::from_secs(secs)));
            }
            let (report, samples) =
                run_with_progress(&ui, &mut source, &mut detector, &annotator, &session)?;
            if let Some(dir) = &annotated_dir {
                write_samples(dir, samples)?;
            }
            print_report(&report, duration, args.json)
        }
    }
}

fn run_images(
    ui: &Ui,
    detector: &mut heritage_lens::Detector,
    annotator: &Annotator,
    paths: &[PathBuf],
    annotated_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    if let Some(dir) = annotated_dir {
        create_output_dir(dir)?;
    }

    let mut per_image = Vec::with_capacity(paths.len());
    {
        let _stage = ui.stage("Detect objects in images");
        for (index, (path, loaded)) in load_images(paths).into_iter().enumerate() {
            match loaded {
                Ok(frame) => {
                    let (annotated, detections) = detector.process_frame(&frame, annotator);
                    if let Some(dir) = annotated_dir {
                        write_frame(&dir.join(image_output_name(index, &path)), &annotated)?;
                    }
                    per_image.push((path, detections, None));
                }
                Err(err) => {
                    log::warn!("{}: {:#}", path.display(), err);
                    per_image.push((path, Vec::new(), Some(format!("{err:#}"))));
                }
            }
        }
    }

    let lists: Vec<&[Detection]> = per_image.iter().map(|(_, d, _)| d.as_slice()).collect();
    let summary = aggregate_lists(&lists);

    if json {
        let output = ImagesOutput {
            images: per_image
                .iter()
                .map(|(path, detections, error)| ImageResult {
                    path: path.display().to_string(),
                    detections,
                    error: error.clone(),
                })
                .collect(),
            summary: &summary,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for (path, detections, error) in &per_image {
        match error {
            Some(err) => println!("{}: failed ({})", path.display(), err),
            None => println!("{}: {} detection(s)", path.display(), detections.len()),
        }
    }
    println!();
    print_summary(&summary, None);
    Ok(())
}

/// Output name for the `index`-th input image. The index keeps inputs that
/// share a file stem (`a.jpg`, `a.png`, `x/a.jpg`) from overwriting each other.
fn image_output_name(index: usize, path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{index:03}_{stem}.png")
}

fn create_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create output directory {}", dir.display()))
}

fn write_frame(out: &Path, frame: &Frame) -> Result<()> {
    frame
        .to_rgb_image()
        .save(out)
        .with_context(|| format!("write {}", out.display()))
}

fn write_samples(dir: &Path, samples: SampleFrames) -> Result<()> {
    create_output_dir(dir)?;
    let frames = samples.into_frames();
    for (frame_number, frame) in &frames {
        write_frame(&dir.join(format!("frame_{frame_number:06}.png")), frame)?;
    }
    log::info!("wrote {} annotated frame(s) to {}", frames.len(), dir.display());
    Ok(())
}

fn run_with_progress<S: FrameSource + ?Sized>(
    ui: &Ui,
    source: &mut S,
    detector: &mut heritage_lens::Detector,
    annotator: &Annotator,
    session: &SessionConfig,
) -> Result<(SessionReport, SampleFrames)> {
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel()).context("set Ctrl-C handler")?;

    let mut progress = ui.session_progress(source.info().frame_count);
    let mut state = SessionState::new();
    let mut samples = SampleFrames::new(DEFAULT_SAMPLE_FRAMES);
    let report = run_session(source, detector, &mut state, session, &cancel, |sample| {
        progress.update(sample);
        samples.offer(sample, annotator);
    })?;
    progress.finish();
    Ok((report, samples))
}

fn print_report(report: &SessionReport, duration: Option<f64>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!(
        "Stopped: {:?} after {} frames ({} sampled, {} failed) in {:.1}s",
        report.stop_reason,
        report.frames_read,
        report.frames_sampled,
        report.failed_frames,
        report.elapsed_secs
    );
    println!();
    print_summary(&report.summary, duration);
    Ok(())
}

fn print_summary(summary: &StatisticsSummary, duration: Option<f64>) {
    for line in KeyMetrics::from_summary(summary).lines() {
        println!("{line}");
    }
    println!();
    println!("{}", summary_text(summary, duration));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_outputs_with_same_stem_do_not_collide() {
        let inputs = [
            PathBuf::from("site/a.jpg"),
            PathBuf::from("site/a.png"),
            PathBuf::from("other/a.jpg"),
        ];
        let names: Vec<String> = inputs
            .iter()
            .enumerate()
            .map(|(i, p)| image_output_name(i, p))
            .collect();
        assert_eq!(names, ["000_a.png", "001_a.png", "002_a.png"]);
    }
}

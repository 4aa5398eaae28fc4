//! demo - end-to-end synthetic run for HeritageLens
//!
//! Uses the stub detector and `stub://` sources, so no model file, video
//! decoder or network access is needed.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use heritage_lens::ingest::{self, FrameSource};
use heritage_lens::ui::Ui;
use heritage_lens::{
    crop_detections, run_session, summary_text, Annotator, CancelFlag, Detector, KeyMetrics,
    SessionConfig, SessionState, StatisticsSummary,
};
use heritage_lens::detect::StubBackend;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frames in the synthetic stored clip.
    #[arg(long, default_value_t = 50)]
    frames: u64,
    /// Seconds to sample the synthetic stream.
    #[arg(long, default_value_t = 2)]
    stream_seconds: u64,
    /// Frames per second of the synthetic sources.
    #[arg(long, default_value_t = 25)]
    fps: u32,
    /// Write the first annotated frame and its crops here.
    #[arg(long)]
    out: Option<PathBuf>,
    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }
    let ui = Ui::detect(Some(&args.ui));
    let mut detector = Detector::load(Box::new(StubBackend::new()));
    let cancel = CancelFlag::new();

    let stored_summary = {
        let _stage = ui.stage("Analyze synthetic stored clip");
        let location = format!("stub://survey?frames={}&fps={}", args.frames, args.fps);
        let mut source = ingest::open_stored(&location)?;
        let duration = source.info().duration_secs();
        let mut state = SessionState::new();
        let report = run_session(
            &mut source,
            &mut detector,
            &mut state,
            &SessionConfig::new(5),
            &cancel,
            |_| {},
        )?;
        println!("{}", summary_text(&report.summary, duration));
        report.summary
    };

    let stream_summary = {
        let _stage = ui.stage("Analyze synthetic stream");
        let location = format!("stub://live?fps={}&stall_every=7", args.fps);
        let mut source = ingest::open_streamed(&location)?;
        let mut state = SessionState::new();
        let config = SessionConfig::new(2)
            .with_timeout(Some(Duration::from_secs(args.stream_seconds.max(1))));
        let report = run_session(&mut source, &mut detector, &mut state, &config, &cancel, |_| {})?;
        println!(
            "stream stopped ({:?}) after {} frames",
            report.stop_reason, report.frames_read
        );
        report.summary
    };

    let combined = StatisticsSummary::combine(&stored_summary, &stream_summary);
    println!();
    for line in KeyMetrics::from_summary(&combined).lines() {
        println!("{line}");
    }

    if let Some(out) = &args.out {
        let _stage = ui.stage("Write annotated sample");
        write_sample(out, &mut detector)?;
    }
    Ok(())
}

fn write_sample(out: &std::path::Path, detector: &mut Detector) -> Result<()> {
    std::fs::create_dir_all(out)?;
    let mut source = ingest::open_stored("stub://sample?frames=1")?;
    let frame = match source.poll_frame()? {
        ingest::FramePoll::Frame(frame) => frame,
        _ => return Err(anyhow!("synthetic source produced no frame")),
    };
    let (annotated, detections) = detector.process_frame(&frame, &Annotator::default());
    annotated.to_rgb_image().save(out.join("annotated.png"))?;
    for (idx, crop) in crop_detections(&frame, &detections).iter().enumerate() {
        crop.to_rgb_image().save(out.join(format!("crop_{idx}.png")))?;
    }
    println!(
        "wrote annotated frame with {} detection(s) to {}",
        detections.len(),
        out.display()
    );
    Ok(())
}

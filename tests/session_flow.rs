use std::time::{Duration, Instant};

use heritage_lens::detect::StubBackend;
use heritage_lens::ingest::{open_streamed, open_stored};
use heritage_lens::{
    run_session, CancelFlag, Detector, LensConfig, SessionConfig, SessionState, StopReason,
};

fn stub_detector() -> Detector {
    Detector::load(Box::new(StubBackend::new()))
}

#[test]
fn stored_clip_samples_with_configured_stride() {
    let config = LensConfig::default();
    let mut source = open_stored("stub://survey?frames=20&width=16&height=12").unwrap();
    let mut detector = stub_detector();
    let mut state = SessionState::new();
    let mut progress = Vec::new();

    let report = run_session(
        &mut source,
        &mut detector,
        &mut state,
        &SessionConfig::stored(&config.session),
        &CancelFlag::new(),
        |sample| progress.push(sample.progress),
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(report.frames_read, 20);
    assert_eq!(report.frames_sampled, 4);
    assert_eq!(report.summary.total_detections, state.running_detections.len());
    assert_eq!(progress.last().copied().flatten(), Some(1.0));
    assert!(!state.active);
}

#[test]
fn stalled_stream_is_polled_again() {
    let mut source =
        open_streamed("stub://live?frames=20&width=8&height=8&stall_every=4").unwrap();
    let mut detector = stub_detector();
    let mut state = SessionState::new();
    let config = SessionConfig {
        stride: 2,
        timeout: Some(Duration::from_secs(30)),
        stall_backoff: Duration::from_millis(1),
    };

    let report = run_session(
        &mut source,
        &mut detector,
        &mut state,
        &config,
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(report.frames_read, 20);
    assert_eq!(report.frames_sampled, 10);
}

#[test]
fn stalled_stored_source_ends_session() {
    let mut source = open_stored("stub://clip?frames=20&width=8&height=8&stall_every=4").unwrap();
    let mut detector = stub_detector();
    let mut state = SessionState::new();

    let report = run_session(
        &mut source,
        &mut detector,
        &mut state,
        &SessionConfig::new(1),
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(report.frames_read, 3);
}

#[test]
fn cancel_stops_at_frame_boundary() {
    let mut source = open_streamed("stub://live?width=8&height=8").unwrap();
    let mut detector = stub_detector();
    let mut state = SessionState::new();
    let cancel = CancelFlag::new();
    let remote = cancel.clone();

    let report = run_session(
        &mut source,
        &mut detector,
        &mut state,
        &SessionConfig::new(1),
        &cancel,
        |sample| {
            if sample.frames_sampled == 5 {
                remote.cancel();
            }
        },
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.frames_sampled, 5);
    assert_eq!(report.summary.total_detections, state.running_detections.len());
}

#[test]
fn endless_stream_finalizes_on_timeout() {
    let mut source = open_streamed("stub://live?width=8&height=8&stall_every=2").unwrap();
    let mut detector = stub_detector();
    let mut state = SessionState::new();
    let config = SessionConfig {
        stride: 2,
        timeout: Some(Duration::from_millis(200)),
        stall_backoff: Duration::from_millis(5),
    };

    let started = Instant::now();
    let report = run_session(
        &mut source,
        &mut detector,
        &mut state,
        &config,
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    assert_eq!(report.stop_reason, StopReason::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(report.frames_read > 0);
    assert_eq!(report.summary, state.summary());
}

#[test]
fn missing_video_is_source_unavailable() {
    let err = open_stored("/nonexistent/site_survey.mp4").err().unwrap();
    assert!(err.user_message().contains("/nonexistent/site_survey.mp4"));
    assert!(open_stored("https://example.com/video.mp4").is_err());
}

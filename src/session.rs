//! Video session accumulation.
//!
//! A session pulls frames from one [`FrameSource`], samples every N-th frame,
//! runs the detector on it and extends a single running detection list held
//! in a caller-owned [`SessionState`]. Summaries are always recomputed from
//! that full list, so a session stopped early (cancel, timeout, source error)
//! still has a consistent summary of what was processed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::annotate::Annotator;
use crate::config::SessionSettings;
use crate::detect::{Detection, Detector};
use crate::error::LensError;
use crate::frame::Frame;
use crate::ingest::{FramePoll, FrameSource, MediaKind};
use crate::stats::{aggregate, StatisticsSummary};

/// Accumulated state of one session, owned by the orchestrating caller.
#[derive(Debug, Default)]
pub struct SessionState {
    pub running_detections: Vec<Detection>,
    pub active: bool,
    pub started_at: Option<Instant>,
    pub frames_read: u64,
    pub frames_sampled: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh session, discarding anything accumulated before.
    pub fn begin(&mut self) {
        self.reset();
        self.active = true;
        self.started_at = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.active = false;
    }

    pub fn reset(&mut self) {
        self.running_detections.clear();
        self.active = false;
        self.started_at = None;
        self.frames_read = 0;
        self.frames_sampled = 0;
    }

    /// Statistics over everything accumulated so far.
    pub fn summary(&self) -> StatisticsSummary {
        aggregate(&self.running_detections)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }
}

/// Sampling and stopping rules for one session.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Sample every N-th frame (N >= 1).
    pub stride: u32,
    /// Soft wall-clock limit; `None` runs until the source ends.
    pub timeout: Option<Duration>,
    /// Wait between polls of a stalled streamed source.
    pub stall_backoff: Duration,
}

impl SessionConfig {
    pub fn new(stride: u32) -> Self {
        Self {
            stride: stride.max(1),
            timeout: None,
            stall_backoff: Duration::from_millis(100),
        }
    }

    pub fn stored(settings: &SessionSettings) -> Self {
        Self {
            stride: settings.stored_stride.max(1),
            timeout: None,
            stall_backoff: settings.stall_backoff,
        }
    }

    pub fn streamed(settings: &SessionSettings) -> Self {
        Self {
            stride: settings.streamed_stride.max(1),
            timeout: Some(settings.stream_timeout),
            stall_backoff: settings.stall_backoff,
        }
    }

    pub fn for_kind(kind: MediaKind, settings: &SessionSettings) -> Self {
        match kind {
            MediaKind::Stored => Self::stored(settings),
            MediaKind::Streamed => Self::streamed(settings),
        }
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Shared stop request, checked once per frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum StopReason {
    /// The source ran out of frames.
    Exhausted,
    Cancelled,
    TimedOut,
    /// The source failed mid-session; accumulated results are kept.
    SourceError(String),
}

/// Progress after one sampled frame.
#[derive(Clone, Debug)]
pub struct SampleUpdate<'a> {
    /// The sampled frame, as decoded.
    pub frame: &'a Frame,
    /// Detections found in this frame.
    pub detections: &'a [Detection],
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub frame_detections: usize,
    pub total_detections: usize,
    /// Fraction of the source consumed, when its length is known.
    pub progress: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub stop_reason: StopReason,
    pub frames_read: u64,
    pub frames_sampled: u64,
    pub failed_frames: u64,
    pub elapsed_secs: f64,
    pub summary: StatisticsSummary,
}

/// Default number of annotated frames kept for display.
pub const DEFAULT_SAMPLE_FRAMES: usize = 6;

/// Bounded, evenly spaced set of annotated sampled frames.
///
/// Works without knowing the session length: whenever the set overflows,
/// every other kept frame is dropped and the keep interval doubles, so the
/// frames that remain are always equally far apart.
pub struct SampleFrames {
    capacity: usize,
    interval: u64,
    offered: u64,
    frames: Vec<(u64, Frame)>,
}

impl SampleFrames {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            interval: 1,
            offered: 0,
            frames: Vec::new(),
        }
    }

    /// Offer one sampled frame; it is annotated only when kept.
    pub fn offer(&mut self, sample: &SampleUpdate<'_>, annotator: &Annotator) {
        let index = self.offered;
        self.offered += 1;
        if index % self.interval != 0 {
            return;
        }
        let annotated = annotator.annotate(sample.frame, sample.detections);
        self.frames.push((sample.frames_read, annotated));
        if self.frames.len() > self.capacity {
            let mut position = 0usize;
            self.frames.retain(|_| {
                let keep = position % 2 == 0;
                position += 1;
                keep
            });
            self.interval *= 2;
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `(frame number, annotated frame)` pairs in session order.
    pub fn frames(&self) -> &[(u64, Frame)] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<(u64, Frame)> {
        self.frames
    }
}

/// Drive one session to completion.
///
/// Fails only with `ModelUnavailable`, before any frame is read. Every other
/// way a session can end is reported through [`SessionReport::stop_reason`],
/// and `state.active` is false on return.
pub fn run_session<S, F>(
    source: &mut S,
    detector: &mut Detector,
    state: &mut SessionState,
    config: &SessionConfig,
    cancel: &CancelFlag,
    mut on_sample: F,
) -> Result<SessionReport, LensError>
where
    S: FrameSource + ?Sized,
    F: FnMut(&SampleUpdate<'_>),
{
    detector.ensure_available()?;

    let info = source.info();
    let stride = u64::from(config.stride.max(1));
    let failures_before = detector.inference_failures();
    let mut stalled_since: Option<Instant> = None;

    log::info!(
        "session started on {} (every {} frame(s))",
        source.location(),
        stride
    );
    state.begin();

    let stop_reason = loop {
        if cancel.is_cancelled() {
            break StopReason::Cancelled;
        }
        if config.timeout.is_some_and(|limit| state.elapsed() >= limit) {
            log::warn!(
                "{}: session time limit reached after {} frames",
                source.location(),
                state.frames_read
            );
            break StopReason::TimedOut;
        }

        match source.poll_frame() {
            Ok(FramePoll::Frame(frame)) => {
                stalled_since = None;
                state.frames_read += 1;
                if state.frames_read % stride != 0 {
                    continue;
                }
                state.frames_sampled += 1;
                let detections = detector.detect(&frame);
                log::debug!(
                    "frame {}: {} detection(s)",
                    state.frames_read,
                    detections.len()
                );
                let frame_detections = detections.len();
                on_sample(&SampleUpdate {
                    frame: &frame,
                    detections: &detections,
                    frames_read: state.frames_read,
                    frames_sampled: state.frames_sampled,
                    frame_detections,
                    total_detections: state.running_detections.len() + frame_detections,
                    progress: (info.frame_count > 0).then(|| {
                        (state.frames_read as f64 / info.frame_count as f64).min(1.0)
                    }),
                });
                state.running_detections.extend(detections);
            }
            Ok(FramePoll::Stalled) => match info.kind {
                MediaKind::Stored => break StopReason::Exhausted,
                MediaKind::Streamed => {
                    if stalled_since.is_none() {
                        log::warn!("{}: no frame available, waiting", source.location());
                        stalled_since = Some(Instant::now());
                    }
                    thread::sleep(config.stall_backoff);
                }
            },
            Ok(FramePoll::Finished) => break StopReason::Exhausted,
            Err(err) => {
                log::error!("{}: source failed: {:#}", source.location(), err);
                break StopReason::SourceError(format!("{err:#}"));
            }
        }
    };

    state.finish();
    let report = SessionReport {
        stop_reason,
        frames_read: state.frames_read,
        frames_sampled: state.frames_sampled,
        failed_frames: detector.inference_failures() - failures_before,
        elapsed_secs: state.elapsed().as_secs_f64(),
        summary: state.summary(),
    };
    log::info!(
        "session ended ({:?}): {} frames read, {} sampled, {} detections",
        report.stop_reason,
        report.frames_read,
        report.frames_sampled,
        report.summary.total_detections
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::{ScriptStep, ScriptedBackend};
    use crate::detect::{BoundingBox, RawDetection, StubBackend};
    use crate::ingest::SourceInfo;
    use anyhow::anyhow;

    struct CountingSource {
        kind: MediaKind,
        remaining: u64,
        fail_after: Option<u64>,
        polled: u64,
    }

    impl CountingSource {
        fn stored(frames: u64) -> Self {
            Self {
                kind: MediaKind::Stored,
                remaining: frames,
                fail_after: None,
                polled: 0,
            }
        }
    }

    impl FrameSource for CountingSource {
        fn poll_frame(&mut self) -> anyhow::Result<FramePoll> {
            self.polled += 1;
            if self.fail_after.is_some_and(|n| self.polled > n) {
                return Err(anyhow!("connection reset"));
            }
            if self.remaining == 0 {
                return Ok(FramePoll::Finished);
            }
            self.remaining -= 1;
            Ok(FramePoll::Frame(Frame::filled(8, 8, [0, 0, 0])))
        }

        fn info(&self) -> SourceInfo {
            SourceInfo {
                kind: self.kind,
                frame_rate: 25.0,
                frame_count: 0,
            }
        }

        fn location(&self) -> &str {
            "counting"
        }
    }

    fn one_detection() -> ScriptStep {
        ScriptStep::Detections(vec![RawDetection::new(
            BoundingBox::new(1.0, 1.0, 4.0, 4.0),
            0.8,
            0,
        )])
    }

    #[test]
    fn samples_every_nth_frame() {
        let mut source = CountingSource::stored(10);
        let mut detector = Detector::load(Box::new(ScriptedBackend::new(vec![one_detection(); 10])));
        let mut state = SessionState::new();
        let report = run_session(
            &mut source,
            &mut detector,
            &mut state,
            &SessionConfig::new(5),
            &CancelFlag::new(),
            |_| {},
        )
        .unwrap();

        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.frames_read, 10);
        assert_eq!(report.frames_sampled, 2);
        assert_eq!(report.summary.total_detections, 2);
        assert!(!state.active);
    }

    #[test]
    fn accumulation_never_decreases() {
        let mut source = CountingSource::stored(12);
        let mut detector = Detector::load(Box::new(StubBackend::new()));
        let mut state = SessionState::new();
        let mut totals = Vec::new();
        run_session(
            &mut source,
            &mut detector,
            &mut state,
            &SessionConfig::new(1),
            &CancelFlag::new(),
            |update| totals.push(update.total_detections),
        )
        .unwrap();

        assert_eq!(totals.len(), 12);
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn source_error_keeps_partial_summary() {
        let mut source = CountingSource {
            fail_after: Some(3),
            ..CountingSource::stored(10)
        };
        let mut detector = Detector::load(Box::new(ScriptedBackend::new(vec![one_detection(); 10])));
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

        assert!(matches!(report.stop_reason, StopReason::SourceError(ref m) if m.contains("connection reset")));
        assert_eq!(report.summary.total_detections, 3);
        assert!(!state.active);
    }

    #[test]
    fn unavailable_model_fails_before_reading() {
        let mut source = CountingSource::stored(3);
        let mut detector = Detector::load(Box::new(ScriptedBackend::failing_load("missing weights")));
        let mut state = SessionState::new();
        let err = run_session(
            &mut source,
            &mut detector,
            &mut state,
            &SessionConfig::new(1),
            &CancelFlag::new(),
            |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, LensError::ModelUnavailable { .. }));
        assert_eq!(source.polled, 0);
    }

    #[test]
    fn sample_frames_stay_bounded_and_evenly_spaced() {
        let mut source = CountingSource::stored(100);
        let mut detector = Detector::load(Box::new(StubBackend::new()));
        let mut state = SessionState::new();
        let annotator = Annotator::default();
        let mut samples = SampleFrames::new(DEFAULT_SAMPLE_FRAMES);
        run_session(
            &mut source,
            &mut detector,
            &mut state,
            &SessionConfig::new(2),
            &CancelFlag::new(),
            |sample| samples.offer(sample, &annotator),
        )
        .unwrap();

        let numbers: Vec<u64> = samples.frames().iter().map(|(n, _)| *n).collect();
        assert!(!numbers.is_empty() && numbers.len() <= DEFAULT_SAMPLE_FRAMES);
        assert_eq!(numbers[0], 2);
        let gaps: Vec<u64> = numbers.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(gaps.windows(2).all(|g| g[0] == g[1]));
    }

    #[test]
    fn short_sessions_keep_every_sample() {
        let frame = Frame::filled(4, 4, [0, 0, 0]);
        let annotator = Annotator::default();
        let mut samples = SampleFrames::new(6);
        for n in 1..=4u64 {
            samples.offer(
                &SampleUpdate {
                    frame: &frame,
                    detections: &[],
                    frames_read: n,
                    frames_sampled: n,
                    frame_detections: 0,
                    total_detections: 0,
                    progress: None,
                },
                &annotator,
            );
        }
        assert_eq!(samples.len(), 4);
    }

    #[test]
    fn begin_discards_previous_session() {
        let mut state = SessionState::new();
        state.frames_read = 7;
        state.begin();
        assert!(state.active);
        assert_eq!(state.frames_read, 0);
        assert!(state.started_at.is_some());
        assert!(state.summary().is_empty());
    }
}

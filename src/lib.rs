//! HeritageLens
//!
//! Object detection over heritage-site imagery and video, with per-class
//! statistics for reporting.
//!
//! # Pipeline
//!
//! 1. **Ingest**: images, stored videos and streams become BGR [`Frame`]s.
//! 2. **Detect**: a [`Detector`] wraps one backend and normalizes its raw
//!    output against the fixed class table.
//! 3. **Accumulate**: video sessions sample every N-th frame into one
//!    running detection list owned by a [`SessionState`].
//! 4. **Aggregate**: [`aggregate`] recomputes a [`StatisticsSummary`] from a
//!    full detection list.
//!
//! # Module Structure
//!
//! - `classes`: class ids, names and display colors
//! - `detect`: backends, normalization and the batch adapter
//! - `ingest`: image loading, file and stream sources, staged uploads
//! - `session`: video session accumulation with cancel and timeout
//! - `stats` / `summary`: aggregation and user-facing summaries
//! - `resolve`: page link to stream URL via an external tool
//! - `annotate`: drawing detections onto frames

pub mod annotate;
pub mod classes;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod resolve;
pub mod session;
pub mod stats;
pub mod summary;
pub mod ui;

pub use annotate::Annotator;
pub use classes::{ClassDefinition, ClassId, ClassLabel, Color};
pub use config::LensConfig;
pub use detect::{BoundingBox, Detection, Detector, DetectorBackend, RawDetection};
pub use error::LensError;
pub use frame::{crop_detections, Frame};
pub use ingest::{FramePoll, FrameSource, MediaKind, SourceInfo};
pub use resolve::{ResolveError, StreamInfo, StreamResolver, YtDlpResolver};
pub use session::{
    run_session, CancelFlag, SampleFrames, SampleUpdate, SessionConfig, SessionReport,
    SessionState, StopReason, DEFAULT_SAMPLE_FRAMES,
};
pub use stats::{aggregate, aggregate_lists, StatisticsSummary};
pub use summary::{summary_text, KeyMetrics};

/// Build and load the detector named by the configuration.
///
/// A model that fails to load yields a detector that reports
/// `ModelUnavailable`; only an unknown backend name is an error here.
pub fn load_detector(config: &LensConfig) -> anyhow::Result<Detector> {
    let backend = detect::backends::from_settings(&config.detector)?;
    Ok(Detector::load(backend))
}

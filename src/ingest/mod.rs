//! Frame ingestion sources.
//!
//! This module provides the sources that feed frames into detection:
//! - Local video files (`FileSource`, FFmpeg behind feature `video-ffmpeg`)
//! - Network streams resolved to a playable URL (`StreamSource`)
//! - Image files (`images`)
//! - `stub://` synthetic sources for demos and tests
//!
//! Video sources are pulled one frame at a time through [`FrameSource`]. A
//! source is lazy, finite and non-restartable: once it reports
//! [`FramePoll::Finished`] it keeps doing so. Decoder handles are released when
//! the source is dropped.

#[cfg(feature = "video-ffmpeg")]
pub(crate) mod ffmpeg;
pub mod file;
pub mod images;
pub mod stream;
mod synthetic;
pub mod upload;

pub use file::{FileConfig, FileSource};
pub use images::{load_image, load_images};
pub use stream::{StreamConfig, StreamSource};
pub use upload::StagedUpload;

use serde::Serialize;

use crate::frame::Frame;

/// Whether a source is a stored file or a live/streamed feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    Stored,
    Streamed,
}

/// Outcome of pulling one frame.
#[derive(Debug)]
pub enum FramePoll {
    Frame(Frame),
    /// No frame right now; a live source may produce one later.
    Stalled,
    /// The source has no more frames.
    Finished,
}

/// Source properties used for progress estimation only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceInfo {
    pub kind: MediaKind,
    /// Frames per second, `0.0` when unknown.
    pub frame_rate: f64,
    /// Total frames, `0` when unknown (typical for streams).
    pub frame_count: u64,
}

impl SourceInfo {
    /// Duration implied by frame count and rate, if both are known.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.frame_rate > 0.0 && self.frame_count > 0 {
            Some(self.frame_count as f64 / self.frame_rate)
        } else {
            None
        }
    }
}

/// Pull interface over decoded BGR frames.
pub trait FrameSource {
    /// Pull the next frame. Blocks at most for one decode step.
    fn poll_frame(&mut self) -> anyhow::Result<FramePoll>;

    fn info(&self) -> SourceInfo;

    /// Path or URL, for logs and error messages.
    fn location(&self) -> &str;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn poll_frame(&mut self) -> anyhow::Result<FramePoll> {
        (**self).poll_frame()
    }

    fn info(&self) -> SourceInfo {
        (**self).info()
    }

    fn location(&self) -> &str {
        (**self).location()
    }
}

/// Open a stored video, mapping failure to `SourceUnavailable`.
pub fn open_stored(path: &str) -> Result<FileSource, crate::error::LensError> {
    FileSource::open(FileConfig::new(path))
        .map_err(|err| crate::error::LensError::source_unavailable(path, format!("{err:#}")))
}

/// Open a stream URL, mapping failure to `SourceUnavailable`.
pub fn open_streamed(url: &str) -> Result<StreamSource, crate::error::LensError> {
    StreamSource::open(StreamConfig::new(url))
        .map_err(|err| crate::error::LensError::source_unavailable(url, format!("{err:#}")))
}

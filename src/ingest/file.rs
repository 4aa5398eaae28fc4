//! Local video file source.
//!
//! `FileSource` decodes a stored video from a local path. It only accepts
//! local paths (no URL schemes) apart from `stub://` synthetic clips. Real
//! files are decoded with FFmpeg when the `video-ffmpeg` feature is enabled.

use anyhow::{anyhow, Result};

#[cfg(feature = "video-ffmpeg")]
use super::ffmpeg::FfmpegSource;
use super::synthetic::SyntheticSource;
use super::{FramePoll, FrameSource, MediaKind, SourceInfo};

/// Synthetic clips without an explicit `frames` parameter are this long.
const DEFAULT_STUB_FRAMES: u64 = 100;

/// Configuration for a local file source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local file path (e.g., "/tmp/site_survey.mp4").
    pub path: String,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegSource),
}

impl FileSource {
    /// Open the file. Fails when the path is not local or cannot be decoded.
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file sources only support local paths (no URL schemes): '{}'",
                config.path
            ));
        }
        if config.path.starts_with("stub://") {
            return Ok(Self {
                backend: FileBackend::Synthetic(SyntheticSource::from_url(
                    &config.path,
                    MediaKind::Stored,
                    Some(DEFAULT_STUB_FRAMES),
                )?),
            });
        }
        if !std::path::Path::new(&config.path).exists() {
            return Err(anyhow!("video file not found: {}", config.path));
        }
        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: FileBackend::Ffmpeg(FfmpegSource::open(&config.path, MediaKind::Stored)?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!("video decoding requires the video-ffmpeg feature"))
        }
    }
}

impl FrameSource for FileSource {
    fn poll_frame(&mut self) -> Result<FramePoll> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.poll_frame(),
            #[cfg(feature = "video-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.poll_frame(),
        }
    }

    fn info(&self) -> SourceInfo {
        match &self.backend {
            FileBackend::Synthetic(source) => source.info(),
            #[cfg(feature = "video-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.info(),
        }
    }

    fn location(&self) -> &str {
        match &self.backend {
            FileBackend::Synthetic(source) => source.location(),
            #[cfg(feature = "video-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.location(),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}

//! Network stream source.
//!
//! `StreamSource` decodes a directly playable stream URL, usually the output
//! of a [`StreamResolver`](crate::resolve::StreamResolver). `stub://` URLs
//! give an endless synthetic stream unless `frames` is set.

use anyhow::{anyhow, Result};

#[cfg(feature = "video-ffmpeg")]
use super::ffmpeg::FfmpegSource;
use super::synthetic::SyntheticSource;
use super::{FramePoll, FrameSource, MediaKind, SourceInfo};

/// Configuration for a stream source.
#[derive(Clone, Debug, Default)]
pub struct StreamConfig {
    /// Playable URL (e.g., "https://.../videoplayback?...", "rtsp://cam/stream").
    pub url: String,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Stream frame source.
pub struct StreamSource {
    backend: StreamBackend,
}

enum StreamBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegSource),
}

impl StreamSource {
    pub fn open(config: StreamConfig) -> Result<Self> {
        if config.url.starts_with("stub://") {
            return Ok(Self {
                backend: StreamBackend::Synthetic(SyntheticSource::from_url(
                    &config.url,
                    MediaKind::Streamed,
                    None,
                )?),
            });
        }
        if !config.url.contains("://") {
            return Err(anyhow!("stream sources need a URL, got '{}'", config.url));
        }
        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: StreamBackend::Ffmpeg(FfmpegSource::open(
                    &config.url,
                    MediaKind::Streamed,
                )?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!("stream decoding requires the video-ffmpeg feature"))
        }
    }
}

impl FrameSource for StreamSource {
    fn poll_frame(&mut self) -> Result<FramePoll> {
        match &mut self.backend {
            StreamBackend::Synthetic(source) => source.poll_frame(),
            #[cfg(feature = "video-ffmpeg")]
            StreamBackend::Ffmpeg(source) => source.poll_frame(),
        }
    }

    fn info(&self) -> SourceInfo {
        match &self.backend {
            StreamBackend::Synthetic(source) => source.info(),
            #[cfg(feature = "video-ffmpeg")]
            StreamBackend::Ffmpeg(source) => source.info(),
        }
    }

    fn location(&self) -> &str {
        match &self.backend {
            StreamBackend::Synthetic(source) => source.location(),
            #[cfg(feature = "video-ffmpeg")]
            StreamBackend::Ffmpeg(source) => source.location(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_stream_is_endless_by_default() {
        let mut source = StreamSource::open(StreamConfig::new("stub://live?width=4&height=4")).unwrap();
        assert_eq!(source.info().frame_count, 0);
        assert_eq!(source.info().kind, MediaKind::Streamed);
        for _ in 0..500 {
            assert!(matches!(source.poll_frame().unwrap(), FramePoll::Frame(_)));
        }
    }

    #[test]
    fn plain_paths_are_rejected() {
        assert!(StreamSource::open(StreamConfig::new("video.mp4")).is_err());
    }
}

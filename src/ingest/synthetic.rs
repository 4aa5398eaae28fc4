//! `stub://` sources for demos and tests.
//!
//! Query parameters tune the clip: `frames` (total, omit for endless),
//! `width`, `height`, `fps`, and `stall_every` (every K-th poll reports a
//! stall instead of a frame).

use anyhow::{anyhow, Context, Result};
use url::Url;

use super::{FramePoll, MediaKind, SourceInfo};
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;
const DEFAULT_FPS: f64 = 25.0;
const MAX_SIDE: u32 = 8192;

pub(crate) struct SyntheticSource {
    location: String,
    kind: MediaKind,
    width: u32,
    height: u32,
    fps: f64,
    total_frames: Option<u64>,
    stall_every: Option<u64>,
    frame_count: u64,
    polls: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub(crate) fn from_url(location: &str, kind: MediaKind, default_frames: Option<u64>) -> Result<Self> {
        let url = Url::parse(location).with_context(|| format!("invalid stub url '{}'", location))?;
        if url.scheme() != "stub" {
            return Err(anyhow!("'{}' is not a stub:// url", location));
        }

        let mut source = Self {
            location: location.to_string(),
            kind,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            total_frames: default_frames,
            stall_every: None,
            frame_count: 0,
            polls: 0,
            scene_state: 0,
        };

        for (key, value) in url.query_pairs() {
            let parse = |v: &str| -> Result<u64> {
                v.parse()
                    .map_err(|_| anyhow!("stub parameter '{}' must be an integer", key))
            };
            let dimension = |v: &str| -> Result<u32> {
                u32::try_from(parse(v)?)
                    .ok()
                    .filter(|side| (1..=MAX_SIDE).contains(side))
                    .ok_or_else(|| anyhow!("stub parameter '{}' must be within 1..={}, got {}", key, MAX_SIDE, v))
            };
            match key.as_ref() {
                "frames" => source.total_frames = Some(parse(&value)?),
                "width" => source.width = dimension(&value)?,
                "height" => source.height = dimension(&value)?,
                "fps" => source.fps = parse(&value)? as f64,
                "stall_every" => source.stall_every = Some(parse(&value)?).filter(|k| *k > 0),
                other => log::warn!("ignoring unknown stub parameter '{}'", other),
            }
        }

        log::info!("{}: opened {} (synthetic)", source.kind_name(), source.location);
        Ok(source)
    }

    pub(crate) fn poll_frame(&mut self) -> Result<FramePoll> {
        if self
            .total_frames
            .is_some_and(|total| self.frame_count >= total)
        {
            return Ok(FramePoll::Finished);
        }

        self.polls += 1;
        if self.stall_every.is_some_and(|k| self.polls % k == 0) {
            return Ok(FramePoll::Stalled);
        }

        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        Ok(FramePoll::Frame(Frame::from_bgr(pixels, self.width, self.height)?))
    }

    pub(crate) fn info(&self) -> SourceInfo {
        SourceInfo {
            kind: self.kind,
            frame_rate: self.fps,
            frame_count: self.total_frames.unwrap_or(0),
        }
    }

    pub(crate) fn location(&self) -> &str {
        &self.location
    }

    /// Mostly static background with an occasional scene change.
    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            MediaKind::Stored => "FileSource",
            MediaKind::Streamed => "StreamSource",
        }
    }
}

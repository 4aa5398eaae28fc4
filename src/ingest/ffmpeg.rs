//! FFmpeg-backed decoder shared by file and stream sources.
//!
//! Frames are converted to packed BGR24 in memory. The input context and
//! decoder are closed when the source is dropped.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::{FramePoll, MediaKind, SourceInfo};
use crate::frame::Frame;

pub(crate) struct FfmpegSource {
    location: String,
    kind: MediaKind,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_rate: f64,
    frame_count: u64,
    frames_decoded: u64,
    eof_sent: bool,
    finished: bool,
}

impl FfmpegSource {
    pub(crate) fn open(location: &str, kind: MediaKind) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&location)
            .with_context(|| format!("failed to open '{}' with ffmpeg", location))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("'{}' has no video track", location))?;
        let stream_index = input_stream.index();
        let frame_rate = f64::from(input_stream.avg_frame_rate());
        let frame_count = input_stream.frames().max(0) as u64;
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::BGR24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "opened {} (ffmpeg, {}x{}, {:.1} fps, {} frames)",
            location,
            decoder.width(),
            decoder.height(),
            frame_rate,
            frame_count
        );

        Ok(Self {
            location: location.to_string(),
            kind,
            input,
            stream_index,
            decoder,
            scaler,
            frame_rate: if frame_rate.is_finite() { frame_rate } else { 0.0 },
            frame_count,
            frames_decoded: 0,
            eof_sent: false,
            finished: false,
        })
    }

    pub(crate) fn poll_frame(&mut self) -> Result<FramePoll> {
        if self.finished {
            return Ok(FramePoll::Finished);
        }

        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut bgr_frame = ffmpeg::frame::Video::empty();
                self.scaler
                    .run(&decoded, &mut bgr_frame)
                    .context("scale frame to BGR")?;
                let (pixels, width, height) = frame_to_pixels(&bgr_frame)?;
                self.frames_decoded += 1;
                return Ok(FramePoll::Frame(Frame::from_bgr(pixels, width, height)?));
            }

            if self.eof_sent {
                log::debug!(
                    "{}: end of input after {} frames",
                    self.location,
                    self.frames_decoded
                );
                self.finished = true;
                return Ok(FramePoll::Finished);
            }

            match self.next_packet() {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?,
                None => {
                    self.decoder.send_eof().context("flush ffmpeg decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }

    pub(crate) fn info(&self) -> SourceInfo {
        SourceInfo {
            kind: self.kind,
            frame_rate: self.frame_rate,
            frame_count: self.frame_count,
        }
    }

    pub(crate) fn location(&self) -> &str {
        &self.location
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let stream_index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == stream_index)
            .map(|(_, packet)| packet)
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

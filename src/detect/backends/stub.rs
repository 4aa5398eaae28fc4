use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, RawDetection};
use crate::frame::Frame;

/// Stub backend for demos and tests.
///
/// Derives zero to three detections from a SHA-256 of the frame pixels, so the
/// same frame always yields the same detections and no model file is needed.
#[derive(Default)]
pub struct StubBackend {
    frames_seen: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        self.frames_seen += 1;
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let digest: [u8; 32] = Sha256::digest(frame.as_bgr()).into();
        let (w, h) = (frame.width as f32, frame.height as f32);
        let count = (digest[0] % 4) as usize;

        let detections = (0..count)
            .map(|i| {
                let b = &digest[1 + i * 6..7 + i * 6];
                let unit = |v: u8| v as f32 / 255.0;
                let x1 = unit(b[2]) * w * 0.5;
                let y1 = unit(b[3]) * h * 0.5;
                let bw = (0.1 + unit(b[4]) * 0.4) * w;
                let bh = (0.1 + unit(b[5]) * 0.4) * h;
                RawDetection::new(
                    BoundingBox::new(x1, y1, x1 + bw, y1 + bh),
                    0.30 + unit(b[1]) * 0.69,
                    (b[0] % 4) as i64,
                )
            })
            .collect();
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_is_deterministic_per_frame() {
        let mut backend = StubBackend::new();
        let frame = Frame::filled(64, 48, [10, 20, 30]);

        let first = backend.infer(&frame).unwrap();
        let second = backend.infer(&frame).unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.frames_seen(), 2);

        for det in &first {
            assert!(det.bbox.is_valid());
            assert!(det.bbox.x2 <= 64.0 && det.bbox.y2 <= 48.0);
            assert!((0.0..=1.0).contains(&det.confidence));
            assert!((0..4).contains(&det.class_id));
        }
    }

    #[test]
    fn empty_frame_yields_nothing() {
        let mut backend = StubBackend::new();
        assert!(backend.infer(&Frame::filled(0, 0, [0, 0, 0])).unwrap().is_empty());
    }
}

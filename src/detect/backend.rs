use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps one pretrained model. The pipeline treats it as a black
/// box: `load` once at startup, then `infer` per image or sampled frame.
/// Backends receive frames in BGR order and report boxes in frame pixels.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// One-time model load. A failure disables detection for the process.
    fn load(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run the model over one frame.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn load(&mut self) -> Result<()> {
        (**self).load()
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        (**self).infer(frame)
    }
}

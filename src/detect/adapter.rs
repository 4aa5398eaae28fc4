use crate::annotate::Annotator;
use crate::detect::backend::DetectorBackend;
use crate::detect::normalize::normalize;
use crate::detect::result::Detection;
use crate::error::LensError;
use crate::frame::Frame;

/// Batch detector adapter.
///
/// Owns one backend and turns its raw output into normalized detections.
/// Availability is decided once, by [`Detector::load`]; an unavailable
/// detector answers every frame with an empty list. A backend error is scoped
/// to the frame that raised it: it is logged, counted, and reported as an
/// empty list, so a batch or session keeps going.
pub struct Detector {
    backend: Box<dyn DetectorBackend>,
    unavailable: Option<String>,
    inference_failures: u64,
    last_failure: Option<String>,
}

impl Detector {
    /// Load the backend's model. Never fails; check [`Detector::is_available`].
    pub fn load(mut backend: Box<dyn DetectorBackend>) -> Self {
        let unavailable = match backend.load() {
            Ok(()) => {
                log::info!("detector backend '{}' ready", backend.name());
                None
            }
            Err(err) => {
                log::error!(
                    "detector backend '{}' failed to load: {:#}",
                    backend.name(),
                    err
                );
                Some(format!("{err:#}"))
            }
        };
        Self {
            backend,
            unavailable,
            inference_failures: 0,
            last_failure: None,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }

    /// `ModelUnavailable` when the model failed to load.
    pub fn ensure_available(&self) -> Result<(), LensError> {
        match &self.unavailable {
            Some(reason) => Err(LensError::model_unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Detect objects in one BGR frame, reporting failures to the caller.
    pub fn try_detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, LensError> {
        self.ensure_available()?;
        let raw = self
            .backend
            .infer(frame)
            .map_err(|source| LensError::InferenceFailure { source })?;
        Ok(raw.into_iter().map(normalize).collect())
    }

    /// Detect objects in one BGR frame.
    ///
    /// Returns an empty list when the detector is unavailable or the backend
    /// fails on this frame.
    pub fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        if !self.is_available() {
            return Vec::new();
        }
        match self.try_detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                self.inference_failures += 1;
                log::warn!("{}", err);
                self.last_failure = Some(err.to_string());
                Vec::new()
            }
        }
    }

    /// Detect over a batch, one result list per input frame.
    pub fn detect_batch<'a, I>(&mut self, frames: I) -> Vec<Vec<Detection>>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        frames.into_iter().map(|frame| self.detect(frame)).collect()
    }

    /// Detect and draw the detections onto a copy of the frame.
    pub fn process_frame(&mut self, frame: &Frame, annotator: &Annotator) -> (Frame, Vec<Detection>) {
        let detections = self.detect(frame);
        let annotated = annotator.annotate(frame, &detections);
        (annotated, detections)
    }

    /// Frames whose backend call failed since load.
    pub fn inference_failures(&self) -> u64 {
        self.inference_failures
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }
}

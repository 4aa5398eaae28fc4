//! Error taxonomy for the detection pipeline.
//!
//! Every variant is recovered at the boundary where it happens and reported
//! to the user; none of them is retried automatically.

use thiserror::Error;

use crate::resolve::ResolveError;

#[derive(Debug, Error)]
pub enum LensError {
    /// The detector failed to load. Detection is disabled for the process.
    #[error("detection model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// One image or frame failed inside the detector backend.
    #[error("inference failed: {source:#}")]
    InferenceFailure {
        #[source]
        source: anyhow::Error,
    },

    /// A file or stream could not be opened or stopped producing frames.
    #[error("frame source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// The external stream resolver failed.
    #[error(transparent)]
    ExternalToolFailure(#[from] ResolveError),
}

impl LensError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        LensError::ModelUnavailable {
            reason: reason.into(),
        }
    }

    pub fn source_unavailable(location: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        LensError::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Single-line message with a remediation hint, suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            LensError::ModelUnavailable { reason } => format!(
                "Model failed to load ({reason}). Check that the model file exists and \
                 matches the configured backend."
            ),
            LensError::InferenceFailure { source } => {
                format!("Error during detection: {source:#}")
            }
            LensError::SourceUnavailable { location, reason } => {
                format!("Could not read video from {location}: {reason}")
            }
            LensError::ExternalToolFailure(err) => err.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn messages_are_distinct_per_variant() {
        let model = LensError::model_unavailable("best.onnx not found");
        assert_eq!(
            model.to_string(),
            "detection model unavailable: best.onnx not found"
        );

        let source = LensError::source_unavailable("clip.mp4", "no video track");
        assert_eq!(
            source.to_string(),
            "frame source unavailable (clip.mp4): no video track"
        );

        let tool: LensError = ResolveError::Timeout {
            program: "yt-dlp".to_string(),
            after: Duration::from_secs(30),
        }
        .into();
        assert!(tool.user_message().contains("Timeout"));
        assert!(model.user_message().contains("model file"));
    }
}

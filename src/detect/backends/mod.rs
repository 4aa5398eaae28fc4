pub mod scripted;
pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scripted::{ScriptStep, ScriptedBackend};
pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;

/// Backend names accepted by configuration.
pub const BACKEND_NAMES: [&str; 2] = ["stub", "tract"];

/// Build the configured backend. The model is not loaded yet.
pub fn from_settings(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new())),
        #[cfg(feature = "backend-tract")]
        "tract" => Ok(Box::new(
            TractBackend::new(&settings.model_path, settings.input_size)
                .with_threshold(settings.confidence_threshold)
                .with_iou_threshold(settings.iou_threshold),
        )),
        #[cfg(not(feature = "backend-tract"))]
        "tract" => Err(anyhow!("the tract backend requires the backend-tract feature")),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}

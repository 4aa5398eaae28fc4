mod adapter;
mod backend;
pub mod backends;
mod normalize;
pub mod postprocess;
mod result;

pub use adapter::Detector;
pub use backend::DetectorBackend;
pub use backends::{ScriptStep, ScriptedBackend, StubBackend};
pub use normalize::normalize;
pub use result::{BoundingBox, Detection, RawDetection};

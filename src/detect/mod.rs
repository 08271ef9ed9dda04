//! Human detection.
//!
//! A `DetectorBackend` turns one frame into zero or more `Region`s. Backends
//! are picked by name from a `BackendRegistry` at startup.

mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{MotionBackend, ScriptStep, ScriptedBackend};
pub use registry::BackendRegistry;
pub use result::{DetectionResult, Region};

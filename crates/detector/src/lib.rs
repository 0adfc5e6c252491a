//! Analysis backends.
//!
//! Every backend implements [`Detector`]. [`HuggingFaceDetector`] is the
//! production backend; [`SimulatedDetector`] is a configurable stand-in used
//! by tests and by the client-side fallback path.

pub mod detector;
pub mod error;
pub mod huggingface;
pub mod simulated;

pub use detector::{Detection, Detector, DynDetector};
pub use error::DetectorError;
pub use huggingface::{HuggingFaceConfig, HuggingFaceDetector};
pub use simulated::{Bucket, HIGH_LOAD_MESSAGE, SimulatedDetector, SimulationProfile};

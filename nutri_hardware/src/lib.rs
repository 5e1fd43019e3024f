//! Device and process backends for the smart scale.
//!
//! Every type here implements one of the `nutri_traits` collaborator traits:
//! weight sensors, cameras, inference engines, and result sinks. Errors are
//! `HwError`, boxed at the trait boundary and downcast again in `nutri_core`.
pub mod camera;
pub mod error;
pub mod inference;
pub mod sensor;
pub mod sink;
pub mod util;

pub use camera::{BackendPref, CameraBackend, CaptureSettings, CliCamera, FallbackCamera, MockCamera, select_camera};
pub use inference::{CommandEngine, SimulatedEngine};
pub use sensor::{SerialScale, SimulatedScale, parse_weight_frame};
pub use sink::{CommandSink, JsonlSink};

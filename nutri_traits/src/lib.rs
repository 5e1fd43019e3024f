//! Collaborator traits and shared data types for the smart scale.
//!
//! Everything outside the decision core (weight transport, camera, inference,
//! result delivery) is reached through the traits in this crate so the core
//! stays hardware-agnostic and testable with mocks.
pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use types::{UNKNOWN_LABEL, ImageHandle, NutritionFacts, RankedPrediction, ScoreScale, WeightSample};

/// Boxed error used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Producer side of the weight transport: owned by the sampler thread.
pub trait WeightSensor {
    /// Block until one reading is available or `timeout` expires.
    fn read(&mut self, timeout: std::time::Duration) -> Result<f64, BoxError>;

    /// Re-establish the underlying link after a failed read.
    fn reconnect(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Consumer side of the weight transport: a non-blocking view of the newest reading.
pub trait WeightSource {
    fn latest(&self) -> Option<WeightSample>;
    fn is_connected(&self) -> bool;
}

pub trait Camera {
    fn capture(&mut self) -> Result<ImageHandle, BoxError>;

    /// Short backend name for logs and self-check output.
    fn name(&self) -> &str;
}

pub trait InferenceEngine {
    /// Ranked predictions, highest score first.
    fn classify(&mut self, image: &ImageHandle) -> Result<Vec<RankedPrediction>, BoxError>;

    /// How the raw scores returned by `classify` are normalized.
    fn score_scale(&self) -> ScoreScale;
}

pub trait ResultSink {
    fn submit(&self, facts: &NutritionFacts) -> Result<(), BoxError>;
}

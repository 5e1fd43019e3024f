use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("timeout waiting for sensor")]
    SensorTimeout,
    #[error("sensor disconnected: {0}")]
    Disconnected(String),
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("result sink failed: {0}")]
    Sink(String),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Why a label could not be turned into nutrition facts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("empty label")]
    EmptyLabel,
    #[error("no nutrition entry for '{label}'")]
    NotFound { label: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing camera")]
    MissingCamera,
    #[error("missing inference engine")]
    MissingEngine,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("invalid nutrition entry '{food}': {reason}")]
    InvalidFood { food: String, reason: &'static str },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

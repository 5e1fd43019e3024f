use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("sensor timeout")]
    Timeout,
    #[error("device disconnected: {0}")]
    Disconnected(String),
    #[error("invalid command line: {0}")]
    InvalidCommand(String),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("'{program}' timed out after {ms} ms")]
    CommandTimeout { program: String, ms: u64 },
    #[error("classifier output line {line}: {reason}")]
    Output { line: usize, reason: String },
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "nutriscale", version, about = "Smart food scale")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when the file is absent
    #[arg(long, value_name = "FILE", default_value = "etc/nutriscale.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON lines; logs go to stderr as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the scale and report nutrition for every item placed on it
    Run {
        /// Exit after this many measurement cycles
        #[arg(long, value_name = "N")]
        max_cycles: Option<u64>,
        /// Override scale.poll_ms
        #[arg(long, value_name = "MS")]
        poll_ms: Option<u64>,
    },
    /// Look up nutrition for a label at a given weight
    Resolve {
        /// Classifier label, e.g. "Granny Smith"
        #[arg(long)]
        label: String,
        /// Weight in grams
        #[arg(long)]
        grams: f64,
    },
    /// Classify an image file and show the decision
    Classify {
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },
    /// Capture one still image
    Capture {
        /// Override camera.output
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Report configured backends and what was found on this machine
    SelfCheck,
}

//! Runtime configuration for the decision core.
//!
//! These are separate from the TOML-deserialized config in `nutri_config`;
//! see `conversions` for the mapping.

/// Stabilization thresholds. All comparisons are strict.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityCfg {
    /// IDLE -> STABILIZING once weight > this.
    pub start_threshold_g: f64,
    /// A sample is stable when |weight - anchor| < this.
    pub stable_variance_g: f64,
    /// Any non-idle state drops to IDLE once weight < this.
    pub reset_threshold_g: f64,
    /// Consecutive stable samples needed before the stable event fires.
    pub required_stable_samples: u32,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            start_threshold_g: 10.0,
            stable_variance_g: 2.0,
            reset_threshold_g: 5.0,
            required_stable_samples: 10,
        }
    }
}

/// Confidence gates for the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierCfg {
    /// Gate for an un-promoted (rank 0) decision.
    pub base_threshold: f32,
    /// Gate for a decision promoted by a known keyword.
    pub known_threshold: f32,
    /// Predictions considered per capture.
    pub top_k: usize,
}

impl Default for ClassifierCfg {
    fn default() -> Self {
        Self {
            base_threshold: 0.5,
            known_threshold: 0.2,
            top_k: 5,
        }
    }
}

/// Control-loop pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCfg {
    pub poll_ms: u64,
    /// Stop after this many completed measurement cycles; `None` runs until stopped.
    pub max_cycles: Option<u64>,
}

impl Default for LoopCfg {
    fn default() -> Self {
        Self {
            poll_ms: 100,
            max_cycles: None,
        }
    }
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Decision core of the smart scale (hardware-agnostic).
//!
//! All hardware goes through the traits in `nutri_traits`: weight arrives
//! from a `WeightSource`, images from a `Camera`, predictions from an
//! `InferenceEngine`, and results leave through a `ResultSink`.
//!
//! ## Architecture
//!
//! - **Stabilizer**: IDLE/STABILIZING/PROCESSING/RESULT state machine (`stabilizer`)
//! - **Classifier**: keyword promotion and confidence gates (`classifier`)
//! - **Resolver**: alias mapping, nutrition lookup, weight scaling (`resolver`)
//! - **Pipeline**: capture -> classify -> resolve -> deliver per stable event (`pipeline`)
//! - **Sampler/Runner**: background sensor thread and the polling control loop

pub mod builder;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod dispatcher;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod pipeline;
pub mod resolver;
pub mod runner;
pub mod sampler;
pub mod stabilizer;
pub mod status;
pub mod util;

pub use builder::SmartScaleBuilder;
pub use classifier::{ClassificationDecision, Classifier, KnownKeywords, Verdict};
pub use config::{ClassifierCfg, LoopCfg, StabilityCfg};
pub use error::{BuildError, ResolveError, ScaleError};
pub use pipeline::{CycleOutcome, NoResultReason, Pipeline};
pub use resolver::{AliasTable, LabelResolver, Macros, NutritionTable};
pub use stabilizer::{ScaleState, StabilizationEngine, StableEvent, Transition};
pub use status::StepStatus;

/// Stabilizer and pipeline wired together.
///
/// `step` feeds one weight sample; a stable event runs the pipeline
/// synchronously and completes the cycle before returning.
pub struct SmartScale {
    pub(crate) engine: StabilizationEngine,
    pub(crate) pipeline: Pipeline,
    pub(crate) cycles: u64,
}

impl core::fmt::Debug for SmartScale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SmartScale")
            .field("state", &self.engine.state())
            .field("window", &self.engine.window())
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl SmartScale {
    pub fn builder() -> SmartScaleBuilder {
        SmartScaleBuilder::default()
    }

    pub fn state(&self) -> ScaleState {
        self.engine.state()
    }

    /// Completed measurement cycles (stable events that ran the pipeline).
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn step(&mut self, weight_g: f64) -> StepStatus {
        match self.engine.feed(weight_g) {
            Transition::None => StepStatus::Idle(self.engine.state()),
            Transition::Changed { from, to } => StepStatus::Transitioned { from, to },
            Transition::Stable(event) => {
                let outcome = self.pipeline.process(event);
                if let CycleOutcome::NoResult(reason) = &outcome {
                    tracing::info!(?reason, "cycle ended without a result");
                }
                self.engine.complete();
                self.cycles = self.cycles.saturating_add(1);
                StepStatus::Cycle(outcome)
            }
        }
    }
}

/// Resolver over the built-in nutrition and alias tables.
pub fn default_resolver() -> Result<LabelResolver, BuildError> {
    conversions::resolver_from(
        &nutri_config::defaults::foods(),
        &nutri_config::defaults::aliases(),
    )
}

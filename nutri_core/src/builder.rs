//! Builder for `SmartScale`.
//!
//! Camera and inference engine are required; everything else has defaults
//! (reference thresholds, the built-in nutrition table, no sink).

use crate::classifier::Classifier;
use crate::config::{ClassifierCfg, StabilityCfg};
use crate::dispatcher::{DEFAULT_QUEUE, SinkDispatcher};
use crate::error::BuildError;
use crate::pipeline::Pipeline;
use crate::resolver::LabelResolver;
use crate::stabilizer::StabilizationEngine;
use crate::SmartScale;
use nutri_traits::{Camera, InferenceEngine, ResultSink};

#[derive(Default)]
pub struct SmartScaleBuilder {
    camera: Option<Box<dyn Camera + Send>>,
    engine: Option<Box<dyn InferenceEngine + Send>>,
    sink: Option<Box<dyn ResultSink + Send>>,
    sink_queue: Option<usize>,
    stability: Option<StabilityCfg>,
    classifier: Option<ClassifierCfg>,
    resolver: Option<LabelResolver>,
}

impl SmartScaleBuilder {
    pub fn with_camera(mut self, camera: impl Camera + Send + 'static) -> Self {
        self.camera = Some(Box::new(camera));
        self
    }

    pub fn with_boxed_camera(mut self, camera: Box<dyn Camera + Send>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_engine(mut self, engine: impl InferenceEngine + Send + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    pub fn with_boxed_engine(mut self, engine: Box<dyn InferenceEngine + Send>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_sink(mut self, sink: impl ResultSink + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_boxed_sink(mut self, sink: Option<Box<dyn ResultSink + Send>>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_sink_queue(mut self, n: usize) -> Self {
        self.sink_queue = Some(n);
        self
    }

    pub fn with_stability(mut self, cfg: StabilityCfg) -> Self {
        self.stability = Some(cfg);
        self
    }

    pub fn with_classifier(mut self, cfg: ClassifierCfg) -> Self {
        self.classifier = Some(cfg);
        self
    }

    pub fn with_resolver(mut self, resolver: LabelResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn try_build(self) -> Result<SmartScale, BuildError> {
        let camera = self.camera.ok_or(BuildError::MissingCamera)?;
        let engine = self.engine.ok_or(BuildError::MissingEngine)?;

        let stability = self.stability.unwrap_or_default();
        validate_stability(&stability)?;
        let classifier = self.classifier.unwrap_or_default();
        validate_classifier(&classifier)?;

        let resolver = match self.resolver {
            Some(r) => r,
            None => crate::default_resolver()?,
        };
        if resolver.table().is_empty() {
            return Err(BuildError::InvalidConfig("nutrition table is empty"));
        }

        let sink = self
            .sink
            .map(|s| SinkDispatcher::spawn_boxed(s, self.sink_queue.unwrap_or(DEFAULT_QUEUE)));

        Ok(SmartScale {
            engine: StabilizationEngine::new(stability),
            pipeline: Pipeline::new(camera, engine, Classifier::new(classifier), resolver, sink),
            cycles: 0,
        })
    }
}

fn validate_stability(c: &StabilityCfg) -> Result<(), BuildError> {
    if c.required_stable_samples == 0 {
        return Err(BuildError::InvalidConfig("required_stable_samples must be >= 1"));
    }
    if !(c.stable_variance_g.is_finite() && c.stable_variance_g > 0.0) {
        return Err(BuildError::InvalidConfig("stable_variance_g must be > 0"));
    }
    if !(c.start_threshold_g.is_finite() && c.reset_threshold_g.is_finite()) {
        return Err(BuildError::InvalidConfig("thresholds must be finite"));
    }
    if c.reset_threshold_g > c.start_threshold_g {
        return Err(BuildError::InvalidConfig(
            "reset_threshold_g must be <= start_threshold_g",
        ));
    }
    Ok(())
}

fn validate_classifier(c: &ClassifierCfg) -> Result<(), BuildError> {
    let unit = 0.0..=1.0;
    if !unit.contains(&c.base_threshold) || !unit.contains(&c.known_threshold) {
        return Err(BuildError::InvalidConfig("confidence thresholds must be in [0, 1]"));
    }
    if c.top_k == 0 {
        return Err(BuildError::InvalidConfig("top_k must be >= 1"));
    }
    Ok(())
}

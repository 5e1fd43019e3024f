//! One measurement cycle: capture, classify, decide, resolve, deliver.
//!
//! Every failure ends the cycle with a `NoResult` reason; nothing here
//! propagates an error to the control loop. The caller completes the
//! stabilizer either way.
use crate::classifier::{self, Classifier, KnownKeywords, Verdict};
use crate::dispatcher::SinkDispatcher;
use crate::error::{ResolveError, ScaleError};
use crate::hw_error::{Stage, map_hw_error};
use crate::resolver::LabelResolver;
use crate::stabilizer::StableEvent;
use nutri_traits::{Camera, InferenceEngine, NutritionFacts, UNKNOWN_LABEL};

#[derive(Debug, Clone, PartialEq)]
pub enum NoResultReason {
    CaptureFailed(ScaleError),
    InferenceFailed(ScaleError),
    Rejected {
        label: Option<String>,
        confidence: f32,
        threshold: f32,
    },
    /// The engine's pick was its own "Unknown" class.
    Unidentified { confidence: f32 },
    UnknownFood(ResolveError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Measured(NutritionFacts),
    NoResult(NoResultReason),
}

impl CycleOutcome {
    pub fn facts(&self) -> Option<&NutritionFacts> {
        match self {
            CycleOutcome::Measured(f) => Some(f),
            CycleOutcome::NoResult(_) => None,
        }
    }
}

pub struct Pipeline {
    camera: Box<dyn Camera + Send>,
    engine: Box<dyn InferenceEngine + Send>,
    classifier: Classifier,
    resolver: LabelResolver,
    known: KnownKeywords,
    sink: Option<SinkDispatcher>,
}

impl Pipeline {
    pub fn new(
        camera: Box<dyn Camera + Send>,
        engine: Box<dyn InferenceEngine + Send>,
        classifier: Classifier,
        resolver: LabelResolver,
        sink: Option<SinkDispatcher>,
    ) -> Self {
        let known = resolver.known_keywords();
        Self {
            camera,
            engine,
            classifier,
            resolver,
            known,
            sink,
        }
    }

    pub fn resolver(&self) -> &LabelResolver {
        &self.resolver
    }

    pub fn known_keywords(&self) -> &KnownKeywords {
        &self.known
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn process(&mut self, event: StableEvent) -> CycleOutcome {
        tracing::info!(weight_g = event.weight_g, camera = self.camera.name(), "capturing");
        let image = match self.camera.capture() {
            Ok(img) => img,
            Err(e) => {
                let err = map_hw_error(&*e, Stage::Capture);
                tracing::error!(error = %err, "capture failed");
                return CycleOutcome::NoResult(NoResultReason::CaptureFailed(err));
            }
        };

        let mut predictions = match self.engine.classify(&image) {
            Ok(p) => p,
            Err(e) => {
                let err = map_hw_error(&*e, Stage::Inference);
                tracing::error!(error = %err, image = %image.path.display(), "inference failed");
                return CycleOutcome::NoResult(NoResultReason::InferenceFailed(err));
            }
        };
        classifier::normalize(&mut predictions, self.engine.score_scale());
        predictions.truncate(self.classifier.cfg().top_k);

        let decision = match self.classifier.decide(&predictions, &self.known) {
            Verdict::Accepted(d) => d,
            Verdict::Rejected {
                label,
                confidence,
                threshold,
            } => {
                return CycleOutcome::NoResult(NoResultReason::Rejected {
                    label,
                    confidence,
                    threshold,
                });
            }
        };

        if decision.label.trim().eq_ignore_ascii_case(UNKNOWN_LABEL) {
            tracing::warn!(confidence = decision.confidence, "could not identify food");
            return CycleOutcome::NoResult(NoResultReason::Unidentified {
                confidence: decision.confidence,
            });
        }

        let facts = match self.resolver.resolve(&decision.label, event.weight_g) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(label = %decision.label, error = %e, "no nutrition data");
                return CycleOutcome::NoResult(NoResultReason::UnknownFood(e));
            }
        };

        tracing::info!(
            food = %facts.food_key,
            weight_g = facts.weight_g,
            calories = facts.calories,
            protein_g = facts.protein_g,
            carbs_g = facts.carbs_g,
            fats_g = facts.fats_g,
            "measurement"
        );
        if let Some(sink) = &self.sink {
            sink.dispatch(facts.clone());
        }
        CycleOutcome::Measured(facts)
    }
}

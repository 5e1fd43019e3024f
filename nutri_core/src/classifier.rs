//! Classification decision: keyword promotion and confidence gating.
//!
//! Raw top-1 output is unreliable on food images. When a lower-ranked
//! prediction names a food the scale knows about, that prediction is
//! promoted and judged against the lower `known_threshold`.

use crate::config::ClassifierCfg;
use nutri_traits::{RankedPrediction, ScoreScale};

/// Ordered, lower-cased, de-duplicated keyword set. Iteration order is
/// insertion order, which makes "first match wins" deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownKeywords {
    words: Vec<String>,
}

impl KnownKeywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword; blanks and duplicates are ignored.
    pub fn push(&mut self, word: &str) {
        let w = word.trim().to_lowercase();
        if w.is_empty() || self.words.contains(&w) {
            return;
        }
        self.words.push(w);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// First keyword (in insertion order) contained in `label`, case-insensitive.
    pub fn first_match(&self, label: &str) -> Option<&str> {
        let lower = label.to_lowercase();
        self.iter().find(|kw| lower.contains(kw))
    }
}

impl<S: AsRef<str>> FromIterator<S> for KnownKeywords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut out = Self::new();
        for w in iter {
            out.push(w.as_ref());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationDecision {
    pub label: String,
    pub confidence: f32,
    /// True when a known keyword overrode the rank-0 prediction.
    pub promoted: bool,
}

/// Outcome of the confidence gate. Rejections carry what was seen for logging only.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(ClassificationDecision),
    Rejected {
        label: Option<String>,
        confidence: f32,
        threshold: f32,
    },
}

impl Verdict {
    pub fn accepted(&self) -> Option<&ClassificationDecision> {
        match self {
            Verdict::Accepted(d) => Some(d),
            Verdict::Rejected { .. } => None,
        }
    }
}

/// Bring raw engine scores into [0, 1]. Non-finite scores become 0.
pub fn normalize(predictions: &mut [RankedPrediction], scale: ScoreScale) {
    for p in predictions.iter_mut() {
        let s = scale.normalize(p.score);
        p.score = if s.is_finite() { s } else { 0.0 };
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    cfg: ClassifierCfg,
}

impl Classifier {
    pub fn new(cfg: ClassifierCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &ClassifierCfg {
        &self.cfg
    }

    /// Reduce ranked predictions (rank 0 first, scores already normalized) to a verdict.
    pub fn decide(&self, predictions: &[RankedPrediction], known: &KnownKeywords) -> Verdict {
        let Some(top) = predictions.first() else {
            tracing::warn!("no predictions to decide on");
            return Verdict::Rejected {
                label: None,
                confidence: 0.0,
                threshold: self.cfg.base_threshold,
            };
        };

        let mut decision = ClassificationDecision {
            label: top.label.clone(),
            confidence: top.score,
            promoted: false,
        };

        for (rank, p) in predictions.iter().enumerate() {
            tracing::debug!(rank = rank + 1, label = %p.label, score = p.score, "prediction");
        }

        if !known.is_empty() {
            let hit = predictions
                .iter()
                .enumerate()
                .find_map(|(rank, p)| known.first_match(&p.label).map(|kw| (rank, p, kw)));
            if let Some((rank, p, kw)) = hit {
                if rank > 0 {
                    tracing::info!(label = %p.label, rank = rank + 1, keyword = kw, "known keyword promoted");
                }
                decision = ClassificationDecision {
                    label: p.label.clone(),
                    confidence: p.score,
                    promoted: true,
                };
            }
        }

        let threshold = if decision.promoted {
            self.cfg.known_threshold
        } else {
            self.cfg.base_threshold
        };

        if decision.confidence < threshold {
            tracing::warn!(
                label = %decision.label,
                confidence = decision.confidence,
                threshold,
                "low confidence, ignoring"
            );
            return Verdict::Rejected {
                label: Some(decision.label),
                confidence: decision.confidence,
                threshold,
            };
        }

        tracing::info!(
            label = %decision.label,
            confidence = decision.confidence,
            promoted = decision.promoted,
            "final decision"
        );
        Verdict::Accepted(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p(label: &str, score: f32) -> RankedPrediction {
        RankedPrediction::new(label, score)
    }

    #[test]
    fn promotes_lower_ranked_known_food() {
        let c = Classifier::new(ClassifierCfg::default());
        let known: KnownKeywords = ["banana"].into_iter().collect();
        let v = c.decide(&[p("granny smith", 0.40), p("banana", 0.81)], &known);
        assert_eq!(
            v,
            Verdict::Accepted(ClassificationDecision {
                label: "banana".into(),
                confidence: 0.81,
                promoted: true,
            })
        );
    }

    #[test]
    fn rejects_unpromoted_below_base_threshold() {
        let c = Classifier::new(ClassifierCfg::default());
        let v = c.decide(&[p("granny smith", 0.30)], &KnownKeywords::new());
        assert_eq!(
            v,
            Verdict::Rejected {
                label: Some("granny smith".into()),
                confidence: 0.30,
                threshold: 0.5,
            }
        );
        assert!(v.accepted().is_none());
    }

    #[test]
    fn first_match_by_rank_wins_over_keyword_order() {
        let c = Classifier::new(ClassifierCfg::default());
        let known: KnownKeywords = ["lemon", "orange"].into_iter().collect();
        let v = c.decide(
            &[p("tench", 0.5), p("orange", 0.3), p("lemon", 0.25)],
            &known,
        );
        assert_eq!(v.accepted().map(|d| d.label.as_str()), Some("orange"));
    }

    #[test]
    fn rank_zero_keyword_match_is_promoted_and_uses_known_gate() {
        let c = Classifier::new(ClassifierCfg::default());
        let known: KnownKeywords = ["apple"].into_iter().collect();
        let v = c.decide(&[p("Crab Apple", 0.25)], &known);
        let d = v.accepted().expect("accepted at known gate");
        assert!(d.promoted);
    }

    #[rstest]
    #[case(0.2, true)]
    #[case(0.19, false)]
    fn known_gate_is_inclusive(#[case] score: f32, #[case] accepted: bool) {
        let c = Classifier::new(ClassifierCfg::default());
        let known: KnownKeywords = ["banana"].into_iter().collect();
        let v = c.decide(&[p("pizza", 0.6), p("banana", score)], &known);
        assert_eq!(v.accepted().is_some(), accepted);
    }

    #[test]
    fn empty_predictions_are_rejected() {
        let c = Classifier::new(ClassifierCfg::default());
        let v = c.decide(&[], &KnownKeywords::new());
        assert!(matches!(v, Verdict::Rejected { label: None, .. }));
    }

    #[test]
    fn quantized_scores_are_normalized() {
        let mut preds = vec![p("banana", 204.0), p("x", f32::NAN)];
        normalize(&mut preds, ScoreScale::Quantized);
        assert!((preds[0].score - 0.8).abs() < 1e-6);
        assert_eq!(preds[1].score, 0.0);
    }

    #[test]
    fn keywords_are_deduplicated_in_insertion_order() {
        let k: KnownKeywords = ["Apple", "banana", "apple", " "].into_iter().collect();
        assert_eq!(k.iter().collect::<Vec<_>>(), vec!["apple", "banana"]);
    }
}

//! Image classifiers.
//!
//! `CommandEngine` runs an external classifier once per image. The program
//! prints one prediction per line as `<score> <label-or-class-index>`; blank
//! lines and `#` comments are ignored. Class indices are mapped through the
//! labels list when one is configured.
use crate::error::HwError;
use crate::util::{command_from, run_checked, split_command};
use nutri_traits::{BoxError, ImageHandle, InferenceEngine, RankedPrediction, ScoreScale};

pub use nutri_traits::UNKNOWN_LABEL;
use std::time::Duration;

pub fn label_for(index: usize, labels: &[String]) -> String {
    labels
        .get(index)
        .filter(|l| !l.is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

/// Parse classifier stdout into predictions sorted by descending score.
pub fn parse_predictions(
    stdout: &str,
    labels: Option<&[String]>,
) -> Result<Vec<RankedPrediction>, HwError> {
    let mut out = Vec::new();
    for (i, raw) in stdout.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad = |reason: &str| HwError::Output {
            line: i + 1,
            reason: reason.to_string(),
        };
        let (score, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| bad("expected '<score> <label>'"))?;
        let score: f32 = score.parse().map_err(|_| bad("score is not a number"))?;
        let rest = rest.trim();
        let label = match (rest.parse::<usize>(), labels) {
            (Ok(idx), Some(labels)) => label_for(idx, labels),
            _ => rest.to_string(),
        };
        out.push(RankedPrediction::new(label, score));
    }
    // Stable: equal scores keep the program's order.
    out.sort_by(|a, b| b.score.total_cmp(&a.score));
    Ok(out)
}

pub struct CommandEngine {
    argv: Vec<String>,
    labels: Option<Vec<String>>,
    scale: ScoreScale,
    timeout: Duration,
}

impl CommandEngine {
    /// `template` is split like a shell command line; `{image}` is replaced with
    /// the image path, or the path is appended when no placeholder is present.
    pub fn new(
        template: &str,
        labels: Option<Vec<String>>,
        scale: ScoreScale,
        timeout: Duration,
    ) -> Result<Self, HwError> {
        let mut argv = split_command(template)?;
        if !argv.iter().any(|a| a.contains("{image}")) {
            argv.push("{image}".to_string());
        }
        Ok(Self {
            argv,
            labels,
            scale,
            timeout,
        })
    }
}

impl InferenceEngine for CommandEngine {
    fn classify(&mut self, image: &ImageHandle) -> Result<Vec<RankedPrediction>, BoxError> {
        let path = image.path.to_string_lossy();
        let mut cmd = command_from(&self.argv, &[("image", path.as_ref())])?;
        let output = run_checked(&mut cmd, self.timeout)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let preds = parse_predictions(&stdout, self.labels.as_deref())?;
        tracing::debug!(count = preds.len(), "classifier output parsed");
        Ok(preds)
    }

    fn score_scale(&self) -> ScoreScale {
        self.scale
    }
}

/// Returns the same ranked predictions for every image.
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    predictions: Vec<RankedPrediction>,
    scale: ScoreScale,
}

impl SimulatedEngine {
    pub fn new(predictions: Vec<RankedPrediction>, scale: ScoreScale) -> Self {
        Self { predictions, scale }
    }
}

impl InferenceEngine for SimulatedEngine {
    fn classify(&mut self, image: &ImageHandle) -> Result<Vec<RankedPrediction>, BoxError> {
        tracing::debug!(image = %image.path.display(), "simulated classification");
        Ok(self.predictions.clone())
    }

    fn score_scale(&self) -> ScoreScale {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["background", "Granny Smith", "", "banana"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn indices_map_through_labels_and_sort_by_score() {
        let out = "# top-k\n12 3\n204 1\n\n7 9\n";
        let preds = parse_predictions(out, Some(&labels())).unwrap();
        let got: Vec<(&str, f32)> = preds.iter().map(|p| (p.label.as_str(), p.score)).collect();
        assert_eq!(
            got,
            vec![("Granny Smith", 204.0), ("banana", 12.0), ("Unknown", 7.0)]
        );
    }

    #[test]
    fn blank_label_line_maps_to_unknown() {
        assert_eq!(label_for(2, &labels()), "Unknown");
    }

    #[test]
    fn text_labels_pass_through_without_a_labels_file() {
        let preds = parse_predictions("0.81 bell pepper\n0.1 3", None).unwrap();
        assert_eq!(preds[0].label, "bell pepper");
        assert_eq!(preds[1].label, "3");
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let err = parse_predictions("0.5 apple\nbanana", None).unwrap_err();
        assert!(matches!(err, HwError::Output { line: 2, .. }));
        let err = parse_predictions("high apple", None).unwrap_err();
        assert!(matches!(err, HwError::Output { line: 1, .. }));
    }

    #[test]
    fn image_placeholder_is_appended_when_missing() {
        let e = CommandEngine::new(
            "python3 classify.py --top 5",
            None,
            ScoreScale::Quantized,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(e.argv.last().map(String::as_str), Some("{image}"));
    }

    #[cfg(unix)]
    #[test]
    fn command_engine_runs_the_classifier() {
        let mut e = CommandEngine::new(
            "sh -c 'echo 0.7 banana; echo 0.2 {image}'",
            None,
            ScoreScale::Fraction,
            Duration::from_secs(5),
        )
        .unwrap();
        let preds = e.classify(&ImageHandle::new("/tmp/x.jpg")).unwrap();
        assert_eq!(preds[0].label, "banana");
        assert_eq!(preds[1].label, "/tmp/x.jpg");
    }
}

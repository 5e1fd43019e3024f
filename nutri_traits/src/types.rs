use std::path::PathBuf;
use std::time::Instant;

/// One reading from the weight transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub value: f64,
    pub observed_at: Instant,
}

/// Label an engine reports when it cannot name the class.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// A single (label, score) pair from the inference engine. Rank is the index
/// in the returned sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPrediction {
    pub label: String,
    pub score: f32,
}

impl RankedPrediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Range of the raw scores an engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreScale {
    /// Already a fraction in [0, 1].
    #[default]
    Fraction,
    /// Quantized 0..=255; divide by 255 before comparing against thresholds.
    Quantized,
}

impl ScoreScale {
    #[inline]
    pub fn normalize(self, raw: f32) -> f32 {
        match self {
            ScoreScale::Fraction => raw,
            ScoreScale::Quantized => raw / 255.0,
        }
    }
}

/// Location of a captured image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHandle {
    pub path: PathBuf,
}

impl ImageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Macros for a measured portion, already scaled to `weight_g`.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionFacts {
    pub food_key: String,
    pub weight_g: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
}

impl NutritionFacts {
    /// Canonical key with the first letter upper-cased ("bell pepper" -> "Bell pepper").
    pub fn display_name(&self) -> String {
        let mut chars = self.food_key.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantized_scores_divide_by_255() {
        assert_eq!(ScoreScale::Quantized.normalize(255.0), 1.0);
        assert_eq!(ScoreScale::Fraction.normalize(0.4), 0.4);
    }

    #[test]
    fn display_name_capitalizes_first_letter_only() {
        let facts = NutritionFacts {
            food_key: "bell pepper".into(),
            weight_g: 0.0,
            calories: 0.0,
            protein_g: 0.0,
            carbs_g: 0.0,
            fats_g: 0.0,
        };
        assert_eq!(facts.display_name(), "Bell pepper");
    }
}

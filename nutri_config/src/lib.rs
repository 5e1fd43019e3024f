#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and table loading for the smart scale.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section has defaults, so an empty file is a usable simulated setup.
//! - The nutrition CSV loader enforces exact headers and non-negative macros.
//! - The labels loader maps class indices to labels for command engines.
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub mod defaults;

/// Nutrition CSV schema.
///
/// Expected headers:
/// food,calories,protein,carbs,fats
///
/// Example:
/// food,calories,protein,carbs,fats
/// kiwi,61,1.1,15,0.5
#[derive(Debug, Deserialize, Clone)]
pub struct NutritionRow {
    pub food: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// One nutrition-table entry, macros per 100 g.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FoodEntry {
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl From<NutritionRow> for FoodEntry {
    fn from(r: NutritionRow) -> Self {
        Self {
            name: r.food,
            calories: r.calories,
            protein: r.protein,
            carbs: r.carbs,
            fats: r.fats,
        }
    }
}

/// Raw-label substring mapped to a canonical table key.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    pub pattern: String,
    pub food: String,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    #[default]
    Simulated,
    /// Line-oriented text frames from a tty (e.g. a bound RFCOMM device).
    Serial,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SensorCfg {
    pub kind: SensorKind,
    /// Device path for `serial`, e.g. "/dev/rfcomm0".
    pub device: Option<String>,
    /// Max time a single read may block (ms).
    pub read_timeout_ms: u64,
    /// Wait before reconnecting after a link failure (ms).
    pub reconnect_ms: u64,
    /// Pacing for sensors that do not block on their own (simulated).
    pub rate_hz: u32,
    /// Replayed weights for the simulated sensor; empty uses the built-in cycle.
    pub script: Vec<f64>,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            kind: SensorKind::Simulated,
            device: None,
            read_timeout_ms: 1000,
            reconnect_ms: 5000,
            rate_hz: 10,
            script: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScaleCfg {
    /// Weight that starts a stabilization attempt (strictly greater than).
    pub start_threshold_g: f64,
    /// Max deviation from the anchor that still counts as stable (strictly less than).
    pub stable_variance_g: f64,
    /// Weight under which the item is considered removed (strictly less than).
    pub reset_threshold_g: f64,
    pub required_stable_samples: u32,
    /// Control-loop poll interval (ms).
    pub poll_ms: u64,
}

impl Default for ScaleCfg {
    fn default() -> Self {
        Self {
            start_threshold_g: 10.0,
            stable_variance_g: 2.0,
            reset_threshold_g: 5.0,
            required_stable_samples: 10,
            poll_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierCfg {
    pub base_threshold: f32,
    /// Lower bar applied when a known keyword promoted the decision.
    pub known_threshold: f32,
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

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendPref {
    /// Probe rpicam-still, then libcamera-still, then fall back to mock.
    #[default]
    Auto,
    Rpicam,
    Libcamera,
    Mock,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CameraCfg {
    pub backend: CameraBackendPref,
    pub width: u32,
    pub height: u32,
    /// Preview/exposure time handed to the capture tool (ms).
    pub warmup_ms: u64,
    pub output: String,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            backend: CameraBackendPref::Auto,
            width: 1024,
            height: 768,
            warmup_ms: 500,
            output: "current_food.jpg".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceKind {
    #[default]
    Simulated,
    Command,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreScaleCfg {
    #[default]
    Fraction,
    Quantized,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PredictionEntry {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceCfg {
    pub kind: InferenceKind,
    /// Classifier program for `command`; `{image}` is replaced with the image path.
    pub command: Option<String>,
    /// Optional labels file used to map class indices printed by the command.
    pub labels: Option<String>,
    pub score_scale: ScoreScaleCfg,
    pub timeout_ms: u64,
    /// Fixed ranked output of the simulated engine.
    pub predictions: Vec<PredictionEntry>,
}

impl Default for InferenceCfg {
    fn default() -> Self {
        Self {
            kind: InferenceKind::Simulated,
            command: None,
            labels: None,
            score_scale: ScoreScaleCfg::Fraction,
            timeout_ms: 10_000,
            predictions: vec![
                PredictionEntry {
                    label: "Granny Smith".into(),
                    score: 0.62,
                },
                PredictionEntry {
                    label: "pomegranate".into(),
                    score: 0.11,
                },
                PredictionEntry {
                    label: "lemon".into(),
                    score: 0.06,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    None,
    Jsonl,
    Command,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SinkCfg {
    pub kind: SinkKind,
    /// Output file for `jsonl`.
    pub path: Option<String>,
    /// Template for `command`: {api_key} {food} {weight} {calories} {protein} {carbs} {fats}.
    pub command: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SinkCfg {
    fn default() -> Self {
        Self {
            kind: SinkKind::None,
            path: None,
            command: None,
            api_key: None,
            timeout_ms: 5000,
        }
    }
}

impl SinkCfg {
    /// True when the configured key is missing or still the sample placeholder.
    pub fn api_key_missing(&self) -> bool {
        match self.api_key.as_deref() {
            None => true,
            Some(k) => k.trim().is_empty() || k.contains("YOUR_API_KEY"),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NutritionCfg {
    /// Optional CSV appended after `foods`.
    pub csv: Option<String>,
    pub foods: Vec<FoodEntry>,
}

impl Default for NutritionCfg {
    fn default() -> Self {
        Self {
            csv: None,
            foods: defaults::foods(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub scale: ScaleCfg,
    #[serde(default)]
    pub classifier: ClassifierCfg,
    #[serde(default)]
    pub camera: CameraCfg,
    #[serde(default)]
    pub inference: InferenceCfg,
    #[serde(default)]
    pub sink: SinkCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub nutrition: NutritionCfg,
    #[serde(default = "defaults::aliases")]
    pub aliases: Vec<AliasEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorCfg::default(),
            scale: ScaleCfg::default(),
            classifier: ClassifierCfg::default(),
            camera: CameraCfg::default(),
            inference: InferenceCfg::default(),
            sink: SinkCfg::default(),
            logging: Logging::default(),
            nutrition: NutritionCfg::default(),
            aliases: defaults::aliases(),
        }
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file, resolving relative table paths against its directory.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let mut cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    if let Some(base) = path.parent() {
        cfg.rebase_paths(base);
    }
    Ok(cfg)
}

fn rebase(base: &Path, p: &mut Option<String>) {
    if let Some(s) = p.as_deref() {
        let candidate = PathBuf::from(s);
        if candidate.is_relative() && !base.as_os_str().is_empty() {
            *p = Some(base.join(candidate).to_string_lossy().into_owned());
        }
    }
}

impl Config {
    /// Make the nutrition CSV and labels paths relative to `base`.
    pub fn rebase_paths(&mut self, base: &Path) {
        rebase(base, &mut self.nutrition.csv);
        rebase(base, &mut self.inference.labels);
    }

    /// Inline foods followed by CSV rows, if a CSV is configured.
    pub fn foods(&self) -> eyre::Result<Vec<FoodEntry>> {
        let mut out = self.nutrition.foods.clone();
        if let Some(csv_path) = self.nutrition.csv.as_deref() {
            out.extend(load_nutrition_csv(Path::new(csv_path))?);
        }
        Ok(out)
    }

    /// Labels for index mapping, if configured.
    pub fn labels(&self) -> eyre::Result<Option<Vec<String>>> {
        self.inference
            .labels
            .as_deref()
            .map(|p| load_labels(Path::new(p)))
            .transpose()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Scale
        let s = &self.scale;
        if !s.start_threshold_g.is_finite() || s.start_threshold_g < 0.0 {
            eyre::bail!("scale.start_threshold_g must be a finite value >= 0");
        }
        if !s.reset_threshold_g.is_finite() || s.reset_threshold_g < 0.0 {
            eyre::bail!("scale.reset_threshold_g must be a finite value >= 0");
        }
        if s.reset_threshold_g > s.start_threshold_g {
            eyre::bail!("scale.reset_threshold_g must be <= scale.start_threshold_g");
        }
        if !(s.stable_variance_g.is_finite() && s.stable_variance_g > 0.0) {
            eyre::bail!("scale.stable_variance_g must be > 0");
        }
        if s.required_stable_samples == 0 {
            eyre::bail!("scale.required_stable_samples must be >= 1");
        }
        if s.poll_ms == 0 {
            eyre::bail!("scale.poll_ms must be >= 1");
        }
        if s.poll_ms > 60 * 1000 {
            eyre::bail!("scale.poll_ms is unreasonably large (>1min)");
        }

        // Classifier
        let c = &self.classifier;
        if !(0.0..=1.0).contains(&c.base_threshold) {
            eyre::bail!("classifier.base_threshold must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&c.known_threshold) {
            eyre::bail!("classifier.known_threshold must be in [0.0, 1.0]");
        }
        if c.known_threshold > c.base_threshold {
            eyre::bail!("classifier.known_threshold must be <= classifier.base_threshold");
        }
        if c.top_k == 0 {
            eyre::bail!("classifier.top_k must be >= 1");
        }

        // Sensor
        if self.sensor.kind == SensorKind::Serial && self.sensor.device.is_none() {
            eyre::bail!("sensor.device is required when sensor.kind = \"serial\"");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.sensor.reconnect_ms == 0 {
            eyre::bail!("sensor.reconnect_ms must be >= 1");
        }
        if self.sensor.rate_hz == 0 {
            eyre::bail!("sensor.rate_hz must be > 0");
        }

        // Camera
        if self.camera.width == 0 || self.camera.height == 0 {
            eyre::bail!("camera.width and camera.height must be > 0");
        }
        if self.camera.output.trim().is_empty() {
            eyre::bail!("camera.output must not be empty");
        }

        // Inference
        if self.inference.kind == InferenceKind::Command
            && self
                .inference
                .command
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            eyre::bail!("inference.command is required when inference.kind = \"command\"");
        }
        if self.inference.timeout_ms == 0 {
            eyre::bail!("inference.timeout_ms must be >= 1");
        }
        for p in &self.inference.predictions {
            if !p.score.is_finite() || p.score < 0.0 {
                eyre::bail!("inference.predictions: score for '{}' must be >= 0", p.label);
            }
        }

        // Sink
        match self.sink.kind {
            SinkKind::None => {}
            SinkKind::Jsonl => {
                if self.sink.path.is_none() {
                    eyre::bail!("sink.path is required when sink.kind = \"jsonl\"");
                }
            }
            SinkKind::Command => {
                if self
                    .sink
                    .command
                    .as_deref()
                    .is_none_or(|c| c.trim().is_empty())
                {
                    eyre::bail!("sink.command is required when sink.kind = \"command\"");
                }
            }
        }
        if self.sink.timeout_ms == 0 {
            eyre::bail!("sink.timeout_ms must be >= 1");
        }

        // Tables
        for f in &self.nutrition.foods {
            validate_food(f)?;
        }
        for a in &self.aliases {
            if a.pattern.trim().is_empty() || a.food.trim().is_empty() {
                eyre::bail!("aliases: pattern and food must not be empty");
            }
        }

        Ok(())
    }
}

fn validate_food(f: &FoodEntry) -> eyre::Result<()> {
    if f.name.trim().is_empty() {
        eyre::bail!("nutrition: food name must not be empty");
    }
    for (field, v) in [
        ("calories", f.calories),
        ("protein", f.protein),
        ("carbs", f.carbs),
        ("fats", f.fats),
    ] {
        if !v.is_finite() || v < 0.0 {
            eyre::bail!("nutrition: {field} for '{}' must be a finite value >= 0", f.name);
        }
    }
    Ok(())
}

pub fn load_nutrition_csv(path: &Path) -> eyre::Result<Vec<FoodEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open nutrition CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["food", "calories", "protein", "carbs", "fats"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "nutrition CSV must have headers 'food,calories,protein,carbs,fats', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<NutritionRow>().enumerate() {
        match rec {
            Ok(row) => {
                let entry = FoodEntry::from(row);
                validate_food(&entry)
                    .map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
                rows.push(entry);
            }
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    Ok(rows)
}

/// One label per line; blank lines keep their index so class ids stay aligned.
pub fn load_labels(path: &Path) -> eyre::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read labels {:?}: {}", path, e))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_reference_defaults() {
        let cfg = load_toml("").expect("parse");
        assert_eq!(cfg.scale.start_threshold_g, 10.0);
        assert_eq!(cfg.scale.required_stable_samples, 10);
        assert_eq!(cfg.classifier.known_threshold, 0.2);
        assert_eq!(cfg.sink.timeout_ms, 5000);
        assert!(cfg.nutrition.foods.iter().any(|f| f.name == "apple"));
        assert!(cfg.aliases.iter().any(|a| a.pattern == "granny smith"));
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn placeholder_api_key_counts_as_missing() {
        let mut sink = SinkCfg::default();
        assert!(sink.api_key_missing());
        sink.api_key = Some("YOUR_API_KEY".into());
        assert!(sink.api_key_missing());
        sink.api_key = Some("LU5P".into());
        assert!(!sink.api_key_missing());
    }

    #[test]
    fn rebase_only_touches_relative_paths() {
        let mut cfg = Config::default();
        cfg.nutrition.csv = Some("foods.csv".into());
        cfg.inference.labels = Some("/abs/labels.txt".into());
        cfg.rebase_paths(Path::new("/etc/scale"));
        assert_eq!(cfg.nutrition.csv.as_deref(), Some("/etc/scale/foods.csv"));
        assert_eq!(cfg.inference.labels.as_deref(), Some("/abs/labels.txt"));
    }
}

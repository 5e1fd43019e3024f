//! Result sinks: a JSON-lines log and a templated external command.
use crate::error::HwError;
use crate::util::{command_from, run_checked, split_command};
use nutri_traits::{BoxError, NutritionFacts, ResultSink};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct Record<'a> {
    ts_ms: i64,
    food: &'a str,
    weight_g: f64,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fats_g: f64,
}

/// Appends one JSON object per result.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for JsonlSink {
    fn submit(&self, facts: &NutritionFacts) -> Result<(), BoxError> {
        let rec = Record {
            ts_ms: chrono::Utc::now().timestamp_millis(),
            food: &facts.food_key,
            weight_g: facts.weight_g,
            calories: facts.calories,
            protein_g: facts.protein_g,
            carbs_g: facts.carbs_g,
            fats_g: facts.fats_g,
        };
        let mut line = serde_json::to_string(&rec)?;
        line.push('\n');
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(HwError::from)?;
        f.write_all(line.as_bytes()).map_err(HwError::from)?;
        Ok(())
    }
}

/// Runs a command per result, e.g. `curl` against an HTTP update endpoint.
///
/// Placeholders, substituted inside each word after splitting:
/// `{api_key}` `{food}` `{weight}` `{calories}` `{protein}` `{carbs}` `{fats}` `{status}`.
/// `{status}` expands to `Food: <Name>`.
#[derive(Debug, Clone)]
pub struct CommandSink {
    argv: Vec<String>,
    api_key: String,
    timeout: Duration,
}

impl CommandSink {
    pub fn new(template: &str, api_key: &str, timeout: Duration) -> Result<Self, HwError> {
        Ok(Self {
            argv: split_command(template)?,
            api_key: api_key.to_string(),
            timeout,
        })
    }

    fn vars(&self, facts: &NutritionFacts) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("food", facts.display_name()),
            ("weight", facts.weight_g.to_string()),
            ("calories", facts.calories.to_string()),
            ("protein", facts.protein_g.to_string()),
            ("carbs", facts.carbs_g.to_string()),
            ("fats", facts.fats_g.to_string()),
            ("status", format!("Food: {}", facts.display_name())),
        ]
    }
}

impl ResultSink for CommandSink {
    fn submit(&self, facts: &NutritionFacts) -> Result<(), BoxError> {
        let owned = self.vars(facts);
        let vars: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let mut cmd = command_from(&self.argv, &vars)?;
        run_checked(&mut cmd, self.timeout)?;
        Ok(())
    }
}

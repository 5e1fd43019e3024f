//! `From` implementations bridging `nutri_config` types to `nutri_core` types.

use crate::config::{ClassifierCfg, LoopCfg, StabilityCfg};
use crate::error::BuildError;
use crate::resolver::{AliasTable, LabelResolver, Macros, NutritionTable};
use nutri_traits::ScoreScale;

// ── StabilityCfg ─────────────────────────────────────────────────────────────

impl From<&nutri_config::ScaleCfg> for StabilityCfg {
    fn from(c: &nutri_config::ScaleCfg) -> Self {
        Self {
            start_threshold_g: c.start_threshold_g,
            stable_variance_g: c.stable_variance_g,
            reset_threshold_g: c.reset_threshold_g,
            required_stable_samples: c.required_stable_samples,
        }
    }
}

// ── LoopCfg ──────────────────────────────────────────────────────────────────

impl From<&nutri_config::ScaleCfg> for LoopCfg {
    fn from(c: &nutri_config::ScaleCfg) -> Self {
        Self {
            poll_ms: c.poll_ms,
            max_cycles: None,
        }
    }
}

// ── ClassifierCfg ────────────────────────────────────────────────────────────

impl From<&nutri_config::ClassifierCfg> for ClassifierCfg {
    fn from(c: &nutri_config::ClassifierCfg) -> Self {
        Self {
            base_threshold: c.base_threshold,
            known_threshold: c.known_threshold,
            top_k: c.top_k,
        }
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

impl From<&nutri_config::FoodEntry> for Macros {
    fn from(f: &nutri_config::FoodEntry) -> Self {
        Self {
            calories: f.calories,
            protein_g: f.protein,
            carbs_g: f.carbs,
            fats_g: f.fats,
        }
    }
}

impl TryFrom<&[nutri_config::FoodEntry]> for NutritionTable {
    type Error = BuildError;

    fn try_from(foods: &[nutri_config::FoodEntry]) -> Result<Self, Self::Error> {
        let mut table = NutritionTable::new();
        for f in foods {
            table.insert(&f.name, Macros::from(f))?;
        }
        Ok(table)
    }
}

impl From<&[nutri_config::AliasEntry]> for AliasTable {
    fn from(aliases: &[nutri_config::AliasEntry]) -> Self {
        AliasTable::new(aliases.iter().map(|a| (a.pattern.as_str(), a.food.as_str())))
    }
}

/// Resolver over already-merged foods (inline + CSV) and the configured aliases.
pub fn resolver_from(
    foods: &[nutri_config::FoodEntry],
    aliases: &[nutri_config::AliasEntry],
) -> Result<LabelResolver, BuildError> {
    Ok(LabelResolver::new(
        NutritionTable::try_from(foods)?,
        AliasTable::from(aliases),
    ))
}

pub fn score_scale(c: nutri_config::ScoreScaleCfg) -> ScoreScale {
    match c {
        nutri_config::ScoreScaleCfg::Fraction => ScoreScale::Fraction,
        nutri_config::ScoreScaleCfg::Quantized => ScoreScale::Quantized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_config::{AliasEntry, FoodEntry};

    fn food(name: &str, calories: f64) -> FoodEntry {
        FoodEntry {
            name: name.into(),
            calories,
            protein: 1.0,
            carbs: 2.0,
            fats: 0.5,
        }
    }

    #[test]
    fn later_rows_override_in_place() {
        let foods = [food("apple", 52.0), food("kiwi", 61.0), food("Apple", 50.0)];
        let aliases = [AliasEntry {
            pattern: "granny smith".into(),
            food: "apple".into(),
        }];
        let r = resolver_from(&foods, &aliases).unwrap();
        assert_eq!(r.table().keys().collect::<Vec<_>>(), vec!["apple", "kiwi"]);
        assert_eq!(r.resolve("Granny Smith", 100.0).unwrap().calories, 50.0);
    }

    #[test]
    fn negative_macros_fail_the_build() {
        let err = resolver_from(&[food("lard", -1.0)], &[]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidFood { .. }));
    }

    #[test]
    fn quantized_scale_maps_through() {
        assert_eq!(
            score_scale(nutri_config::ScoreScaleCfg::Quantized),
            ScoreScale::Quantized
        );
    }
}

//! Label normalization and nutrition lookup.
//!
//! resolve(label, grams):
//! 1. lowercase + trim
//! 2. alias pass: first alias pattern contained in the label (longest pattern first)
//! 3. direct lookup of the candidate key
//! 4. fallback: first table key contained in the normalized label
//! 5. scale per-100 g macros by grams / 100, rounded to one decimal;
//!    a weight of zero or less gives zeroed macros

use crate::classifier::KnownKeywords;
use crate::error::{BuildError, ResolveError};
use crate::util::round1;
use nutri_traits::NutritionFacts;

/// Per-100 g macro quantities. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macros {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fats_g: f64,
}

impl Macros {
    fn check(&self) -> Result<(), &'static str> {
        let all = [self.calories, self.protein_g, self.carbs_g, self.fats_g];
        if all.iter().any(|v| !v.is_finite()) {
            return Err("macros must be finite");
        }
        if all.iter().any(|v| *v < 0.0) {
            return Err("macros must be >= 0");
        }
        Ok(())
    }
}

/// Canonical food key -> macros, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct NutritionTable {
    entries: Vec<(String, Macros)>,
}

impl NutritionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry. Replacing keeps the original position.
    pub fn insert(&mut self, food: &str, macros: Macros) -> Result<(), BuildError> {
        let key = food.trim().to_lowercase();
        if key.is_empty() {
            return Err(BuildError::InvalidFood {
                food: food.to_string(),
                reason: "empty food key",
            });
        }
        macros.check().map_err(|reason| BuildError::InvalidFood {
            food: key.clone(),
            reason,
        })?;
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = macros,
            None => self.entries.push((key, macros)),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Macros> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, m)| m)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub pattern: String,
    pub food: String,
}

/// Substring pattern -> canonical key. Longest pattern first; equal lengths
/// keep their configured order, so "sweet pepper" is tried before "pepper".
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: Vec<Alias>,
}

impl AliasTable {
    pub fn new<I, P, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, F)>,
        P: AsRef<str>,
        F: AsRef<str>,
    {
        let mut entries: Vec<Alias> = Vec::new();
        for (pattern, food) in pairs {
            let pattern = pattern.as_ref().trim().to_lowercase();
            let food = food.as_ref().trim().to_lowercase();
            if pattern.is_empty() || food.is_empty() {
                continue;
            }
            if entries.iter().any(|a| a.pattern == pattern) {
                tracing::warn!(%pattern, "duplicate alias pattern ignored");
                continue;
            }
            entries.push(Alias { pattern, food });
        }
        // Stable sort keeps configured order among equal lengths.
        entries.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
        Self { entries }
    }

    /// Canonical key for the first pattern contained in `normalized`.
    pub fn lookup(&self, normalized: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|a| normalized.contains(a.pattern.as_str()))
            .map(|a| a.food.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelResolver {
    table: NutritionTable,
    aliases: AliasTable,
}

impl LabelResolver {
    pub fn new(table: NutritionTable, aliases: AliasTable) -> Self {
        Self { table, aliases }
    }

    pub fn table(&self) -> &NutritionTable {
        &self.table
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Table keys followed by alias patterns, the vocabulary used for promotion.
    pub fn known_keywords(&self) -> KnownKeywords {
        self.table
            .keys()
            .chain(self.aliases.iter().map(|a| a.pattern.as_str()))
            .collect()
    }

    /// Canonical key and macros for a raw label, without scaling.
    pub fn lookup(&self, raw_label: &str) -> Result<(String, Macros), ResolveError> {
        let normalized = raw_label.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ResolveError::EmptyLabel);
        }

        let candidate = self.aliases.lookup(&normalized).unwrap_or(&normalized);
        if let Some(m) = self.table.get(candidate) {
            return Ok((candidate.to_string(), *m));
        }
        tracing::debug!(candidate, "no direct nutrition entry");

        match self
            .table
            .entries
            .iter()
            .find(|(k, _)| normalized.contains(k.as_str()))
        {
            Some((key, m)) => {
                tracing::info!(label = %normalized, key = %key, "fallback nutrition match");
                Ok((key.clone(), *m))
            }
            None => Err(ResolveError::NotFound {
                label: candidate.to_string(),
            }),
        }
    }

    /// Resolve a raw label and scale its macros to `weight_g`.
    ///
    /// Non-positive weights are accepted and give zeroed macros; `weight_g`
    /// is reported as passed.
    pub fn resolve(&self, raw_label: &str, weight_g: f64) -> Result<NutritionFacts, ResolveError> {
        let (food_key, m) = self.lookup(raw_label)?;
        let factor = (weight_g / 100.0).max(0.0);
        Ok(NutritionFacts {
            food_key,
            weight_g,
            calories: round1(m.calories * factor),
            protein_g: round1(m.protein_g * factor),
            carbs_g: round1(m.carbs_g * factor),
            fats_g: round1(m.fats_g * factor),
        })
    }
}

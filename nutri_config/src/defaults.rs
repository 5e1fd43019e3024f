//! Built-in nutrition and alias tables used when the config does not supply its own.

use crate::{AliasEntry, FoodEntry};

/// (name, kcal, protein g, carbs g, fats g) per 100 g.
const FOODS: &[(&str, f64, f64, f64, f64)] = &[
    ("apple", 52.0, 0.3, 14.0, 0.2),
    ("banana", 89.0, 1.1, 23.0, 0.3),
    ("orange", 47.0, 0.9, 12.0, 0.1),
    ("lemon", 29.0, 1.1, 9.0, 0.3),
    ("strawberry", 32.0, 0.7, 7.7, 0.3),
    ("bell pepper", 20.0, 0.9, 4.6, 0.2),
    ("granny smith", 52.0, 0.3, 14.0, 0.2),
];

/// ImageNet-style labels mapped onto table keys. Order only breaks ties between
/// patterns of equal length; longer patterns always win.
const ALIASES: &[(&str, &str)] = &[
    ("granny smith", "apple"),
    ("golden delicious", "apple"),
    ("fig", "fig"),
    ("banana", "banana"),
    ("orange", "orange"),
    ("lemon", "lemon"),
    ("strawberry", "strawberry"),
    ("bell pepper", "bell pepper"),
    ("sweet pepper", "bell pepper"),
    ("capsicum", "bell pepper"),
    ("pimiento", "bell pepper"),
];

pub fn foods() -> Vec<FoodEntry> {
    FOODS
        .iter()
        .map(|&(name, calories, protein, carbs, fats)| FoodEntry {
            name: name.to_string(),
            calories,
            protein,
            carbs,
            fats,
        })
        .collect()
}

pub fn aliases() -> Vec<AliasEntry> {
    ALIASES
        .iter()
        .map(|&(pattern, food)| AliasEntry {
            pattern: pattern.to_string(),
            food: food.to_string(),
        })
        .collect()
}

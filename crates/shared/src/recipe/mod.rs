use std::collections::BTreeSet;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};

#[derive(
    Encode,
    Decode,
    EnumString,
    VariantArray,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Macro {
    Carbs,
    Protein,
    Fat,
}

impl Macro {
    /// Atwater energy factor
    pub fn kcal_per_gram(&self) -> f64 {
        match self {
            Macro::Carbs | Macro::Protein => 4.0,
            Macro::Fat => 9.0,
        }
    }
}

#[derive(
    Encode,
    Decode,
    EnumString,
    VariantArray,
    Display,
    AsRefStr,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Micronutrient {
    Sodium,
    Potassium,
    Phosphorus,
}

/// Per-serving nutrition as reported by the recipe source. Any value may be missing.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
    #[serde(default)]
    pub sodium_mg: Option<f64>,
    #[serde(default)]
    pub fiber_g: Option<f64>,
    #[serde(default)]
    pub potassium_mg: Option<f64>,
    #[serde(default)]
    pub phosphorus_mg: Option<f64>,
}

impl NutritionFacts {
    pub fn macro_g(&self, nutrient: Macro) -> Option<f64> {
        match nutrient {
            Macro::Carbs => self.carbs_g,
            Macro::Protein => self.protein_g,
            Macro::Fat => self.fat_g,
        }
    }

    pub fn micronutrient_mg(&self, nutrient: Micronutrient) -> Option<f64> {
        match nutrient {
            Micronutrient::Sodium => self.sodium_mg,
            Micronutrient::Potassium => self.potassium_mg,
            Micronutrient::Phosphorus => self.phosphorus_mg,
        }
    }
}

#[derive(Encode, Decode, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeCandidate {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub nutrition: NutritionFacts,
    #[serde(default)]
    pub ingredient_tags: BTreeSet<String>,
}

impl RecipeCandidate {
    /// Identity used by the usage ledger: the id when present, else the normalized title.
    pub fn identifier(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => normalize_title(&self.title),
        }
    }

    /// Ingredient tags in normalized form.
    pub fn normalized_tags(&self) -> BTreeSet<String> {
        self.ingredient_tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Lowercase, trim and join inner whitespace with `_` so that
/// `"Leafy Green"` and `"leafy_green"` compare equal.
pub fn normalize_tag(tag: &str) -> String {
    tag.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

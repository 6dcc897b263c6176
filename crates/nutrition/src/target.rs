use std::collections::{BTreeMap, BTreeSet};

use nutriplan_shared::mealplan::MealType;
use nutriplan_shared::recipe::{Macro, Micronutrient};
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

#[derive(Encode, Decode, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacroRange {
    pub min_g: f64,
    pub max_g: f64,
}

impl MacroRange {
    pub fn new(min_g: f64, max_g: f64) -> Self {
        Self { min_g, max_g }
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_g + self.max_g) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.max_g - self.min_g
    }

    pub fn is_valid(&self) -> bool {
        self.min_g <= self.max_g
    }

    pub fn contains(&self, grams: f64) -> bool {
        grams >= self.min_g && grams <= self.max_g
    }

    pub fn intersect(&self, other: &MacroRange) -> MacroRange {
        MacroRange {
            min_g: self.min_g.max(other.min_g),
            max_g: self.max_g.min(other.max_g),
        }
    }

    pub fn scale(&self, ratio: f64) -> MacroRange {
        MacroRange {
            min_g: self.min_g * ratio,
            max_g: self.max_g * ratio,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// Calorie delta contributed by a condition
    Calorie,
    /// Total raised to the gender floor
    Floor,
    /// Macro range dropped to resolve an empty intersection
    Conflict,
    /// Rule term that could not be resolved against the profile
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedAdjustment {
    pub condition_code: String,
    pub kind: AdjustmentKind,
    pub delta: f64,
    pub reason: String,
}

/// Result of merging every active condition rule for one profile.
///
/// Immutable once produced; recompute from the profile when it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargetProfile {
    pub total_calories: u32,
    pub macro_targets: BTreeMap<Macro, MacroRange>,
    pub micronutrient_caps: BTreeMap<Micronutrient, f64>,
    pub excluded_ingredients: BTreeSet<String>,
    pub preferred_ingredients: BTreeMap<String, f64>,
    pub applied_adjustments: Vec<AppliedAdjustment>,
    /// Condition codes in processing order (severity desc, code asc)
    pub active_conditions: Vec<String>,
    /// Condition that contributed the binding cap per nutrient
    pub cap_sources: BTreeMap<Micronutrient, String>,
    /// Conditions that prefer each ingredient tag
    pub preferred_sources: BTreeMap<String, BTreeSet<String>>,
}

impl NutritionTargetProfile {
    pub fn is_excluded(&self, tag: &str) -> bool {
        self.excluded_ingredients.contains(tag)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &AppliedAdjustment> {
        self.applied_adjustments
            .iter()
            .filter(|a| a.kind == AdjustmentKind::Conflict)
    }
}

#[derive(Encode, Decode, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MealSlotTarget {
    pub meal_type: MealType,
    pub calorie_target: u32,
    pub macro_targets: BTreeMap<Macro, MacroRange>,
    /// Daily caps scaled by the slot ratio
    pub micronutrient_caps: BTreeMap<Micronutrient, f64>,
}

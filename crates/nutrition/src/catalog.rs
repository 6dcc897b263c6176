use std::collections::{BTreeMap, BTreeSet};

use nutriplan_shared::recipe::{Macro, Micronutrient, normalize_tag};
use serde::{Deserialize, Serialize};

use crate::NutritionError;

/// How a condition moves the daily calorie budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalorieAdjustment {
    /// Flat delta in kcal
    Fixed { kcal: f64 },
    /// Delta proportional to standard body weight (22 × height_m²)
    PerKgStandardWeight { kcal_per_kg: f64 },
}

impl Default for CalorieAdjustment {
    fn default() -> Self {
        CalorieAdjustment::Fixed { kcal: 0.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MacroRule {
    /// Share of total calories, in percent
    PercentOfCalories { min: f64, max: f64 },
    /// Grams per kg of reference body weight
    PerKgBodyWeight { min_g: f64, max_g: f64 },
}

impl MacroRule {
    fn bounds(&self) -> (f64, f64) {
        match *self {
            MacroRule::PercentOfCalories { min, max } => (min, max),
            MacroRule::PerKgBodyWeight { min_g, max_g } => (min_g, max_g),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionNutritionRule {
    pub condition_code: String,
    /// Ordering only; a higher severity wins macro conflicts
    #[serde(default)]
    pub severity: u8,
    #[serde(default)]
    pub calorie_adjustment: CalorieAdjustment,
    #[serde(default)]
    pub macro_ranges: BTreeMap<Macro, MacroRule>,
    /// Daily maximum in mg
    #[serde(default)]
    pub micronutrient_caps: BTreeMap<Micronutrient, f64>,
    #[serde(default)]
    pub excluded_ingredient_tags: BTreeSet<String>,
    /// Ingredient tag → score bonus
    #[serde(default)]
    pub preferred_ingredient_tags: BTreeMap<String, f64>,
}

impl ConditionNutritionRule {
    pub fn new(condition_code: impl Into<String>, severity: u8) -> Self {
        Self {
            condition_code: condition_code.into(),
            severity,
            calorie_adjustment: CalorieAdjustment::default(),
            macro_ranges: BTreeMap::new(),
            micronutrient_caps: BTreeMap::new(),
            excluded_ingredient_tags: BTreeSet::new(),
            preferred_ingredient_tags: BTreeMap::new(),
        }
    }

    pub fn calories(mut self, adjustment: CalorieAdjustment) -> Self {
        self.calorie_adjustment = adjustment;
        self
    }

    pub fn percent(mut self, nutrient: Macro, min: f64, max: f64) -> Self {
        self.macro_ranges
            .insert(nutrient, MacroRule::PercentOfCalories { min, max });
        self
    }

    pub fn per_kg(mut self, nutrient: Macro, min_g: f64, max_g: f64) -> Self {
        self.macro_ranges
            .insert(nutrient, MacroRule::PerKgBodyWeight { min_g, max_g });
        self
    }

    pub fn cap(mut self, nutrient: Micronutrient, max_mg: f64) -> Self {
        self.micronutrient_caps.insert(nutrient, max_mg);
        self
    }

    pub fn exclude(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.excluded_ingredient_tags
            .extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn prefer(mut self, tag: impl Into<String>, bonus: f64) -> Self {
        self.preferred_ingredient_tags.insert(tag.into(), bonus);
        self
    }

    fn normalized(mut self) -> Self {
        self.condition_code = normalize_tag(&self.condition_code);
        self.excluded_ingredient_tags = self
            .excluded_ingredient_tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();

        let mut preferred = BTreeMap::new();
        for (tag, bonus) in &self.preferred_ingredient_tags {
            let tag = normalize_tag(tag);
            if !tag.is_empty() {
                *preferred.entry(tag).or_insert(0.0) += bonus;
            }
        }
        self.preferred_ingredient_tags = preferred;

        self
    }

    fn validate(&self) -> Result<(), NutritionError> {
        let invalid = |reason: String| NutritionError::InvalidRule {
            code: self.condition_code.to_owned(),
            reason,
        };

        if self.condition_code.is_empty() {
            return Err(invalid("condition code is empty".to_owned()));
        }

        let delta = match self.calorie_adjustment {
            CalorieAdjustment::Fixed { kcal } => kcal,
            CalorieAdjustment::PerKgStandardWeight { kcal_per_kg } => kcal_per_kg,
        };
        if !delta.is_finite() {
            return Err(invalid("calorie adjustment is not finite".to_owned()));
        }

        for (nutrient, rule) in &self.macro_ranges {
            let (min, max) = rule.bounds();
            if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
                return Err(invalid(format!("{nutrient} range {min}..{max} is invalid")));
            }

            if matches!(rule, MacroRule::PercentOfCalories { .. }) && max > 100.0 {
                return Err(invalid(format!("{nutrient} share {max}% exceeds 100%")));
            }
        }

        for (nutrient, cap) in &self.micronutrient_caps {
            if !cap.is_finite() || *cap < 0.0 {
                return Err(invalid(format!("{nutrient} cap {cap} is invalid")));
            }
        }

        for (tag, bonus) in &self.preferred_ingredient_tags {
            if !bonus.is_finite() {
                return Err(invalid(format!("bonus for `{tag}` is not finite")));
            }
        }

        Ok(())
    }
}

/// Declarative mapping from condition code to nutrition rule.
///
/// Adding a condition is a data change: either extend [`ConditionRuleCatalog::builtin`]
/// or supply `[[conditions]]` entries through configuration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionRuleCatalog {
    rules: BTreeMap<String, ConditionNutritionRule>,
}

impl ConditionRuleCatalog {
    pub fn new(
        rules: impl IntoIterator<Item = ConditionNutritionRule>,
    ) -> Result<Self, NutritionError> {
        let mut catalog = Self::default();
        catalog.extend(rules)?;

        Ok(catalog)
    }

    /// Insert or replace rules, keyed by normalized condition code.
    pub fn extend(
        &mut self,
        rules: impl IntoIterator<Item = ConditionNutritionRule>,
    ) -> Result<(), NutritionError> {
        for rule in rules {
            let rule = rule.normalized();
            rule.validate()?;
            self.rules.insert(rule.condition_code.to_owned(), rule);
        }

        Ok(())
    }

    pub fn with_overrides(
        mut self,
        rules: impl IntoIterator<Item = ConditionNutritionRule>,
    ) -> Result<Self, NutritionError> {
        self.extend(rules)?;

        Ok(self)
    }

    pub fn get(&self, condition_code: &str) -> Option<&ConditionNutritionRule> {
        self.rules.get(&normalize_tag(condition_code))
    }

    pub fn contains(&self, condition_code: &str) -> bool {
        self.get(condition_code).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Host-product heuristics. The numbers are configuration, not clinical guidance.
    pub fn builtin() -> Self {
        let rules = [
            ConditionNutritionRule::new("diabetes", 3)
                .calories(CalorieAdjustment::Fixed { kcal: -300.0 })
                .percent(Macro::Carbs, 40.0, 50.0)
                .percent(Macro::Fat, 25.0, 35.0)
                .exclude(["refined_sugar"])
                .prefer("whole_grain", 5.0)
                .prefer("legume", 5.0)
                .prefer("leafy_green", 3.0),
            ConditionNutritionRule::new("hypertension", 3)
                .cap(Micronutrient::Sodium, 1500.0)
                .exclude(["cured_meat"])
                .prefer("leafy_green", 4.0)
                .prefer("legume", 2.0),
            ConditionNutritionRule::new("ckd", 5)
                .per_kg(Macro::Protein, 0.6, 0.8)
                .cap(Micronutrient::Sodium, 2000.0)
                .cap(Micronutrient::Potassium, 2000.0)
                .cap(Micronutrient::Phosphorus, 800.0)
                .exclude(["processed_cheese"])
                .prefer("egg_white", 3.0),
            ConditionNutritionRule::new("heart_disease", 4)
                .calories(CalorieAdjustment::Fixed { kcal: -200.0 })
                .percent(Macro::Fat, 20.0, 30.0)
                .cap(Micronutrient::Sodium, 1800.0)
                .exclude(["trans_fat"])
                .prefer("oily_fish", 5.0)
                .prefer("whole_grain", 3.0),
            ConditionNutritionRule::new("gout", 2)
                .percent(Macro::Protein, 10.0, 20.0)
                .exclude(["organ_meat", "shellfish"])
                .prefer("low_fat_dairy", 3.0),
            ConditionNutritionRule::new("celiac", 4).exclude(["gluten"]),
            ConditionNutritionRule::new(OBESITY, 2)
                .calories(CalorieAdjustment::PerKgStandardWeight { kcal_per_kg: -7.0 })
                .percent(Macro::Carbs, 40.0, 55.0)
                .percent(Macro::Fat, 20.0, 30.0)
                .prefer("leafy_green", 3.0)
                .prefer("lean_protein", 3.0),
            ConditionNutritionRule::new(UNDERWEIGHT, 1)
                .calories(CalorieAdjustment::Fixed { kcal: 300.0 })
                .prefer("whole_grain", 2.0),
        ];

        let rules = rules
            .into_iter()
            .map(ConditionNutritionRule::normalized)
            .map(|r| (r.condition_code.to_owned(), r))
            .collect();

        Self { rules }
    }
}

/// Pseudo-condition derived from BMI ≥ 30
pub const OBESITY: &str = "obesity";
/// Pseudo-condition derived from BMI < 18.5
pub const UNDERWEIGHT: &str = "underweight";

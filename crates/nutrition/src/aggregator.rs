use std::collections::{BTreeMap, BTreeSet};

use nutriplan_shared::recipe::{Macro, normalize_tag};
use nutriplan_shared::user::HealthProfile;
use strum::VariantArray;

use crate::{
    AdjustmentKind, AppliedAdjustment, BodyMetrics, CalorieAdjustment, CalorieBudgetCalculator,
    ConditionNutritionRule, ConditionRuleCatalog, MacroRange, MacroRule, NutritionTargetProfile,
    OBESITY, UNDERWEIGHT,
};

/// Balanced macro split used for any macro no active rule constrains, in percent of calories.
pub const DEFAULT_MACRO_PERCENTS: [(Macro, f64, f64); 3] = [
    (Macro::Carbs, 45.0, 65.0),
    (Macro::Protein, 10.0, 35.0),
    (Macro::Fat, 20.0, 35.0),
];

pub const OBESITY_BMI: f64 = 30.0;
pub const UNDERWEIGHT_BMI: f64 = 18.5;

pub const FLOOR_CODE: &str = "calorie_floor";

/// Merges every condition that applies to a profile into one [`NutritionTargetProfile`]
/// with a "most restrictive wins" policy.
///
/// Rules are processed by severity descending then condition code ascending, so the
/// output is a pure function of the profile and the catalog.
pub struct ConditionAggregator<'a> {
    catalog: &'a ConditionRuleCatalog,
}

impl<'a> ConditionAggregator<'a> {
    pub fn new(catalog: &'a ConditionRuleCatalog) -> Self {
        Self { catalog }
    }

    /// Rules for the profile's diseases plus BMI-derived pseudo-conditions, in processing order.
    pub fn active_rules(
        &self,
        profile: &HealthProfile,
        metrics: &BodyMetrics,
    ) -> Vec<&'a ConditionNutritionRule> {
        let mut codes = BTreeSet::new();

        for disease in &profile.diseases {
            let code = normalize_tag(disease);
            if self.catalog.contains(&code) {
                codes.insert(code);
            } else if !code.is_empty() {
                tracing::debug!(condition = %code, "no nutrition rule for condition, ignored");
            }
        }

        if let Some(bmi) = metrics.bmi() {
            if bmi >= OBESITY_BMI && self.catalog.contains(OBESITY) {
                codes.insert(OBESITY.to_owned());
            } else if bmi < UNDERWEIGHT_BMI && self.catalog.contains(UNDERWEIGHT) {
                codes.insert(UNDERWEIGHT.to_owned());
            }
        }

        let mut rules = codes
            .iter()
            .filter_map(|code| self.catalog.get(code))
            .collect::<Vec<_>>();

        rules.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.condition_code.cmp(&b.condition_code))
        });

        rules
    }

    pub fn aggregate(&self, profile: &HealthProfile) -> NutritionTargetProfile {
        let metrics = BodyMetrics::from_profile(profile);
        let rules = self.active_rules(profile, &metrics);
        let mut adjustments = Vec::new();

        let total_calories = total_calories(&rules, &metrics, &mut adjustments);

        let macro_targets = Macro::VARIANTS
            .iter()
            .map(|nutrient| {
                let range = merge_macro(
                    *nutrient,
                    &rules,
                    &metrics,
                    f64::from(total_calories),
                    &mut adjustments,
                );
                (*nutrient, range)
            })
            .collect();

        let mut micronutrient_caps = BTreeMap::new();
        let mut cap_sources = BTreeMap::new();
        for rule in &rules {
            for (nutrient, cap) in &rule.micronutrient_caps {
                let current = micronutrient_caps.entry(*nutrient).or_insert(*cap);
                if *cap < *current || !cap_sources.contains_key(nutrient) {
                    *current = *cap;
                    cap_sources.insert(*nutrient, rule.condition_code.to_owned());
                }
            }
        }

        let mut excluded_ingredients = profile
            .allergies
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect::<BTreeSet<_>>();

        let mut preferred_ingredients = BTreeMap::new();
        let mut preferred_sources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for rule in &rules {
            excluded_ingredients.extend(rule.excluded_ingredient_tags.iter().cloned());

            for (tag, bonus) in &rule.preferred_ingredient_tags {
                *preferred_ingredients.entry(tag.to_owned()).or_insert(0.0) += bonus;
                preferred_sources
                    .entry(tag.to_owned())
                    .or_default()
                    .insert(rule.condition_code.to_owned());
            }
        }

        NutritionTargetProfile {
            total_calories,
            macro_targets,
            micronutrient_caps,
            excluded_ingredients,
            preferred_ingredients,
            applied_adjustments: adjustments,
            active_conditions: rules.iter().map(|r| r.condition_code.to_owned()).collect(),
            cap_sources,
            preferred_sources,
        }
    }
}

fn total_calories(
    rules: &[&ConditionNutritionRule],
    metrics: &BodyMetrics,
    adjustments: &mut Vec<AppliedAdjustment>,
) -> u32 {
    let base = CalorieBudgetCalculator::base_calories(metrics);
    let mut delta = 0.0;

    for rule in rules {
        let (value, reason) = match rule.calorie_adjustment {
            CalorieAdjustment::Fixed { kcal } => (kcal, format!("fixed {kcal:+.0} kcal")),
            CalorieAdjustment::PerKgStandardWeight { kcal_per_kg } => {
                match metrics.reference_weight_kg() {
                    Some(weight) => (
                        kcal_per_kg * weight,
                        format!("{kcal_per_kg:+.1} kcal/kg × {weight:.1} kg reference weight"),
                    ),
                    None => {
                        adjustments.push(AppliedAdjustment {
                            condition_code: rule.condition_code.to_owned(),
                            kind: AdjustmentKind::Skipped,
                            delta: 0.0,
                            reason: "per-kg calorie formula needs height or weight".to_owned(),
                        });
                        continue;
                    }
                }
            }
        };

        if value == 0.0 {
            continue;
        }

        delta += value;
        adjustments.push(AppliedAdjustment {
            condition_code: rule.condition_code.to_owned(),
            kind: AdjustmentKind::Calorie,
            delta: value,
            reason,
        });
    }

    let floor = CalorieBudgetCalculator::floor(metrics.gender);
    let total = (base + delta).round();

    if total < f64::from(floor) {
        adjustments.push(AppliedAdjustment {
            condition_code: FLOOR_CODE.to_owned(),
            kind: AdjustmentKind::Floor,
            delta: f64::from(floor) - total,
            reason: format!("raised {total:.0} kcal to the {floor} kcal floor"),
        });

        return floor;
    }

    total as u32
}

fn resolve_macro(
    nutrient: Macro,
    rule: &MacroRule,
    metrics: &BodyMetrics,
    total_calories: f64,
) -> Option<MacroRange> {
    match *rule {
        MacroRule::PercentOfCalories { min, max } => Some(percent_range(
            nutrient,
            min,
            max,
            total_calories,
        )),
        MacroRule::PerKgBodyWeight { min_g, max_g } => metrics
            .reference_weight_kg()
            .map(|weight| MacroRange::new(min_g * weight, max_g * weight)),
    }
}

fn percent_range(nutrient: Macro, min: f64, max: f64, total_calories: f64) -> MacroRange {
    let grams = |percent: f64| total_calories * percent / 100.0 / nutrient.kcal_per_gram();

    MacroRange::new(grams(min), grams(max))
}

fn default_range(nutrient: Macro, total_calories: f64) -> MacroRange {
    let (min, max) = DEFAULT_MACRO_PERCENTS
        .iter()
        .find(|(n, _, _)| *n == nutrient)
        .map(|(_, min, max)| (*min, *max))
        .unwrap_or((0.0, 100.0));

    percent_range(nutrient, min, max, total_calories)
}

fn merge_macro(
    nutrient: Macro,
    rules: &[&ConditionNutritionRule],
    metrics: &BodyMetrics,
    total_calories: f64,
    adjustments: &mut Vec<AppliedAdjustment>,
) -> MacroRange {
    let mut contributors = Vec::new();

    for rule in rules {
        let Some(macro_rule) = rule.macro_ranges.get(&nutrient) else {
            continue;
        };

        match resolve_macro(nutrient, macro_rule, metrics, total_calories) {
            Some(range) => contributors.push((rule.condition_code.as_str(), range)),
            None => adjustments.push(AppliedAdjustment {
                condition_code: rule.condition_code.to_owned(),
                kind: AdjustmentKind::Skipped,
                delta: 0.0,
                reason: format!("per-kg {nutrient} range needs height or weight"),
            }),
        }
    }

    // contributors are in processing order, highest severity first; a rule that would
    // empty the intersection of everything kept before it is dropped
    let mut merged: Option<MacroRange> = None;
    for (code, range) in contributors {
        let candidate = merged.map_or(range, |acc| acc.intersect(&range));
        if candidate.is_valid() {
            merged = Some(candidate);
            continue;
        }

        tracing::warn!(
            nutrient = %nutrient,
            dropped = code,
            min_g = range.min_g,
            max_g = range.max_g,
            "conflicting macro ranges, dropping lower-severity rule"
        );

        adjustments.push(AppliedAdjustment {
            condition_code: code.to_owned(),
            kind: AdjustmentKind::Conflict,
            delta: 0.0,
            reason: format!(
                "{nutrient} range {:.1}-{:.1} g conflicts with higher-severity rules",
                range.min_g, range.max_g
            ),
        });
    }

    merged.unwrap_or_else(|| default_range(nutrient, total_calories))
}

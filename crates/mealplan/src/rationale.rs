use bitcode::{Decode, Encode};
use nutriplan_nutrition::{MealSlotTarget, NutritionTargetProfile};
use nutriplan_shared::mealplan::MealType;
use nutriplan_shared::recipe::RecipeCandidate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::deviation_score;

#[derive(
    Encode, Decode, Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReasonKind {
    CalorieFit,
    MacroFit,
    ConditionMatch,
    CapWithin,
    CapExceeded,
    ExclusionsRespected,
    MissingData,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RationaleReason {
    pub kind: ReasonKind,
    pub text: String,
    /// Inputs the text was rendered from
    pub values: Vec<(String, f64)>,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionRationale {
    pub meal_type: MealType,
    pub recipe_identifier: String,
    pub reasons: Vec<RationaleReason>,
}

impl SelectionRationale {
    pub fn text(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Explains a pick from the slot target, the candidate and the target profile alone.
pub struct SelectionRationaleBuilder;

impl SelectionRationaleBuilder {
    pub fn build(
        slot: &MealSlotTarget,
        candidate: &RecipeCandidate,
        profile: &NutritionTargetProfile,
    ) -> SelectionRationale {
        let mut reasons = vec![calorie_reason(slot, candidate)];

        reasons.extend(macro_reasons(slot, candidate));
        reasons.extend(condition_reasons(candidate, profile));
        reasons.extend(cap_reasons(slot, candidate, profile));

        if !profile.excluded_ingredients.is_empty() {
            let excluded = profile
                .excluded_ingredients
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>();

            reasons.push(RationaleReason {
                kind: ReasonKind::ExclusionsRespected,
                text: format!("Free of excluded ingredients: {}", excluded.join(", ")),
                values: vec![("excluded_count".to_owned(), excluded.len() as f64)],
            });
        }

        SelectionRationale {
            meal_type: slot.meal_type,
            recipe_identifier: candidate.identifier(),
            reasons,
        }
    }
}

fn calorie_reason(slot: &MealSlotTarget, candidate: &RecipeCandidate) -> RationaleReason {
    let target = f64::from(slot.calorie_target);

    match candidate.nutrition.calories {
        Some(kcal) => {
            let fit = deviation_score(kcal, target);

            RationaleReason {
                kind: ReasonKind::CalorieFit,
                text: format!(
                    "Provides {kcal:.0} kcal against the {target:.0} kcal {} target ({fit:.1}% fit)",
                    slot.meal_type
                ),
                values: vec![
                    ("calories".to_owned(), kcal),
                    ("calorie_target".to_owned(), target),
                    ("calorie_fit".to_owned(), fit),
                ],
            }
        }
        None => RationaleReason {
            kind: ReasonKind::MissingData,
            text: format!(
                "Calories not reported, the {target:.0} kcal {} target was not checked",
                slot.meal_type
            ),
            values: vec![("calorie_target".to_owned(), target)],
        },
    }
}

fn macro_reasons(slot: &MealSlotTarget, candidate: &RecipeCandidate) -> Vec<RationaleReason> {
    slot.macro_targets
        .iter()
        .filter_map(|(nutrient, range)| {
            let grams = candidate.nutrition.macro_g(*nutrient)?;
            let position = if grams < range.min_g {
                "below"
            } else if grams > range.max_g {
                "above"
            } else {
                "within"
            };

            Some(RationaleReason {
                kind: ReasonKind::MacroFit,
                text: format!(
                    "{nutrient} {grams:.1} g is {position} the {:.1}-{:.1} g target",
                    range.min_g, range.max_g
                ),
                values: vec![
                    (format!("{nutrient}_g"), grams),
                    (format!("{nutrient}_min_g"), range.min_g),
                    (format!("{nutrient}_max_g"), range.max_g),
                ],
            })
        })
        .collect()
}

fn condition_reasons(
    candidate: &RecipeCandidate,
    profile: &NutritionTargetProfile,
) -> Vec<RationaleReason> {
    candidate
        .normalized_tags()
        .into_iter()
        .filter_map(|tag| {
            let bonus = *profile.preferred_ingredients.get(&tag)?;
            let conditions = profile
                .preferred_sources
                .get(&tag)
                .map(|codes| codes.iter().map(String::as_str).collect::<Vec<_>>())
                .unwrap_or_default();

            Some(RationaleReason {
                kind: ReasonKind::ConditionMatch,
                text: format!(
                    "Contains {tag}, preferred for {} (+{bonus:.1})",
                    conditions.join(", ")
                ),
                values: vec![(format!("{tag}_bonus"), bonus)],
            })
        })
        .collect()
}

fn cap_reasons(
    slot: &MealSlotTarget,
    candidate: &RecipeCandidate,
    profile: &NutritionTargetProfile,
) -> Vec<RationaleReason> {
    slot.micronutrient_caps
        .iter()
        .filter_map(|(nutrient, cap)| {
            let mg = candidate.nutrition.micronutrient_mg(*nutrient)?;
            let source = profile
                .cap_sources
                .get(nutrient)
                .map(String::as_str)
                .unwrap_or("profile");

            let (kind, verb) = if mg <= *cap {
                (ReasonKind::CapWithin, "stays under")
            } else {
                (ReasonKind::CapExceeded, "exceeds")
            };

            Some(RationaleReason {
                kind,
                text: format!("{nutrient} {mg:.0} mg {verb} the {cap:.0} mg cap set by {source}"),
                values: vec![
                    (format!("{nutrient}_mg"), mg),
                    (format!("{nutrient}_cap_mg"), *cap),
                ],
            })
        })
        .collect()
}

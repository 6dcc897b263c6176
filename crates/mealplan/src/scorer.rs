use std::cmp::Ordering;

use bitcode::{Decode, Encode};
use nutriplan_nutrition::{MealSlotTarget, NutritionTargetProfile};
use nutriplan_shared::recipe::{RecipeCandidate, normalize_title};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_calorie_weight")]
    pub calorie_weight: f64,
    #[serde(default = "default_macro_weight")]
    pub macro_weight: f64,
    /// Subtracted once per micronutrient cap the candidate exceeds
    #[serde(default = "default_cap_penalty")]
    pub cap_penalty: f64,
}

fn default_calorie_weight() -> f64 {
    0.5
}

fn default_macro_weight() -> f64 {
    0.3
}

fn default_cap_penalty() -> f64 {
    10.0
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            calorie_weight: default_calorie_weight(),
            macro_weight: default_macro_weight(),
            cap_penalty: default_cap_penalty(),
        }
    }
}

#[derive(Encode, Decode, Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub calorie_score: f64,
    pub macro_score: f64,
    pub condition_bonus: f64,
    pub condition_penalty: f64,
}

#[derive(Encode, Decode, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: RecipeCandidate,
    pub identifier: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// `max(0, 100 − |actual − target| / target × 100)`.
///
/// A non-positive target only scores when the actual value matches it.
pub fn deviation_score(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return if actual == target { 100.0 } else { 0.0 };
    }

    (100.0 - (actual - target).abs() / target * 100.0).max(0.0)
}

/// Scores candidates for one subject's aggregated constraints.
///
/// Scoring is a pure function of the slot, the candidate, the target profile and the weights.
pub struct RecipeScorer<'a> {
    profile: &'a NutritionTargetProfile,
    weights: ScoringWeights,
}

impl<'a> RecipeScorer<'a> {
    pub fn new(profile: &'a NutritionTargetProfile, weights: ScoringWeights) -> Self {
        Self { profile, weights }
    }

    pub fn profile(&self) -> &'a NutritionTargetProfile {
        self.profile
    }

    /// Hard constraint: a candidate carrying any excluded tag is never eligible.
    pub fn is_excluded(&self, candidate: &RecipeCandidate) -> bool {
        candidate
            .normalized_tags()
            .iter()
            .any(|tag| self.profile.is_excluded(tag))
    }

    /// `None` when the candidate is excluded.
    pub fn score(
        &self,
        slot: &MealSlotTarget,
        candidate: &RecipeCandidate,
    ) -> Option<ScoredCandidate> {
        let tags = candidate.normalized_tags();
        if tags.iter().any(|tag| self.profile.is_excluded(tag)) {
            return None;
        }

        let nutrition = &candidate.nutrition;

        let calorie_score = nutrition
            .calories
            .map(|kcal| deviation_score(kcal, f64::from(slot.calorie_target)))
            .unwrap_or(0.0);

        let macro_scores = slot
            .macro_targets
            .iter()
            .filter_map(|(nutrient, range)| {
                nutrition
                    .macro_g(*nutrient)
                    .map(|grams| deviation_score(grams, range.midpoint()))
            })
            .collect::<Vec<_>>();

        let macro_score = if macro_scores.is_empty() {
            0.0
        } else {
            macro_scores.iter().sum::<f64>() / macro_scores.len() as f64
        };

        let condition_bonus = tags
            .iter()
            .filter_map(|tag| self.profile.preferred_ingredients.get(tag))
            .sum::<f64>();

        let exceeded = slot
            .micronutrient_caps
            .iter()
            .filter(|(nutrient, cap)| {
                nutrition
                    .micronutrient_mg(**nutrient)
                    .is_some_and(|mg| mg > **cap)
            })
            .count();

        let breakdown = ScoreBreakdown {
            calorie_score,
            macro_score,
            condition_bonus,
            condition_penalty: exceeded as f64 * self.weights.cap_penalty,
        };

        Some(ScoredCandidate {
            candidate: candidate.clone(),
            identifier: candidate.identifier(),
            score: self.weights.calorie_weight * breakdown.calorie_score
                + self.weights.macro_weight * breakdown.macro_score
                + breakdown.condition_bonus
                - breakdown.condition_penalty,
            breakdown,
        })
    }

    /// Scores every eligible candidate, best first.
    pub fn rank<'c>(
        &self,
        slot: &MealSlotTarget,
        candidates: impl IntoIterator<Item = &'c RecipeCandidate>,
    ) -> Vec<ScoredCandidate> {
        let mut scored = candidates
            .into_iter()
            .filter_map(|c| self.score(slot, c))
            .collect::<Vec<_>>();

        scored.sort_by(compare_ranked);

        scored
    }
}

/// Score descending, then normalized title, then identifier.
pub fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| normalize_title(&a.candidate.title).cmp(&normalize_title(&b.candidate.title)))
        .then_with(|| a.identifier.cmp(&b.identifier))
}

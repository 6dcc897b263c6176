use nutriplan_shared::mealplan::MealType;

use crate::{MealSlotTarget, NutritionTargetProfile};

/// Share of the daily budget per slot, in per-mille.
pub const MEAL_RATIOS: [(MealType, u32); 4] = [
    (MealType::Breakfast, 300),
    (MealType::Lunch, 350),
    (MealType::Dinner, 300),
    (MealType::Snack, 50),
];

const _: () = {
    let mut sum = 0;
    let mut i = 0;
    while i < MEAL_RATIOS.len() {
        sum += MEAL_RATIOS[i].1;
        i += 1;
    }
    assert!(sum == 1000, "meal ratios must sum to 1.0");
};

pub struct MealAllocator;

impl MealAllocator {
    pub fn ratio(meal_type: MealType) -> f64 {
        MEAL_RATIOS
            .iter()
            .find(|(m, _)| *m == meal_type)
            .map(|(_, per_mille)| f64::from(*per_mille) / 1000.0)
            .unwrap_or(0.0)
    }

    /// One target per slot, in breakfast, lunch, dinner, snack order.
    pub fn allocate(profile: &NutritionTargetProfile) -> Vec<MealSlotTarget> {
        MEAL_RATIOS
            .iter()
            .map(|(meal_type, _)| Self::slot(profile, *meal_type))
            .collect()
    }

    pub fn slot(profile: &NutritionTargetProfile, meal_type: MealType) -> MealSlotTarget {
        let ratio = Self::ratio(meal_type);

        MealSlotTarget {
            meal_type,
            calorie_target: (f64::from(profile.total_calories) * ratio).round() as u32,
            macro_targets: profile
                .macro_targets
                .iter()
                .map(|(nutrient, range)| (*nutrient, range.scale(ratio)))
                .collect(),
            micronutrient_caps: profile
                .micronutrient_caps
                .iter()
                .map(|(nutrient, cap)| (*nutrient, cap * ratio))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConditionAggregator, ConditionRuleCatalog};
    use nutriplan_shared::recipe::Micronutrient;
    use nutriplan_shared::user::HealthProfile;

    #[test]
    fn test_ratios_sum_to_one() {
        let sum = MEAL_RATIOS
            .iter()
            .map(|(m, _)| MealAllocator::ratio(*m))
            .sum::<f64>();

        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocate_splits_calories_and_caps() {
        let catalog = ConditionRuleCatalog::builtin();
        let profile = HealthProfile {
            diseases: ["hypertension".to_owned()].into(),
            ..Default::default()
        };
        let target = ConditionAggregator::new(&catalog).aggregate(&profile);

        let slots = MealAllocator::allocate(&target);
        let calories = slots.iter().map(|s| s.calorie_target).collect::<Vec<_>>();

        assert_eq!(
            slots.iter().map(|s| s.meal_type).collect::<Vec<_>>(),
            vec![
                MealType::Breakfast,
                MealType::Lunch,
                MealType::Dinner,
                MealType::Snack
            ]
        );
        assert_eq!(calories, vec![600, 700, 600, 100]);
        assert!((slots[1].micronutrient_caps[&Micronutrient::Sodium] - 525.0).abs() < 1e-9);
    }
}

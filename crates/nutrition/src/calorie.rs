use nutriplan_shared::user::{ActivityLevel, Gender, HealthProfile};

/// Base energy need used when the profile lacks the data for Mifflin-St Jeor
pub const DEFAULT_BASE_CALORIES: f64 = 2000.0;
pub const FEMALE_CALORIE_FLOOR: u32 = 1200;
pub const CALORIE_FLOOR: u32 = 1500;

const MAX_AGE: u32 = 130;

/// A profile field that is present but cannot be used.
///
/// Never returned to callers: the field is dropped and the engine falls back to the
/// default for missing data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidProfileData {
    #[error("weight_kg must be positive and finite, got {0}")]
    Weight(f64),

    #[error("height_cm must be positive and finite, got {0}")]
    Height(f64),

    #[error("age must be between 1 and 130, got {0}")]
    Age(u32),

    #[error("daily_calorie_goal_override must be positive and finite, got {0}")]
    CalorieGoal(f64),
}

/// Validated subset of [`HealthProfile`] used by the calorie and macro math.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyMetrics {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub calorie_goal_override: Option<f64>,
}

impl BodyMetrics {
    pub fn from_profile(profile: &HealthProfile) -> Self {
        Self {
            age: recover(profile.age.map(validate_age)),
            gender: profile.gender,
            weight_kg: recover(profile.weight_kg.map(validate_weight)),
            height_cm: recover(profile.height_cm.map(validate_height)),
            activity_level: profile.activity_level,
            calorie_goal_override: recover(
                profile.daily_calorie_goal_override.map(validate_calorie_goal),
            ),
        }
    }

    pub fn bmi(&self) -> Option<f64> {
        let weight = self.weight_kg?;
        let height_m = self.height_cm? / 100.0;

        Some(weight / (height_m * height_m))
    }

    /// Standard body weight, 22 × height_m²
    pub fn standard_weight_kg(&self) -> Option<f64> {
        let height_m = self.height_cm? / 100.0;

        Some(22.0 * height_m * height_m)
    }

    /// Weight used by per-kg rules: standard weight when height is known, else actual weight.
    pub fn reference_weight_kg(&self) -> Option<f64> {
        self.standard_weight_kg().or(self.weight_kg)
    }
}

fn validate_weight(value: f64) -> Result<f64, InvalidProfileData> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InvalidProfileData::Weight(value))
    }
}

fn validate_height(value: f64) -> Result<f64, InvalidProfileData> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InvalidProfileData::Height(value))
    }
}

fn validate_age(value: u32) -> Result<u32, InvalidProfileData> {
    if (1..=MAX_AGE).contains(&value) {
        Ok(value)
    } else {
        Err(InvalidProfileData::Age(value))
    }
}

fn validate_calorie_goal(value: f64) -> Result<f64, InvalidProfileData> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InvalidProfileData::CalorieGoal(value))
    }
}

fn recover<T>(value: Option<Result<T, InvalidProfileData>>) -> Option<T> {
    match value? {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(err = %err, "invalid profile data, using default");
            None
        }
    }
}

pub struct CalorieBudgetCalculator;

impl CalorieBudgetCalculator {
    pub fn activity_factor(level: Option<ActivityLevel>) -> f64 {
        match level.unwrap_or(ActivityLevel::Sedentary) {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }

    /// Mifflin-St Jeor: 10·kg + 6.25·cm − 5·age, +5 for male and −161 otherwise.
    pub fn bmr(metrics: &BodyMetrics) -> Option<f64> {
        let weight = metrics.weight_kg?;
        let height = metrics.height_cm?;
        let age = metrics.age?;
        let offset = match metrics.gender? {
            Gender::Male => 5.0,
            Gender::Female | Gender::Other => -161.0,
        };

        Some(10.0 * weight + 6.25 * height - 5.0 * f64::from(age) + offset)
    }

    /// Daily energy need before condition adjustments.
    ///
    /// An override on the profile replaces the computed value; incomplete data yields
    /// [`DEFAULT_BASE_CALORIES`].
    pub fn base_calories(metrics: &BodyMetrics) -> f64 {
        if let Some(goal) = metrics.calorie_goal_override {
            return goal;
        }

        match Self::bmr(metrics) {
            Some(bmr) => bmr * Self::activity_factor(metrics.activity_level),
            None => DEFAULT_BASE_CALORIES,
        }
    }

    pub fn floor(gender: Option<Gender>) -> u32 {
        match gender {
            Some(Gender::Female) => FEMALE_CALORIE_FLOOR,
            _ => CALORIE_FLOOR,
        }
    }
}

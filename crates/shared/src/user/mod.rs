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
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
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
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

/// Snapshot of a subject's health data as provided by the host product.
///
/// Every field is optional: a subject without a stored profile is represented by
/// `HealthProfile::default()` and the nutrition engine substitutes defaults.
#[derive(Encode, Decode, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
    /// Condition codes, e.g. `diabetes`, `ckd`, `hypertension`
    #[serde(default)]
    pub diseases: BTreeSet<String>,
    /// Ingredient tags the subject must never be served
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    #[serde(default)]
    pub daily_calorie_goal_override: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_deserialize_to_empty_profile() {
        let profile: HealthProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(profile, HealthProfile::default());
    }

    #[test]
    fn test_enum_wire_names() {
        let profile: HealthProfile = serde_json::from_str(
            r#"{"gender":"female","activity_level":"very_active","diseases":["ckd"]}"#,
        )
        .unwrap();

        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(profile.activity_level, Some(ActivityLevel::VeryActive));
        assert!(profile.diseases.contains("ckd"));
        assert_eq!(ActivityLevel::VeryActive.to_string(), "very_active");
    }
}

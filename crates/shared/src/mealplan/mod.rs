use std::fmt;

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantArray};
use time::Date;

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
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Who a plan is generated for: a user, or one family member managed by that user.
#[derive(
    Encode, Decode, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SubjectKey {
    pub user_id: String,
    pub family_member_id: Option<String>,
}

impl SubjectKey {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            family_member_id: None,
        }
    }

    pub fn member(user_id: impl Into<String>, family_member_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            family_member_id: Some(family_member_id.into()),
        }
    }

    /// Storage partition key, `user` or `user/member`, with `%` and `/` percent-encoded
    /// inside each id so distinct subjects never share a key.
    pub fn storage_key(&self) -> String {
        let user = escape_key_part(&self.user_id);

        match self.family_member_id.as_deref() {
            Some(member) if !member.is_empty() => format!("{user}/{}", escape_key_part(member)),
            _ => user,
        }
    }
}

fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace('/', "%2F")
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family_member_id.as_deref() {
            Some(member) if !member.is_empty() => write!(f, "{}/{}", self.user_id, member),
            _ => f.write_str(&self.user_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub subject_key: SubjectKey,
    pub recipe_identifier: String,
    pub meal_type: MealType,
    pub used_date: Date,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_meal_type_snake_case() {
        assert_eq!(MealType::Breakfast.to_string(), "breakfast");
        assert_eq!(MealType::from_str("snack").unwrap(), MealType::Snack);
        assert!(MealType::from_str("brunch").is_err());
        assert_eq!(MealType::VARIANTS.len(), 4);
    }

    #[test]
    fn test_subject_storage_key() {
        assert_eq!(SubjectKey::user("u1").storage_key(), "u1");
        assert_eq!(SubjectKey::member("u1", "kid").storage_key(), "u1/kid");

        let empty_member = SubjectKey {
            user_id: "u1".to_owned(),
            family_member_id: Some(String::new()),
        };
        assert_eq!(empty_member.storage_key(), "u1");
    }

    #[test]
    fn test_storage_key_keeps_separator_in_ids_apart() {
        let slash_user = SubjectKey::user("a/b");
        let member = SubjectKey::member("a", "b");

        assert_eq!(slash_user.storage_key(), "a%2Fb");
        assert_eq!(member.storage_key(), "a/b");
        assert_ne!(
            SubjectKey::member("a%2Fb", "c").storage_key(),
            SubjectKey::member("a/b", "c").storage_key()
        );
        assert_eq!(slash_user.to_string(), "a/b");
    }
}

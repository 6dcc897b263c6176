use std::collections::BTreeSet;
use std::time::Duration;

use crate::mealplan::MealType;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no eligible recipe for {meal_type} (excluded: {})", join_tags(.excluded))]
    NoEligibleRecipe {
        meal_type: MealType,
        excluded: BTreeSet<String>,
    },

    #[error("usage ledger write failed: {0}")]
    LedgerWrite(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{0}")]
    Unknown(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_no_eligible_recipe(&self) -> bool {
        matches!(self, Error::NoEligibleRecipe { .. })
    }
}

fn join_tags(tags: &BTreeSet<String>) -> String {
    if tags.is_empty() {
        return "none".to_owned();
    }

    tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

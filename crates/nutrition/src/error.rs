#[derive(Debug, thiserror::Error)]
pub enum NutritionError {
    #[error("invalid rule for condition `{code}`: {reason}")]
    InvalidRule { code: String, reason: String },
}

mod error;
pub mod mealplan;
pub mod recipe;
pub mod user;

pub use error::*;

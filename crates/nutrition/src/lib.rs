mod aggregator;
mod allocator;
mod calorie;
mod catalog;
mod error;
mod target;

pub use aggregator::*;
pub use allocator::*;
pub use calorie::*;
pub use catalog::*;
pub use error::*;
pub use target::*;

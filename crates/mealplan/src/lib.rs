mod batch;
mod ledger;
mod planner;
mod provider;
mod rationale;
mod scorer;
mod selector;

pub use batch::*;
pub use ledger::*;
pub use planner::*;
pub use provider::*;
pub use rationale::*;
pub use scorer::*;
pub use selector::*;

cfg_if::cfg_if! {
    if #[cfg(feature = "full")] {
        mod scheduler;
        mod sqlite;

        pub use scheduler::*;
        pub use sqlite::*;
    }
}

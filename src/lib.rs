pub mod config;
pub mod db;
pub mod migrate;
pub mod observability;
pub mod planning;

pub use config::Config;
pub use planning::Planning;

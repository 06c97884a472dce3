pub mod backoff;
pub mod cache;
pub mod config;
pub mod error;
pub mod planner;
pub mod searoute;
pub mod weather;

pub use config::Config;
pub use error::ProviderError;
pub use planner::VoyagePlanner;

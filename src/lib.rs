pub mod auth;
pub mod core;
pub mod export;
pub mod filings;
pub mod utils;
pub mod workflow;

// Re-exports
pub use core::config::{ConfigError, Credentials, ScraperConfig};
pub use core::types::{FilingBatch, FilingRecord};
pub use utils::progress::ProgressTracker;
pub use workflow::{RunOutcome, RunReport, Stage, Workflow};

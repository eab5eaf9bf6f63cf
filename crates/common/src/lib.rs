//! Acadex Common Library
//!
//! Shared code for the Acadex gateway and the blueprint importer:
//! - Configuration management
//! - Error types and HTTP mapping
//! - SeaORM entities, connection pool and schema bootstrap
//! - Repository of natural-key lookups and upserts
//! - Attendance service
//! - Metrics helpers

pub mod attendance;
pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use attendance::AttendanceService;
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

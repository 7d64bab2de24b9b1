//! # pg-server-migrate
//!
//! Server-level migration between two PostgreSQL servers.
//!
//! A run copies, from a source server to a destination server:
//!
//! - **Roles** with their attributes and password hashes
//! - **Databases** with their owners, moved by `pg_dump` / `pg_restore`
//!
//! Roles are migrated first so every database owner exists when its
//! database is created. Existing roles are skipped; existing databases are
//! dropped and recreated.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_server_migrate::{Config, Orchestrator, RunStatus};
//!
//! #[tokio::main]
//! async fn main() -> pg_server_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(&config).await?;
//!     let report = orchestrator.run().await;
//!     if report.status != RunStatus::Completed {
//!         eprintln!("Failed objects: {:?}", report.failed_objects());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod ddl;
pub mod dump;
pub mod error;
pub mod orchestrator;
pub mod pool;
pub mod report;
pub mod source;
pub mod target;
pub mod tls;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, ServerConfig};
pub use error::{MigrateError, Result};
pub use orchestrator::{health_check, HealthCheckResult, Orchestrator, RunOptions};
pub use report::{
    MigrationEvent, MigrationReport, ObjectOutcome, ProgressReporter, RunStatus, TracingReporter,
};

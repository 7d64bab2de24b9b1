//! Per-object outcomes, the run summary, and the progress sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::Result;

/// Step of an object's migration that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CheckExists,
    ResolveOwner,
    Drop,
    Create,
    Dump,
    Restore,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::CheckExists => "existence check",
            Step::ResolveOwner => "owner lookup",
            Step::Drop => "drop",
            Step::Create => "create",
            Step::Dump => "dump",
            Step::Restore => "restore",
        };
        f.write_str(name)
    }
}

/// What a dry run would have done with an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    CreateRole,
    SkipExistingRole,
    CreateDatabase,
    ReplaceDatabase,
}

/// Result of migrating a single role or database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ObjectOutcome {
    /// Object now exists on the destination (databases: created, dumped and restored).
    Created,
    /// Object was left untouched.
    Skipped { reason: String },
    /// Object failed at `step`; later steps were not attempted.
    Failed { step: Step, reason: String },
    /// Dry run only.
    Planned { action: PlannedAction },
}

impl ObjectOutcome {
    pub fn failed(step: Step, reason: impl ToString) -> Self {
        ObjectOutcome::Failed {
            step,
            reason: reason.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ObjectOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ObjectOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseReport {
    pub name: String,
    pub owner: Option<String>,
    /// An existing destination database was dropped first.
    pub replaced: bool,
    #[serde(flatten)]
    pub outcome: ObjectOutcome,
}

/// Migration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Roles,
    Databases,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Roles => f.write_str("roles"),
            Phase::Databases => f.write_str("databases"),
        }
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every phase ran to its end and no object failed.
    Completed,
    /// Every phase ran to its end; at least one object failed.
    CompletedWithFailures,
    /// A phase could not enumerate or stage its objects.
    Aborted,
}

/// Summary of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: RunStatus,

    /// Whether DDL, dump and restore were skipped.
    pub dry_run: bool,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Role outcomes in processing order.
    pub roles: Vec<RoleReport>,

    /// Database outcomes in processing order.
    pub databases: Vec<DatabaseReport>,

    /// Reason the run aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationReport {
    pub fn new(run_id: String, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            status: RunStatus::Completed,
            dry_run,
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            roles: Vec::new(),
            databases: Vec::new(),
            error: None,
        }
    }

    /// Stamp completion time and derive the final status.
    pub fn finish(&mut self) {
        self.completed_at = Utc::now();
        self.duration_seconds =
            (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.status = if self.error.is_some() {
            RunStatus::Aborted
        } else if self.has_failures() {
            RunStatus::CompletedWithFailures
        } else {
            RunStatus::Completed
        };
    }

    pub fn has_failures(&self) -> bool {
        self.roles.iter().any(|r| r.outcome.is_failed())
            || self.databases.iter().any(|d| d.outcome.is_failed())
    }

    pub fn roles_created(&self) -> usize {
        self.roles
            .iter()
            .filter(|r| r.outcome == ObjectOutcome::Created)
            .count()
    }

    pub fn roles_skipped(&self) -> usize {
        self.roles
            .iter()
            .filter(|r| matches!(r.outcome, ObjectOutcome::Skipped { .. }))
            .count()
    }

    pub fn roles_failed(&self) -> usize {
        self.roles.iter().filter(|r| r.outcome.is_failed()).count()
    }

    pub fn databases_migrated(&self) -> usize {
        self.databases
            .iter()
            .filter(|d| d.outcome == ObjectOutcome::Created)
            .count()
    }

    pub fn databases_failed(&self) -> usize {
        self.databases.iter().filter(|d| d.outcome.is_failed()).count()
    }

    /// Names of roles and databases that failed, roles first.
    pub fn failed_objects(&self) -> Vec<String> {
        self.roles
            .iter()
            .filter(|r| r.outcome.is_failed())
            .map(|r| format!("role {}", r.name))
            .chain(
                self.databases
                    .iter()
                    .filter(|d| d.outcome.is_failed())
                    .map(|d| format!("database {}", d.name)),
            )
            .collect()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Progress notifications emitted by the orchestrator.
#[derive(Debug, Clone)]
pub enum MigrationEvent {
    PhaseStarted { phase: Phase, objects: usize },
    DatabaseStarted { name: String },
    RoleFinished(RoleReport),
    DatabaseFinished(DatabaseReport),
    /// Advisory problem that does not affect any outcome.
    Warning(String),
    RunFinished(MigrationReport),
}

/// Sink for progress events.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: MigrationEvent);
}

/// Renders progress events as the human-readable log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: MigrationEvent) {
        match event {
            MigrationEvent::PhaseStarted { phase, objects } => {
                info!("=== Migrating {} ===", phase);
                info!("Found {} {} to migrate", objects, phase);
            }
            MigrationEvent::DatabaseStarted { name } => {
                info!("{}", "=".repeat(60));
                info!("Migrating database: {}", name);
            }
            MigrationEvent::RoleFinished(role) => match role.outcome {
                ObjectOutcome::Created => info!("✓ Created role: {}", role.name),
                ObjectOutcome::Skipped { reason } => {
                    info!("Role {} skipped: {}", role.name, reason)
                }
                ObjectOutcome::Failed { step, reason } => {
                    error!("✗ Role {} failed during {}: {}", role.name, step, reason)
                }
                ObjectOutcome::Planned { action } => {
                    info!("[dry run] role {}: {:?}", role.name, action)
                }
            },
            MigrationEvent::DatabaseFinished(db) => match db.outcome {
                ObjectOutcome::Created => info!(
                    "✓ Successfully migrated {} (owner: {})",
                    db.name,
                    db.owner.as_deref().unwrap_or("-")
                ),
                ObjectOutcome::Skipped { reason } => {
                    info!("Database {} skipped: {}", db.name, reason)
                }
                ObjectOutcome::Failed { step, reason } => {
                    error!("✗ Database {} failed during {}: {}", db.name, step, reason)
                }
                ObjectOutcome::Planned { action } => {
                    info!("[dry run] database {}: {:?}", db.name, action)
                }
            },
            MigrationEvent::Warning(message) => warn!("{}", message),
            MigrationEvent::RunFinished(report) => {
                info!("{}", "=".repeat(60));
                info!(
                    "Migration {:?}: roles created={} skipped={} failed={}, databases migrated={} failed={} in {:.1}s",
                    report.status,
                    report.roles_created(),
                    report.roles_skipped(),
                    report.roles_failed(),
                    report.databases_migrated(),
                    report.databases_failed(),
                    report.duration_seconds
                );
                if let Some(ref reason) = report.error {
                    error!("Run aborted: {}", reason);
                }
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<MigrationEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<MigrationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressReporter for MemoryReporter {
    fn report(&self, event: MigrationEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

//! Migration orchestrator - main workflow coordinator.
//!
//! A run has two phases. The role phase recreates every non-system role of
//! the source on the destination; it always finishes before the database
//! phase starts, so database owners exist by the time `CREATE DATABASE ...
//! OWNER` runs. The database phase moves each non-template database through
//! drop (when present), create, dump and restore.
//!
//! A failure on one object is recorded against that object and the phase
//! moves on. Only a failure to enumerate a phase's objects, or to create the
//! dump directory, aborts the run.
//!
//! Existing destination databases are dropped without confirmation. Existing
//! roles are left as they are, attributes included.

mod health;

pub use health::{health_check, HealthCheckResult};

use crate::config::Config;
use crate::ddl;
use crate::dump::{dump_file_name, DumpRestore, PgDumpRestore};
use crate::error::{MigrateError, Result};
use crate::report::{
    DatabaseReport, MigrationEvent, MigrationReport, ObjectOutcome, Phase, PlannedAction,
    ProgressReporter, RoleReport, Step, TracingReporter,
};
use crate::source::{PasswordHash, PgSourceCatalog, Role, SourceCatalog};
use crate::target::{PgTarget, TargetServer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Switches for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Enumerate and check existence only; no DDL, dump or restore.
    pub dry_run: bool,
    /// Skip the role phase.
    pub skip_roles: bool,
    /// Skip the database phase.
    pub skip_databases: bool,
}

/// Failure of one object at one step.
type StepError = (Step, MigrateError);

/// Migration orchestrator.
pub struct Orchestrator {
    dump_dir: PathBuf,
    source: Arc<dyn SourceCatalog>,
    target: Arc<dyn TargetServer>,
    tools: Arc<dyn DumpRestore>,
    reporter: Arc<dyn ProgressReporter>,
    options: RunOptions,
}

impl Orchestrator {
    /// Connect to both servers.
    ///
    /// The source is connected first; if the destination then fails, the
    /// source connection is closed before the error is returned.
    pub async fn connect(config: &Config) -> Result<Self> {
        let source = PgSourceCatalog::connect(&config.source).await?;
        let target = match PgTarget::connect(&config.target).await {
            Ok(target) => target,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };

        Ok(Self::from_parts(
            config.migration.dump_dir.clone(),
            Arc::new(source),
            Arc::new(target),
            Arc::new(PgDumpRestore::new(config)),
        ))
    }

    /// Assemble an orchestrator from already-connected parts.
    pub fn from_parts(
        dump_dir: impl Into<PathBuf>,
        source: Arc<dyn SourceCatalog>,
        target: Arc<dyn TargetServer>,
        tools: Arc<dyn DumpRestore>,
    ) -> Self {
        Self {
            dump_dir: dump_dir.into(),
            source,
            target,
            tools,
            reporter: Arc::new(TracingReporter),
            options: RunOptions::default(),
        }
    }

    /// Replace the default tracing reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the migration.
    ///
    /// Both connections are closed before this returns, whatever the outcome.
    /// An aborted run is reported through [`MigrationReport::error`].
    pub async fn run(self) -> MigrationReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);
        if self.options.dry_run {
            info!("Dry run: no changes will be made to the destination");
        }

        let mut report = MigrationReport::new(run_id, self.options.dry_run);
        if let Err(e) = self.run_phases(&mut report).await {
            report.error = Some(e.to_string());
        }

        self.source.close().await;
        self.target.close().await;

        report.finish();
        self.reporter
            .report(MigrationEvent::RunFinished(report.clone()));
        report
    }

    async fn run_phases(&self, report: &mut MigrationReport) -> Result<()> {
        if self.options.skip_roles {
            info!("Skipping role phase");
        } else {
            self.migrate_roles(&mut report.roles).await?;
        }

        if self.options.skip_databases {
            info!("Skipping database phase");
        } else {
            self.migrate_databases(&mut report.databases).await?;
        }
        Ok(())
    }

    // ===== Phase 1: roles =====

    async fn migrate_roles(&self, results: &mut Vec<RoleReport>) -> Result<()> {
        let roles = self
            .source
            .list_roles()
            .await
            .map_err(|e| abort("enumerate source roles", e))?;
        let credentials = self
            .source
            .role_credentials()
            .await
            .map_err(|e| abort("read source role credentials", e))?;

        self.reporter.report(MigrationEvent::PhaseStarted {
            phase: Phase::Roles,
            objects: roles.len(),
        });

        for role in &roles {
            let outcome = self.migrate_role(role, credentials.get(&role.name)).await;
            let result = RoleReport {
                name: role.name.clone(),
                outcome,
            };
            self.reporter
                .report(MigrationEvent::RoleFinished(result.clone()));
            results.push(result);
        }
        Ok(())
    }

    async fn migrate_role(&self, role: &Role, password: Option<&PasswordHash>) -> ObjectOutcome {
        let exists = match self.target.role_exists(&role.name).await {
            Ok(exists) => exists,
            Err(e) => return ObjectOutcome::failed(Step::CheckExists, e),
        };

        if exists {
            return if self.options.dry_run {
                ObjectOutcome::Planned {
                    action: PlannedAction::SkipExistingRole,
                }
            } else {
                ObjectOutcome::Skipped {
                    reason: "already exists on destination".to_string(),
                }
            };
        }

        let sql = match ddl::create_role_sql(role, password) {
            Ok(sql) => sql,
            Err(e) => return ObjectOutcome::failed(Step::Create, e),
        };

        if self.options.dry_run {
            return ObjectOutcome::Planned {
                action: PlannedAction::CreateRole,
            };
        }

        match self.target.execute(&sql).await {
            Ok(()) => ObjectOutcome::Created,
            Err(e) => ObjectOutcome::failed(Step::Create, e),
        }
    }

    // ===== Phase 2: databases =====

    async fn migrate_databases(&self, results: &mut Vec<DatabaseReport>) -> Result<()> {
        let databases = self
            .source
            .list_databases()
            .await
            .map_err(|e| abort("enumerate source databases", e))?;

        self.reporter.report(MigrationEvent::PhaseStarted {
            phase: Phase::Databases,
            objects: databases.len(),
        });

        if !self.options.dry_run {
            tokio::fs::create_dir_all(&self.dump_dir)
                .await
                .map_err(|e| {
                    abort(
                        &format!("create dump directory {}", self.dump_dir.display()),
                        e,
                    )
                })?;
        }

        for name in &databases {
            self.reporter.report(MigrationEvent::DatabaseStarted {
                name: name.clone(),
            });

            let mut result = DatabaseReport {
                name: name.clone(),
                owner: None,
                replaced: false,
                outcome: ObjectOutcome::Created,
            };
            if let Err((step, e)) = self.migrate_database(name, &mut result).await {
                result.outcome = ObjectOutcome::failed(step, e);
            }

            self.reporter
                .report(MigrationEvent::DatabaseFinished(result.clone()));
            results.push(result);
        }
        Ok(())
    }

    async fn migrate_database(
        &self,
        name: &str,
        result: &mut DatabaseReport,
    ) -> std::result::Result<(), StepError> {
        result.owner = self
            .source
            .database_owner(name)
            .await
            .map_err(|e| (Step::ResolveOwner, e))?;
        debug!(
            "Owner of {}: {}",
            name,
            result.owner.as_deref().unwrap_or("-")
        );

        let exists = self
            .target
            .database_exists(name)
            .await
            .map_err(|e| (Step::CheckExists, e))?;

        if self.options.dry_run {
            result.replaced = exists;
            result.outcome = ObjectOutcome::Planned {
                action: if exists {
                    PlannedAction::ReplaceDatabase
                } else {
                    PlannedAction::CreateDatabase
                },
            };
            return Ok(());
        }

        if exists {
            warn!("Database {} exists on destination, dropping it", name);
            let sql = ddl::drop_database_sql(name).map_err(|e| (Step::Drop, e))?;
            self.target
                .execute(&sql)
                .await
                .map_err(|e| (Step::Drop, e))?;
            result.replaced = true;
        }

        let sql = ddl::create_database_sql(name, result.owner.as_deref())
            .map_err(|e| (Step::Create, e))?;
        self.target
            .execute(&sql)
            .await
            .map_err(|e| (Step::Create, e))?;
        info!("Created database {}", name);

        let path = self.dump_path(name);
        let transferred = self.transfer(name, &path).await;
        self.remove_dump(&path).await;
        transferred
    }

    async fn transfer(&self, name: &str, path: &Path) -> std::result::Result<(), StepError> {
        self.tools
            .dump(name, path)
            .await
            .map_err(|e| (Step::Dump, e))?;
        self.tools
            .restore(name, path)
            .await
            .map_err(|e| (Step::Restore, e))
    }

    fn dump_path(&self, database: &str) -> PathBuf {
        self.dump_dir.join(dump_file_name(database))
    }

    async fn remove_dump(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed dump file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => self.reporter.report(MigrationEvent::Warning(format!(
                "Failed to remove dump file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn abort(action: &str, err: impl std::fmt::Display) -> MigrateError {
    MigrateError::Aborted(format!("cannot {}: {}", action, err))
}

#[cfg(test)]
mod tests;

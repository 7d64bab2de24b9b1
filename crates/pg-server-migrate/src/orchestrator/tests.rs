use super::*;
use crate::report::{MemoryReporter, RunStatus};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Ordered record of every call made against the fakes.
#[derive(Default)]
struct CallLog(Mutex<Vec<String>>);

impl CallLog {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn position(&self, entry: &str) -> usize {
        self.entries()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("no call {:?} in {:?}", entry, self.entries()))
    }
}

#[derive(Default)]
struct FakeSource {
    log: Arc<CallLog>,
    roles: Vec<Role>,
    credentials: HashMap<String, PasswordHash>,
    databases: Vec<String>,
    owners: HashMap<String, String>,
    fail_roles: bool,
    fail_databases: bool,
    fail_owner: HashSet<String>,
    closed: AtomicBool,
}

#[async_trait]
impl SourceCatalog for FakeSource {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.log.push("list_roles");
        if self.fail_roles {
            return Err(MigrateError::Catalog("permission denied for pg_authid".into()));
        }
        Ok(self.roles.clone())
    }

    async fn role_credentials(&self) -> Result<HashMap<String, PasswordHash>> {
        Ok(self.credentials.clone())
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        self.log.push("list_databases");
        if self.fail_databases {
            return Err(MigrateError::Catalog("connection reset".into()));
        }
        Ok(self.databases.clone())
    }

    async fn database_owner(&self, database: &str) -> Result<Option<String>> {
        self.log.push(format!("owner:{}", database));
        if self.fail_owner.contains(database) {
            return Err(MigrateError::Catalog(format!("database {} vanished", database)));
        }
        Ok(self.owners.get(database).cloned())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Destination that tracks roles and databases created by executed DDL.
#[derive(Default)]
struct FakeTarget {
    log: Arc<CallLog>,
    roles: Mutex<HashSet<String>>,
    databases: Mutex<HashSet<String>>,
    statements: Mutex<Vec<String>>,
    /// Statements containing any of these fragments fail.
    reject: Vec<String>,
    fail_role_lookup: HashSet<String>,
    closed: AtomicBool,
}

impl FakeTarget {
    fn with_roles(self, names: &[&str]) -> Self {
        self.roles
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    fn with_databases(self, names: &[&str]) -> Self {
        self.databases
            .lock()
            .unwrap()
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

/// First double-quoted identifier in a statement.
fn quoted_name(sql: &str) -> String {
    sql.split('"').nth(1).unwrap_or_default().to_string()
}

#[async_trait]
impl TargetServer for FakeTarget {
    async fn role_exists(&self, name: &str) -> Result<bool> {
        self.log.push(format!("role_exists:{}", name));
        if self.fail_role_lookup.contains(name) {
            return Err(MigrateError::Catalog("lookup failed".into()));
        }
        Ok(self.roles.lock().unwrap().contains(name))
    }

    async fn database_exists(&self, name: &str) -> Result<bool> {
        self.log.push(format!("database_exists:{}", name));
        Ok(self.databases.lock().unwrap().contains(name))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.log.push(format!("execute:{}", sql));
        if self.reject.iter().any(|r| sql.contains(r.as_str())) {
            return Err(MigrateError::Catalog(format!("rejected: {}", sql)));
        }
        self.statements.lock().unwrap().push(sql.to_string());

        let name = quoted_name(sql);
        if sql.starts_with("CREATE ROLE") {
            self.roles.lock().unwrap().insert(name);
        } else if sql.starts_with("CREATE DATABASE") {
            self.databases.lock().unwrap().insert(name);
        } else if sql.starts_with("DROP DATABASE") {
            self.databases.lock().unwrap().remove(&name);
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeTools {
    log: Arc<CallLog>,
    fail_dump: HashSet<String>,
    fail_restore: HashSet<String>,
    /// Stage a directory instead of a file so removal fails.
    stage_directory: bool,
    seen_paths: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl DumpRestore for FakeTools {
    async fn dump(&self, database: &str, path: &Path) -> Result<()> {
        self.log.push(format!("dump:{}", database));
        self.seen_paths.lock().unwrap().push(path.to_path_buf());
        if self.stage_directory {
            std::fs::create_dir(path)?;
        } else {
            std::fs::write(path, b"PGDMP")?;
        }
        if self.fail_dump.contains(database) {
            return Err(MigrateError::dump(database, "pg_dump exited with exit status: 1"));
        }
        Ok(())
    }

    async fn restore(&self, database: &str, path: &Path) -> Result<()> {
        self.log.push(format!("restore:{}", database));
        assert!(path.exists(), "restore called without a dump file");
        if self.fail_restore.contains(database) {
            return Err(MigrateError::restore(database, "pg_restore exited with exit status: 1"));
        }
        Ok(())
    }
}

struct Harness {
    source: Arc<FakeSource>,
    target: Arc<FakeTarget>,
    tools: Arc<FakeTools>,
    reporter: Arc<MemoryReporter>,
    dump_dir: tempfile::TempDir,
    log: Arc<CallLog>,
}

impl Harness {
    fn new(source: FakeSource, target: FakeTarget, tools: FakeTools) -> Self {
        let log = Arc::new(CallLog::default());
        Self {
            source: Arc::new(FakeSource {
                log: log.clone(),
                ..source
            }),
            target: Arc::new(FakeTarget {
                log: log.clone(),
                ..target
            }),
            tools: Arc::new(FakeTools {
                log: log.clone(),
                ..tools
            }),
            reporter: Arc::new(MemoryReporter::new()),
            dump_dir: tempfile::tempdir().unwrap(),
            log,
        }
    }

    fn staging_dir(&self) -> PathBuf {
        self.dump_dir.path().join("pg_migration")
    }

    fn orchestrator(&self, options: RunOptions) -> Orchestrator {
        Orchestrator::from_parts(
            self.staging_dir(),
            self.source.clone(),
            self.target.clone(),
            self.tools.clone(),
        )
        .with_reporter(self.reporter.clone())
        .with_options(options)
    }

    async fn run(&self) -> MigrationReport {
        self.orchestrator(RunOptions::default()).run().await
    }
}

fn source_with(roles: &[&str], databases: &[(&str, &str)]) -> FakeSource {
    FakeSource {
        roles: roles.iter().map(|r| Role::new(*r)).collect(),
        databases: databases.iter().map(|(d, _)| d.to_string()).collect(),
        owners: databases
            .iter()
            .map(|(d, o)| (d.to_string(), o.to_string()))
            .collect(),
        ..FakeSource::default()
    }
}

fn outcome_of<'a>(report: &'a MigrationReport, database: &str) -> &'a ObjectOutcome {
    &report
        .databases
        .iter()
        .find(|d| d.name == database)
        .unwrap()
        .outcome
}

// ===== Roles =====

#[tokio::test]
async fn test_roles_created_with_credentials() {
    let mut source = source_with(&["app", "reader"], &[]);
    source
        .credentials
        .insert("app".into(), PasswordHash::new("SCRAM-SHA-256$4096:abc"));
    let h = Harness::new(source, FakeTarget::default(), FakeTools::default());

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.roles_created(), 2);
    let statements = h.target.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with("CREATE ROLE \"app\" WITH"));
    assert!(statements[0].contains("PASSWORD 'SCRAM-SHA-256$4096:abc'"));
    assert!(statements[1].starts_with("CREATE ROLE \"reader\" WITH"));
    assert!(!statements[1].contains("PASSWORD"));
}

#[tokio::test]
async fn test_existing_role_is_skipped_not_altered() {
    let h = Harness::new(
        source_with(&["app", "reader"], &[]),
        FakeTarget::default().with_roles(&["app"]),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(report.roles_skipped(), 1);
    assert_eq!(report.roles_created(), 1);
    assert!(matches!(report.roles[0].outcome, ObjectOutcome::Skipped { .. }));
    let statements = h.target.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].contains("\"reader\""));
}

#[tokio::test]
async fn test_role_phase_is_idempotent() {
    let h = Harness::new(
        source_with(&["app", "reader"], &[]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let first = h.run().await;
    assert_eq!(first.roles_created(), 2);
    let after_first = h.target.statements().len();

    let second = h.run().await;
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.roles_skipped(), 2);
    assert_eq!(second.roles_created(), 0);
    assert_eq!(h.target.statements().len(), after_first);

    let skip_notices = h
        .reporter
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                MigrationEvent::RoleFinished(RoleReport {
                    outcome: ObjectOutcome::Skipped { .. },
                    ..
                })
            )
        })
        .count();
    assert_eq!(skip_notices, 2);
}

#[tokio::test]
async fn test_role_failure_does_not_stop_phase() {
    let h = Harness::new(
        source_with(&["a", "b", "c"], &[]),
        FakeTarget {
            reject: vec!["ROLE \"b\"".into()],
            ..FakeTarget::default()
        },
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::CompletedWithFailures);
    assert_eq!(report.roles_created(), 2);
    assert_eq!(report.roles_failed(), 1);
    assert!(matches!(
        report.roles[1].outcome,
        ObjectOutcome::Failed {
            step: Step::Create,
            ..
        }
    ));
    assert_eq!(report.failed_objects(), vec!["role b"]);
}

#[tokio::test]
async fn test_role_existence_check_failure_is_per_role() {
    let h = Harness::new(
        source_with(&["a", "b"], &[]),
        FakeTarget {
            fail_role_lookup: ["a".to_string()].into_iter().collect(),
            ..FakeTarget::default()
        },
        FakeTools::default(),
    );

    let report = h.run().await;

    assert!(matches!(
        report.roles[0].outcome,
        ObjectOutcome::Failed {
            step: Step::CheckExists,
            ..
        }
    ));
    assert_eq!(report.roles[1].outcome, ObjectOutcome::Created);
}

#[tokio::test]
async fn test_role_enumeration_failure_aborts_run() {
    let h = Harness::new(
        FakeSource {
            fail_roles: true,
            ..source_with(&[], &[("orders", "app")])
        },
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::Aborted);
    assert!(report.error.as_deref().unwrap().contains("enumerate source roles"));
    assert!(report.databases.is_empty());
    assert!(!h.log.entries().contains(&"list_databases".to_string()));
    assert!(h.source.closed.load(Ordering::SeqCst));
    assert!(h.target.closed.load(Ordering::SeqCst));
}

// ===== Databases =====

#[tokio::test]
async fn test_roles_complete_before_databases_start() {
    let h = Harness::new(
        source_with(&["app", "zeta"], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::Completed);
    let last_role = h.log.position("role_exists:zeta");
    let first_database = h.log.position("list_databases");
    assert!(last_role < first_database);
    assert!(
        h.log.position("execute:CREATE ROLE \"app\" WITH NOSUPERUSER INHERIT NOCREATEROLE NOCREATEDB NOLOGIN NOREPLICATION")
            < h.log.position("execute:CREATE DATABASE \"orders\" OWNER \"app\"")
    );
}

#[tokio::test]
async fn test_database_attempted_when_owner_role_failed() {
    let h = Harness::new(
        source_with(&["app"], &[("orders", "app")]),
        FakeTarget {
            reject: vec!["CREATE ROLE".into()],
            ..FakeTarget::default()
        },
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(report.roles_failed(), 1);
    assert!(h.log.entries().contains(&"owner:orders".to_string()));
    assert_eq!(report.databases.len(), 1);
}

#[tokio::test]
async fn test_new_database_statement_sequence() {
    let h = Harness::new(
        source_with(&[], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(h.target.statements(), vec!["CREATE DATABASE \"orders\" OWNER \"app\""]);
    let db = &report.databases[0];
    assert_eq!(db.outcome, ObjectOutcome::Created);
    assert_eq!(db.owner.as_deref(), Some("app"));
    assert!(!db.replaced);
    assert_eq!(report.databases_migrated(), 1);
}

#[tokio::test]
async fn test_existing_database_is_dropped_then_recreated() {
    let h = Harness::new(
        source_with(&[], &[("orders", "app")]),
        FakeTarget::default().with_databases(&["orders"]),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(
        h.target.statements(),
        vec![
            "DROP DATABASE IF EXISTS \"orders\"",
            "CREATE DATABASE \"orders\" OWNER \"app\""
        ]
    );
    assert!(report.databases[0].replaced);
    assert_eq!(
        h.log.entries()[h.log.position("execute:CREATE DATABASE \"orders\" OWNER \"app\"") + 1..],
        ["dump:orders", "restore:orders"]
    );
}

#[tokio::test]
async fn test_database_without_owner_has_no_owner_clause() {
    let h = Harness::new(
        FakeSource {
            databases: vec!["scratch".into()],
            ..FakeSource::default()
        },
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(h.target.statements(), vec!["CREATE DATABASE \"scratch\""]);
    assert_eq!(report.databases[0].owner, None);
}

#[tokio::test]
async fn test_dump_failure_is_isolated_to_database() {
    let h = Harness::new(
        source_with(&[], &[("a", "app"), ("b", "app")]),
        FakeTarget::default(),
        FakeTools {
            fail_dump: ["a".to_string()].into_iter().collect(),
            ..FakeTools::default()
        },
    );

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::CompletedWithFailures);
    assert!(matches!(
        outcome_of(&report, "a"),
        ObjectOutcome::Failed {
            step: Step::Dump,
            ..
        }
    ));
    assert_eq!(outcome_of(&report, "b"), &ObjectOutcome::Created);

    let log = h.log.entries();
    assert!(!log.contains(&"restore:a".to_string()));
    assert!(log.contains(&"dump:b".to_string()));
    assert!(log.contains(&"restore:b".to_string()));
    assert_eq!(report.failed_objects(), vec!["database a"]);
}

#[tokio::test]
async fn test_restore_failure_is_isolated_to_database() {
    let h = Harness::new(
        source_with(&[], &[("a", "app"), ("b", "app")]),
        FakeTarget::default(),
        FakeTools {
            fail_restore: ["b".to_string()].into_iter().collect(),
            ..FakeTools::default()
        },
    );

    let report = h.run().await;

    assert_eq!(outcome_of(&report, "a"), &ObjectOutcome::Created);
    match outcome_of(&report, "b") {
        ObjectOutcome::Failed { step, reason } => {
            assert_eq!(*step, Step::Restore);
            assert!(reason.contains("pg_restore exited"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_owner_lookup_failure_is_per_database() {
    let h = Harness::new(
        FakeSource {
            fail_owner: ["a".to_string()].into_iter().collect(),
            ..source_with(&[], &[("a", "app"), ("b", "app")])
        },
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert!(matches!(
        outcome_of(&report, "a"),
        ObjectOutcome::Failed {
            step: Step::ResolveOwner,
            ..
        }
    ));
    assert_eq!(outcome_of(&report, "b"), &ObjectOutcome::Created);
    assert!(!h.log.entries().contains(&"database_exists:a".to_string()));
}

#[tokio::test]
async fn test_create_failure_skips_dump() {
    let h = Harness::new(
        source_with(&[], &[("orders", "app")]),
        FakeTarget {
            reject: vec!["CREATE DATABASE".into()],
            ..FakeTarget::default()
        },
        FakeTools::default(),
    );

    let report = h.run().await;

    assert!(matches!(
        outcome_of(&report, "orders"),
        ObjectOutcome::Failed {
            step: Step::Create,
            ..
        }
    ));
    assert!(!h.log.entries().iter().any(|e| e.starts_with("dump:")));
}

#[tokio::test]
async fn test_database_enumeration_failure_aborts_after_roles() {
    let h = Harness::new(
        FakeSource {
            fail_databases: true,
            ..source_with(&["app"], &[])
        },
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.roles_created(), 1);
    assert!(report.error.as_deref().unwrap().contains("enumerate source databases"));
    assert!(h.source.closed.load(Ordering::SeqCst));
    assert!(h.target.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_dump_directory_failure_aborts() {
    let h = Harness::new(
        source_with(&[], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );
    let blocker = h.dump_dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let report = Orchestrator::from_parts(
        blocker.join("pg_migration"),
        h.source.clone(),
        h.target.clone(),
        h.tools.clone(),
    )
    .with_reporter(h.reporter.clone())
    .run()
    .await;

    assert_eq!(report.status, RunStatus::Aborted);
    assert!(report.error.as_deref().unwrap().contains("create dump directory"));
    assert!(h.target.statements().is_empty());
}

#[tokio::test]
async fn test_dump_files_are_removed() {
    let h = Harness::new(
        source_with(&[], &[("a", "app"), ("b", "app")]),
        FakeTarget::default(),
        FakeTools {
            fail_restore: ["b".to_string()].into_iter().collect(),
            ..FakeTools::default()
        },
    );

    h.run().await;

    let paths = h.tools.seen_paths.lock().unwrap().clone();
    assert_eq!(
        paths,
        vec![h.staging_dir().join("a.dump"), h.staging_dir().join("b.dump")]
    );
    assert!(h.staging_dir().is_dir());
    for path in paths {
        assert!(!path.exists(), "{} left behind", path.display());
    }
}

#[tokio::test]
async fn test_dump_paths_stay_inside_dump_dir() {
    let h = Harness::new(
        source_with(&[], &[("team/app", "app"), ("/abs", "app"), ("..", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    for name in ["team/app", "/abs", ".."] {
        assert_eq!(outcome_of(&report, name), &ObjectOutcome::Created, "{}", name);
    }
    let paths = h.tools.seen_paths.lock().unwrap().clone();
    assert_eq!(paths.len(), 3);
    let staging = h.staging_dir();
    for path in &paths {
        assert_eq!(path.parent(), Some(staging.as_path()), "{}", path.display());
        assert!(!path.exists(), "{} left behind", path.display());
    }
    assert_eq!(paths[0], staging.join("team%2Fapp.dump"));
    assert_eq!(paths[1], staging.join("%2Fabs.dump"));
}

#[tokio::test]
async fn test_cleanup_failure_is_only_a_warning() {
    let h = Harness::new(
        source_with(&[], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools {
            stage_directory: true,
            ..FakeTools::default()
        },
    );

    let report = h.run().await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(outcome_of(&report, "orders"), &ObjectOutcome::Created);
    let warnings: Vec<String> = h
        .reporter
        .events()
        .into_iter()
        .filter_map(|e| match e {
            MigrationEvent::Warning(message) => Some(message),
            _ => None,
        })
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("orders.dump"));
}

// ===== Options and events =====

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let h = Harness::new(
        source_with(&["app", "legacy"], &[("orders", "app"), ("new", "app")]),
        FakeTarget::default()
            .with_roles(&["legacy"])
            .with_databases(&["orders"]),
        FakeTools::default(),
    );

    let report = h
        .orchestrator(RunOptions {
            dry_run: true,
            ..RunOptions::default()
        })
        .run()
        .await;

    assert!(report.dry_run);
    assert_eq!(report.status, RunStatus::Completed);
    assert!(h.target.statements().is_empty());
    assert!(!h.log.entries().iter().any(|e| e.starts_with("dump:")));
    assert!(!h.staging_dir().exists());

    assert_eq!(
        report.roles[0].outcome,
        ObjectOutcome::Planned {
            action: PlannedAction::CreateRole
        }
    );
    assert_eq!(
        report.roles[1].outcome,
        ObjectOutcome::Planned {
            action: PlannedAction::SkipExistingRole
        }
    );
    assert_eq!(
        outcome_of(&report, "orders"),
        &ObjectOutcome::Planned {
            action: PlannedAction::ReplaceDatabase
        }
    );
    assert_eq!(
        outcome_of(&report, "new"),
        &ObjectOutcome::Planned {
            action: PlannedAction::CreateDatabase
        }
    );
}

#[tokio::test]
async fn test_skip_roles_runs_databases_only() {
    let h = Harness::new(
        source_with(&["app"], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h
        .orchestrator(RunOptions {
            skip_roles: true,
            ..RunOptions::default()
        })
        .run()
        .await;

    assert!(report.roles.is_empty());
    assert_eq!(report.databases_migrated(), 1);
    assert!(!h.log.entries().contains(&"list_roles".to_string()));
}

#[tokio::test]
async fn test_skip_databases_runs_roles_only() {
    let h = Harness::new(
        source_with(&["app"], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h
        .orchestrator(RunOptions {
            skip_databases: true,
            ..RunOptions::default()
        })
        .run()
        .await;

    assert_eq!(report.roles_created(), 1);
    assert!(report.databases.is_empty());
    assert!(!h.log.entries().contains(&"list_databases".to_string()));
}

#[tokio::test]
async fn test_events_follow_processing_order() {
    let h = Harness::new(
        source_with(&["app"], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    let report = h.run().await;

    let events = h.reporter.events();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            MigrationEvent::PhaseStarted { .. } => "phase",
            MigrationEvent::DatabaseStarted { .. } => "database_started",
            MigrationEvent::RoleFinished(_) => "role",
            MigrationEvent::DatabaseFinished(_) => "database",
            MigrationEvent::Warning(_) => "warning",
            MigrationEvent::RunFinished(_) => "finished",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["phase", "role", "phase", "database_started", "database", "finished"]
    );
    match events.last() {
        Some(MigrationEvent::RunFinished(finished)) => {
            assert_eq!(finished.run_id, report.run_id);
            assert_eq!(finished.status, RunStatus::Completed);
        }
        other => panic!("unexpected final event: {:?}", other),
    }
}

#[tokio::test]
async fn test_connections_closed_after_successful_run() {
    let h = Harness::new(
        source_with(&["app"], &[("orders", "app")]),
        FakeTarget::default(),
        FakeTools::default(),
    );

    h.run().await;

    assert!(h.source.closed.load(Ordering::SeqCst));
    assert!(h.target.closed.load(Ordering::SeqCst));
}

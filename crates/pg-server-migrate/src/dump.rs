//! pg_dump / pg_restore invocation.
//!
//! Both tools receive the password through `PGPASSWORD` so it never appears in
//! the process list. Standard output and standard error are captured and
//! returned as one diagnostic string.

use crate::config::{Config, ServerConfig};
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

/// Trait for the external dump/restore primitive.
#[async_trait]
pub trait DumpRestore: Send + Sync {
    /// Export a source database (schema, data, large objects) to an archive file.
    async fn dump(&self, database: &str, path: &Path) -> Result<()>;

    /// Import an archive into an existing, empty destination database.
    async fn restore(&self, database: &str, path: &Path) -> Result<()>;
}

/// Runs the PostgreSQL client tools against the configured servers.
pub struct PgDumpRestore {
    source: ServerConfig,
    target: ServerConfig,
    pg_dump_path: String,
    pg_restore_path: String,
}

impl PgDumpRestore {
    pub fn new(config: &Config) -> Self {
        Self {
            source: config.source.clone(),
            target: config.target.clone(),
            pg_dump_path: config.migration.pg_dump_path.clone(),
            pg_restore_path: config.migration.pg_restore_path.clone(),
        }
    }

    /// Build the pg_dump invocation: custom archive format with large objects.
    pub fn dump_command(&self, database: &str, path: &Path) -> Command {
        let mut cmd = Command::new(&self.pg_dump_path);
        cmd.arg("-h")
            .arg(&self.source.host)
            .arg("-p")
            .arg(self.source.port.to_string())
            .arg("-U")
            .arg(&self.source.user)
            .arg("-F")
            .arg("c")
            .arg("-b")
            .arg("-v")
            .arg("-f")
            .arg(path)
            .arg(database);
        apply_credentials(&mut cmd, &self.source);
        cmd
    }

    /// Build the pg_restore invocation: skip ownership and ACL restoration.
    pub fn restore_command(&self, database: &str, path: &Path) -> Command {
        let mut cmd = Command::new(&self.pg_restore_path);
        cmd.arg("-h")
            .arg(&self.target.host)
            .arg("-p")
            .arg(self.target.port.to_string())
            .arg("-U")
            .arg(&self.target.user)
            .arg("-d")
            .arg(database)
            .arg("-v")
            .arg("--no-owner")
            .arg("--no-acl")
            .arg(path);
        apply_credentials(&mut cmd, &self.target);
        cmd
    }
}

fn apply_credentials(cmd: &mut Command, server: &ServerConfig) {
    cmd.env("PGPASSWORD", &server.password);
    // Unknown modes are rejected by config validation
    if let Ok(mode) = server.ssl() {
        cmd.env("PGSSLMODE", mode.as_libpq());
    }
}

/// File name of a database's dump archive: `<name>.dump` as a single path component.
///
/// `%`, `/`, `\`, NUL and a leading `.` are percent-encoded, so distinct
/// database names never share a file and never escape the dump directory.
pub fn dump_file_name(database: &str) -> String {
    let mut name = String::with_capacity(database.len() + 5);
    for (i, c) in database.chars().enumerate() {
        match c {
            '%' | '/' | '\\' | '\0' => name.push_str(&format!("%{:02X}", c as u32)),
            '.' if i == 0 => name.push_str("%2E"),
            _ => name.push(c),
        }
    }
    name.push_str(".dump");
    name
}

/// Concatenate a finished process's stdout and stderr.
pub fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !text.is_empty() && !stderr.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&stderr);
    text
}

/// Run a tool to completion, returning its combined output or a description of the failure.
async fn run_tool(program: &str, mut cmd: Command) -> std::result::Result<String, String> {
    let output = cmd
        .output()
        .await
        .map_err(|e| format!("failed to execute {}: {}", program, e))?;

    let text = combined_output(&output);
    if output.status.success() {
        Ok(text)
    } else {
        Err(format!("{} exited with {}\n{}", program, output.status, text.trim_end()))
    }
}

#[async_trait]
impl DumpRestore for PgDumpRestore {
    async fn dump(&self, database: &str, path: &Path) -> Result<()> {
        info!("Dumping database: {}", database);
        let output = run_tool(&self.pg_dump_path, self.dump_command(database, path))
            .await
            .map_err(|message| MigrateError::dump(database, message))?;
        debug!("pg_dump output for {}:\n{}", database, output);
        info!("Dumped {} to {}", database, path.display());
        Ok(())
    }

    async fn restore(&self, database: &str, path: &Path) -> Result<()> {
        info!("Restoring database: {}", database);
        let output = run_tool(&self.pg_restore_path, self.restore_command(database, path))
            .await
            .map_err(|message| MigrateError::restore(database, message))?;
        debug!("pg_restore output for {}:\n{}", database, output);
        info!("Restored {}", database);
        Ok(())
    }
}

//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server whose roles and databases are read.
    #[serde(default)]
    pub source: ServerConfig,

    /// Server that receives the roles and databases.
    #[serde(default)]
    pub target: ServerConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Connection settings for one PostgreSQL server.
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host.
    #[serde(default)]
    pub host: String,

    /// Server port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Maintenance database used for catalog queries and DDL (default: "postgres").
    #[serde(default = "default_maintenance_db")]
    pub database: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

// Custom Debug that keeps the password out of logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_pg_port(),
            user: String::new(),
            password: String::new(),
            database: default_maintenance_db(),
            ssl_mode: default_ssl_mode(),
        }
    }
}

impl ServerConfig {
    /// `host:port` label used in log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Directory where per-database dump files are staged.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,

    /// Path or name of the pg_dump executable.
    #[serde(default = "default_pg_dump")]
    pub pg_dump_path: String,

    /// Path or name of the pg_restore executable.
    #[serde(default = "default_pg_restore")]
    pub pg_restore_path: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            dump_dir: default_dump_dir(),
            pg_dump_path: default_pg_dump(),
            pg_restore_path: default_pg_restore(),
        }
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_maintenance_db() -> String {
    "postgres".to_string()
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from("/tmp/pg_migration")
}

fn default_pg_dump() -> String {
    "pg_dump".to_string()
}

fn default_pg_restore() -> String {
    "pg_restore".to_string()
}

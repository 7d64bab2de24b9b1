//! Catalog object types read from the source server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A role (user or group) with its privilege attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name, unique per server.
    pub name: String,

    /// `rolsuper`
    pub superuser: bool,

    /// `rolinherit`
    pub inherit: bool,

    /// `rolcreaterole`
    pub create_role: bool,

    /// `rolcreatedb`
    pub create_db: bool,

    /// `rolcanlogin`
    pub can_login: bool,

    /// `rolreplication`
    pub replication: bool,

    /// Connection limit; `None` means unlimited (`rolconnlimit = -1`).
    pub connection_limit: Option<i32>,

    /// Password expiry exactly as the server renders `rolvaliduntil`; `None` means no expiry.
    pub valid_until: Option<String>,
}

impl Role {
    /// Create a role with PostgreSQL's `CREATE ROLE` defaults (INHERIT, everything else off).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superuser: false,
            inherit: true,
            create_role: false,
            create_db: false,
            can_login: false,
            replication: false,
            connection_limit: None,
            valid_until: None,
        }
    }

    /// Convert the catalog's `-1` sentinel into an optional limit.
    pub fn limit_from_catalog(rolconnlimit: i32) -> Option<i32> {
        if rolconnlimit == -1 {
            None
        } else {
            Some(rolconnlimit)
        }
    }
}

/// Pre-hashed password copied verbatim from `pg_authid.rolpassword`.
///
/// `Debug` never prints the hash.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

/// Roles that ship with every server and are never migrated.
pub const BUILTIN_ROLES: &[&str] = &[
    "postgres",
    "pg_monitor",
    "pg_read_all_settings",
    "pg_read_all_stats",
    "pg_stat_scan_tables",
    "pg_read_server_files",
    "pg_write_server_files",
    "pg_execute_server_program",
    "pg_signal_backend",
];

/// Prefix reserved for predefined roles.
pub const RESERVED_ROLE_PREFIX: &str = "pg_";

/// Databases that are never migrated (besides anything flagged as a template).
pub const SYSTEM_DATABASES: &[&str] = &["postgres", "template0", "template1"];

/// Whether a role name is excluded from migration.
pub fn is_system_role(name: &str) -> bool {
    BUILTIN_ROLES.contains(&name) || name.starts_with(RESERVED_ROLE_PREFIX)
}

/// Whether a database is excluded from migration.
pub fn is_system_database(name: &str, is_template: bool) -> bool {
    is_template || SYSTEM_DATABASES.contains(&name)
}

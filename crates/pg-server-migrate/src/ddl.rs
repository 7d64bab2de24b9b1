//! DDL generation for roles and databases.
//!
//! Identifiers are double-quoted so mixed-case and punctuation-bearing names
//! survive the trip. Literals (password hashes, expiry timestamps) are
//! single-quoted with embedded quotes doubled.
//!
//! # Limitation
//!
//! Statements are built by interpolation, not parameter binding: `CREATE ROLE`
//! and `CREATE DATABASE` do not accept bind parameters. Inputs come from the
//! catalogs of servers under the operator's control and are not treated as
//! hostile.

use crate::error::{MigrateError, Result};
use crate::source::{PasswordHash, Role};

/// Quote a PostgreSQL identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
///
/// ```
/// use pg_server_migrate::ddl::quote_ident;
/// assert_eq!(quote_ident("users").unwrap(), "\"users\"");
/// assert_eq!(quote_ident("App\"Owner").unwrap(), "\"App\"\"Owner\"");
/// ```
pub fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(MigrateError::Config("Identifier cannot be empty".to_string()));
    }
    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains a null byte: {:?}",
            name
        )));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quote a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn flag(enabled: bool, positive: &'static str, negative: &'static str) -> &'static str {
    if enabled {
        positive
    } else {
        negative
    }
}

/// Build the `CREATE ROLE` statement for a role.
///
/// Every capability flag is spelled out in its positive or negated form.
/// `CONNECTION LIMIT`, `PASSWORD` and `VALID UNTIL` appear only when set.
pub fn create_role_sql(role: &Role, password: Option<&PasswordHash>) -> Result<String> {
    let mut options = vec![
        flag(role.superuser, "SUPERUSER", "NOSUPERUSER").to_string(),
        flag(role.inherit, "INHERIT", "NOINHERIT").to_string(),
        flag(role.create_role, "CREATEROLE", "NOCREATEROLE").to_string(),
        flag(role.create_db, "CREATEDB", "NOCREATEDB").to_string(),
        flag(role.can_login, "LOGIN", "NOLOGIN").to_string(),
        flag(role.replication, "REPLICATION", "NOREPLICATION").to_string(),
    ];

    if let Some(limit) = role.connection_limit {
        options.push(format!("CONNECTION LIMIT {}", limit));
    }

    if let Some(hash) = password {
        options.push(format!("PASSWORD {}", quote_literal(hash.as_str())));
    }

    if let Some(ref valid_until) = role.valid_until {
        options.push(format!("VALID UNTIL {}", quote_literal(valid_until)));
    }

    Ok(format!(
        "CREATE ROLE {} WITH {}",
        quote_ident(&role.name)?,
        options.join(" ")
    ))
}

/// Build the `CREATE DATABASE` statement, with an `OWNER` clause when an owner is given.
pub fn create_database_sql(name: &str, owner: Option<&str>) -> Result<String> {
    let mut sql = format!("CREATE DATABASE {}", quote_ident(name)?);
    if let Some(owner) = owner {
        sql.push_str(&format!(" OWNER {}", quote_ident(owner)?));
    }
    Ok(sql)
}

/// Build the `DROP DATABASE IF EXISTS` statement.
pub fn drop_database_sql(name: &str) -> Result<String> {
    Ok(format!("DROP DATABASE IF EXISTS {}", quote_ident(name)?))
}

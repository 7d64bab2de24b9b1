//! Catalog reader for the source server.

mod types;

pub use types::*;

use crate::config::ServerConfig;
use crate::error::{MigrateError, Result};
use crate::pool;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use tracing::{debug, info};

/// Trait for source catalog operations.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Non-system roles ordered by name.
    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Password hashes keyed by role name, for roles that have one.
    async fn role_credentials(&self) -> Result<HashMap<String, PasswordHash>>;

    /// Non-system, non-template database names ordered by name.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// Owning role of a database.
    async fn database_owner(&self, database: &str) -> Result<Option<String>>;

    /// Close the connection.
    async fn close(&self);
}

// The WHERE clauses only narrow what the server sends back. `is_system_role`
// and `is_system_database` are the authoritative filters and run on every row.
const ROLES_QUERY: &str = r#"
    SELECT
        rolname,
        rolsuper,
        rolinherit,
        rolcreaterole,
        rolcreatedb,
        rolcanlogin,
        rolreplication,
        rolconnlimit,
        rolvaliduntil::text
    FROM pg_catalog.pg_roles
    WHERE rolname <> ALL($1)
      AND rolname NOT LIKE 'pg\_%'
    ORDER BY rolname
"#;

const CREDENTIALS_QUERY: &str = r#"
    SELECT rolname, rolpassword
    FROM pg_catalog.pg_authid
    WHERE rolpassword IS NOT NULL
      AND rolname <> ALL($1)
      AND rolname NOT LIKE 'pg\_%'
"#;

const DATABASES_QUERY: &str = r#"
    SELECT datname, datistemplate
    FROM pg_catalog.pg_database
    WHERE datname <> ALL($1)
      AND NOT datistemplate
    ORDER BY datname
"#;

const OWNER_QUERY: &str = r#"
    SELECT pg_catalog.pg_get_userbyid(d.datdba)
    FROM pg_catalog.pg_database d
    WHERE d.datname = $1
"#;

/// PostgreSQL catalog reader over a single pooled connection.
pub struct PgSourceCatalog {
    pool: Pool,
}

impl PgSourceCatalog {
    /// Connect to the source server's maintenance database.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let pool = pool::connect("source", config).await?;
        Ok(Self { pool })
    }

    async fn client(&self, context: &str) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, context))
    }
}

fn string_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn catalog_error(what: &str, err: tokio_postgres::Error) -> MigrateError {
    MigrateError::Catalog(format!("failed to query {}: {}", what, err))
}

#[async_trait]
impl SourceCatalog for PgSourceCatalog {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        let client = self.client("listing source roles").await?;
        let rows = client
            .query(ROLES_QUERY, &[&string_list(BUILTIN_ROLES)])
            .await
            .map_err(|e| catalog_error("roles", e))?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get(0).map_err(|e| catalog_error("roles", e))?;
            let connlimit: i32 = row.try_get(7).map_err(|e| catalog_error("roles", e))?;
            roles.push(Role {
                name,
                superuser: row.try_get(1).map_err(|e| catalog_error("roles", e))?,
                inherit: row.try_get(2).map_err(|e| catalog_error("roles", e))?,
                create_role: row.try_get(3).map_err(|e| catalog_error("roles", e))?,
                create_db: row.try_get(4).map_err(|e| catalog_error("roles", e))?,
                can_login: row.try_get(5).map_err(|e| catalog_error("roles", e))?,
                replication: row.try_get(6).map_err(|e| catalog_error("roles", e))?,
                connection_limit: Role::limit_from_catalog(connlimit),
                valid_until: row.try_get(8).map_err(|e| catalog_error("roles", e))?,
            });
        }

        roles.retain(|r| !is_system_role(&r.name));
        debug!("Read {} roles from source catalog", roles.len());
        Ok(roles)
    }

    async fn role_credentials(&self) -> Result<HashMap<String, PasswordHash>> {
        let client = self.client("reading source credentials").await?;
        let rows = client
            .query(CREDENTIALS_QUERY, &[&string_list(BUILTIN_ROLES)])
            .await
            .map_err(|e| catalog_error("role passwords", e))?;

        let mut credentials = HashMap::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get(0)
                .map_err(|e| catalog_error("role passwords", e))?;
            let hash: String = row
                .try_get(1)
                .map_err(|e| catalog_error("role passwords", e))?;
            if !is_system_role(&name) {
                credentials.insert(name, PasswordHash::new(hash));
            }
        }

        debug!("Read {} role credentials from source catalog", credentials.len());
        Ok(credentials)
    }

    async fn list_databases(&self) -> Result<Vec<String>> {
        let client = self.client("listing source databases").await?;
        let rows = client
            .query(DATABASES_QUERY, &[&string_list(SYSTEM_DATABASES)])
            .await
            .map_err(|e| catalog_error("databases", e))?;

        let mut databases = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get(0).map_err(|e| catalog_error("databases", e))?;
            let is_template: bool = row.try_get(1).map_err(|e| catalog_error("databases", e))?;
            if !is_system_database(&name, is_template) {
                databases.push(name);
            }
        }

        debug!("Read {} databases from source catalog", databases.len());
        Ok(databases)
    }

    async fn database_owner(&self, database: &str) -> Result<Option<String>> {
        let client = self.client("resolving database owner").await?;
        let row = client
            .query_opt(OWNER_QUERY, &[&database])
            .await
            .map_err(|e| catalog_error("database owner", e))?
            .ok_or_else(|| {
                MigrateError::Catalog(format!("database {} not found on source", database))
            })?;

        let owner: Option<String> = row
            .try_get(0)
            .map_err(|e| catalog_error("database owner", e))?;
        Ok(owner.filter(|o| !o.is_empty()))
    }

    async fn close(&self) {
        self.pool.close();
        info!("Closed source connection");
    }
}

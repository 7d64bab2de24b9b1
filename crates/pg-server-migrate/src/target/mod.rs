//! Destination server operations: existence checks and DDL application.

use crate::config::ServerConfig;
use crate::error::{MigrateError, Result};
use crate::pool;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, info};

/// Trait for destination server operations.
#[async_trait]
pub trait TargetServer: Send + Sync {
    /// Check if a role exists.
    async fn role_exists(&self, name: &str) -> Result<bool>;

    /// Check if a database exists.
    async fn database_exists(&self, name: &str) -> Result<bool>;

    /// Execute a single DDL statement outside of any transaction block.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Close the connection.
    async fn close(&self);
}

/// PostgreSQL destination over a single pooled connection.
pub struct PgTarget {
    pool: Pool,
}

impl PgTarget {
    /// Connect to the destination server's maintenance database.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let pool = pool::connect("destination", config).await?;
        Ok(Self { pool })
    }

    async fn exists(&self, query: &str, name: &str) -> Result<bool> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "checking object existence"))?;

        let row = client.query_one(query, &[&name]).await?;
        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl TargetServer for PgTarget {
    async fn role_exists(&self, name: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1)",
            name,
        )
        .await
    }

    async fn database_exists(&self, name: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_database WHERE datname = $1)",
            name,
        )
        .await
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e, "executing DDL"))?;

        // Simple query protocol: CREATE/DROP DATABASE refuse to run inside a transaction block
        client.batch_execute(sql).await?;
        debug!("Executed: {}", redact_password(sql));
        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
        info!("Closed destination connection");
    }
}

/// Mask the literal following `PASSWORD` so statements can be logged.
pub fn redact_password(sql: &str) -> String {
    match sql.find(" PASSWORD '") {
        Some(start) => {
            let literal_start = start + " PASSWORD '".len();
            let rest = &sql[literal_start..];
            let mut end = None;
            let mut chars = rest.char_indices().peekable();
            while let Some((i, c)) = chars.next() {
                if c == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                        continue;
                    }
                    end = Some(i);
                    break;
                }
            }
            match end {
                Some(i) => format!(
                    "{} PASSWORD '[REDACTED]'{}",
                    &sql[..start],
                    &rest[i + 1..]
                ),
                None => format!("{} PASSWORD '[REDACTED]'", &sql[..start]),
            }
        }
        None => sql.to_string(),
    }
}

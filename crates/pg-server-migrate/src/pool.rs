//! Connection setup shared by the source and destination sides.

use crate::config::ServerConfig;
use crate::error::{MigrateError, Result};
use crate::tls::TlsBuilder;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tracing::{info, warn};

/// Each side holds exactly one long-lived connection for the whole run.
const CONNECTIONS_PER_SERVER: usize = 1;

/// Open a single-connection pool against a server's maintenance database and verify it.
///
/// `server` is the label used in errors and logs ("source" or "destination").
pub async fn connect(server: &str, config: &ServerConfig) -> Result<Pool> {
    let pg_config = config.pg_config();
    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let tls = TlsBuilder::new(config.ssl()?).build()?;
    let mgr = match tls {
        Some(connector) => Manager::from_config(pg_config, connector, mgr_config),
        None => {
            warn!(
                "{} connection has TLS disabled. Credentials will be transmitted in plaintext.",
                server
            );
            Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
        }
    };

    let pool = Pool::builder(mgr)
        .max_size(CONNECTIONS_PER_SERVER)
        .build()
        .map_err(|e| MigrateError::pool(e, format!("creating {} pool", server)))?;

    // Test connection
    let client = pool
        .get()
        .await
        .map_err(|e| MigrateError::connect(server, e))?;
    client
        .simple_query("SELECT 1")
        .await
        .map_err(|e| MigrateError::connect(server, e))?;

    info!(
        "Connected to {} server {}/{}",
        server,
        config.endpoint(),
        config.database
    );
    Ok(pool)
}

/// Report the server version string of an open pool.
pub async fn server_version(pool: &Pool) -> Result<String> {
    let client = pool
        .get()
        .await
        .map_err(|e| MigrateError::pool(e, "reading server version"))?;
    let row = client.query_one("SELECT version()", &[]).await?;
    Ok(row.try_get(0)?)
}

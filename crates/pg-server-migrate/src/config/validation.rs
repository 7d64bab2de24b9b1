//! Configuration validation.

use super::{Config, ServerConfig};
use crate::error::{MigrateError, Result};
use crate::tls::SslMode;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_server("source", &config.source)?;
    validate_server("target", &config.target)?;

    // Source and target must be distinct servers
    if config.source.host == config.target.host && config.source.port == config.target.port {
        return Err(MigrateError::Config(
            "source and target cannot be the same server".into(),
        ));
    }

    if config.migration.dump_dir.as_os_str().is_empty() {
        return Err(MigrateError::Config("migration.dump_dir is required".into()));
    }
    if config.migration.pg_dump_path.is_empty() {
        return Err(MigrateError::Config(
            "migration.pg_dump_path cannot be empty".into(),
        ));
    }
    if config.migration.pg_restore_path.is_empty() {
        return Err(MigrateError::Config(
            "migration.pg_restore_path cannot be empty".into(),
        ));
    }

    Ok(())
}

fn validate_server(side: &str, server: &ServerConfig) -> Result<()> {
    if server.host.is_empty() {
        return Err(MigrateError::Config(format!("{}.host is required", side)));
    }
    if server.port == 0 {
        return Err(MigrateError::Config(format!(
            "{}.port must be between 1 and 65535",
            side
        )));
    }
    if server.user.is_empty() {
        return Err(MigrateError::Config(format!("{}.user is required", side)));
    }
    if server.password.is_empty() {
        return Err(MigrateError::Config(format!("{}.password is required", side)));
    }
    if server.database.is_empty() {
        return Err(MigrateError::Config(format!(
            "{}.database cannot be empty",
            side
        )));
    }
    SslMode::parse(&server.ssl_mode)?;
    Ok(())
}

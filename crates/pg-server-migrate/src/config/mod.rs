//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use crate::tls::SslMode;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML file without validating it.
    pub fn load_unvalidated<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_unvalidated(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without validating it.
    ///
    /// Used when command-line flags still have to be layered on top.
    pub fn from_yaml_unvalidated(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl ServerConfig {
    /// Parsed SSL mode.
    pub fn ssl(&self) -> Result<SslMode> {
        SslMode::parse(&self.ssl_mode)
    }

    /// Build a tokio-postgres configuration for the maintenance database.
    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&self.host);
        pg_config.port(self.port);
        pg_config.dbname(&self.database);
        pg_config.user(&self.user);
        pg_config.password(&self.password);
        pg_config.application_name("pg-server-migrate");
        // Timestamps read as text (VALID UNTIL) must parse the same on any server.
        pg_config.options("-c DateStyle=ISO");
        pg_config
    }
}

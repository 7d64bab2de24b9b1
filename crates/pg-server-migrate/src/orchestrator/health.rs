//! Connectivity check for both servers.

use crate::config::{Config, ServerConfig};
use crate::error::Result;
use crate::pool;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Result of a health check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_error: Option<String>,

    pub target_connected: bool,
    pub target_latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_error: Option<String>,

    /// Both servers reachable.
    pub healthy: bool,
}

struct ServerStatus {
    latency_ms: u64,
    outcome: Result<String>,
}

async fn check_server(server: &str, config: &ServerConfig) -> ServerStatus {
    let start = Instant::now();
    let outcome = async {
        let pool = pool::connect(server, config).await?;
        let version = pool::server_version(&pool).await;
        pool.close();
        version
    }
    .await;

    ServerStatus {
        latency_ms: start.elapsed().as_millis() as u64,
        outcome,
    }
}

/// Connect to each server, read its version, and disconnect.
///
/// Failures are captured in the result rather than returned, so one
/// unreachable server does not hide the state of the other.
pub async fn health_check(config: &Config) -> HealthCheckResult {
    let source = check_server("source", &config.source).await;
    let target = check_server("destination", &config.target).await;

    let mut result = HealthCheckResult {
        source_latency_ms: source.latency_ms,
        target_latency_ms: target.latency_ms,
        ..HealthCheckResult::default()
    };

    match source.outcome {
        Ok(version) => {
            result.source_connected = true;
            result.source_version = Some(version);
        }
        Err(e) => result.source_error = Some(e.to_string()),
    }
    match target.outcome {
        Ok(version) => {
            result.target_connected = true;
            result.target_version = Some(version);
        }
        Err(e) => result.target_error = Some(e.to_string()),
    }

    result.healthy = result.source_connected && result.target_connected;
    info!(
        "Health check: source {} ({}ms), destination {} ({}ms)",
        if result.source_connected { "OK" } else { "FAILED" },
        result.source_latency_ms,
        if result.target_connected { "OK" } else { "FAILED" },
        result.target_latency_ms
    );
    result
}

//! pg-server-migrate CLI - Role and database migration between PostgreSQL servers.

use clap::{Args, Parser, Subcommand};
use pg_server_migrate::{
    health_check, Config, MigrateError, MigrationReport, Orchestrator, RunOptions, RunStatus,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pg-server-migrate")]
#[command(about = "Migrate roles and databases between PostgreSQL servers")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    servers: ServerArgs,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

/// Connection settings layered over the configuration file.
#[derive(Args, Default)]
struct ServerArgs {
    /// Source server host
    #[arg(long)]
    src_host: Option<String>,

    /// Source server port
    #[arg(long)]
    src_port: Option<u16>,

    /// Source superuser name
    #[arg(long)]
    src_user: Option<String>,

    /// Source superuser password
    #[arg(long, env = "SRC_PASSWORD", hide_env_values = true)]
    src_password: Option<String>,

    /// Destination server host
    #[arg(long)]
    dst_host: Option<String>,

    /// Destination server port
    #[arg(long)]
    dst_port: Option<u16>,

    /// Destination superuser name
    #[arg(long)]
    dst_user: Option<String>,

    /// Destination superuser password
    #[arg(long, env = "DST_PASSWORD", hide_env_values = true)]
    dst_password: Option<String>,

    /// Directory for temporary dump files [default: /tmp/pg_migration]
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

impl ServerArgs {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.src_host {
            config.source.host = host;
        }
        if let Some(port) = self.src_port {
            config.source.port = port;
        }
        if let Some(user) = self.src_user {
            config.source.user = user;
        }
        if let Some(password) = self.src_password {
            config.source.password = password;
        }
        if let Some(host) = self.dst_host {
            config.target.host = host;
        }
        if let Some(port) = self.dst_port {
            config.target.port = port;
        }
        if let Some(user) = self.dst_user {
            config.target.user = user;
        }
        if let Some(password) = self.dst_password {
            config.target.password = password;
        }
        if let Some(dir) = self.dump_dir {
            config.migration.dump_dir = dir;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate roles, then databases
    Run {
        /// Dry run: show what would be created or replaced without changing the destination
        #[arg(long)]
        dry_run: bool,

        /// Skip the role phase
        #[arg(long, conflicts_with = "skip_databases")]
        skip_roles: bool,

        /// Skip the database phase
        #[arg(long)]
        skip_databases: bool,
    },

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    let config = load_config(cli.config.as_deref(), cli.servers)?;

    match cli.command {
        Commands::Run {
            dry_run,
            skip_roles,
            skip_databases,
        } => {
            let options = RunOptions {
                dry_run,
                skip_roles,
                skip_databases,
            };

            let report = Orchestrator::connect(&config)
                .await?
                .with_options(options)
                .run()
                .await;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                print_summary(&report);
            }

            if report.status == RunStatus::Aborted {
                return Err(MigrateError::Aborted(
                    report.error.unwrap_or_else(|| "unknown error".to_string()),
                ));
            }
        }

        Commands::HealthCheck => {
            let result = health_check(&config).await;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                println!(
                    "  Source ({}): {} ({}ms)",
                    config.source.endpoint(),
                    if result.source_connected { "OK" } else { "FAILED" },
                    result.source_latency_ms
                );
                if let Some(ref version) = result.source_version {
                    println!("    Version: {}", version);
                }
                if let Some(ref err) = result.source_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "  Destination ({}): {} ({}ms)",
                    config.target.endpoint(),
                    if result.target_connected { "OK" } else { "FAILED" },
                    result.target_latency_ms
                );
                if let Some(ref version) = result.target_version {
                    println!("    Version: {}", version);
                }
                if let Some(ref err) = result.target_error {
                    println!("    Error: {}", err);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                return Err(MigrateError::connect(
                    if result.source_connected { "destination" } else { "source" },
                    "health check failed",
                ));
            }
        }
    }

    Ok(())
}

/// Build the effective configuration: file (if any), then flags, then validation.
fn load_config(path: Option<&Path>, servers: ServerArgs) -> Result<Config, MigrateError> {
    let mut config = match path {
        Some(path) => {
            let config = Config::load_unvalidated(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };
    servers.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn print_summary(report: &MigrationReport) {
    let status_msg = match (report.dry_run, report.status) {
        (true, RunStatus::Aborted) => "Dry run aborted!",
        (true, _) => "Dry run completed!",
        (false, RunStatus::Completed) => "Migration completed!",
        (false, RunStatus::CompletedWithFailures) => "Migration completed with failures!",
        (false, RunStatus::Aborted) => "Migration aborted!",
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", report.run_id);
    println!("  Duration: {:.2}s", report.duration_seconds);
    println!(
        "  Roles: {} created, {} skipped, {} failed",
        report.roles_created(),
        report.roles_skipped(),
        report.roles_failed()
    );
    println!(
        "  Databases: {}/{} migrated",
        report.databases_migrated(),
        report.databases.len()
    );
    let failed = report.failed_objects();
    if !failed.is_empty() {
        println!("  Failed: {}", failed.join(", "));
    }
    if let Some(ref err) = report.error {
        println!("  Error: {}", err);
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Unknown verbosity: {}", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Unknown log format: {}", other)),
    }

    Ok(())
}

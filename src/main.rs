use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use deskpro_server::config::{AppConfig, Backend, CliConfig, FileConfig};
use deskpro_server::persistence::{Persistence, RemotePersistence, SqlitePersistence};
use deskpro_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database (clinic.db). Not needed when a
    /// remote API URL is configured.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the remote database service. Falls back to the
    /// API_BASE_URL and REMOTE_API_URL environment variables.
    #[clap(long)]
    pub remote_api_url: Option<String>,

    /// Timeout in seconds for remote database requests.
    #[clap(long)]
    pub remote_timeout_sec: Option<u64>,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            remote_api_url: args.remote_api_url.clone(),
            remote_timeout_sec: args.remote_timeout_sec,
        }
    }
}

async fn open_persistence(backend: &Backend) -> Result<Arc<dyn Persistence>> {
    match backend {
        Backend::Sqlite { db_path } => {
            info!("Opening SQLite clinic database at {:?}...", db_path);
            Ok(Arc::new(SqlitePersistence::new(db_path)?))
        }
        Backend::Remote {
            base_url,
            timeout_sec,
        } => {
            info!("Forwarding storage to remote service at {}", base_url);
            let remote = RemotePersistence::new(base_url, *timeout_sec)?;
            if let Err(e) = remote.health_check().await {
                warn!("Remote database service is not healthy yet: {:#}", e);
            }
            Ok(Arc::new(remote))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let app_config = AppConfig::resolve(&CliConfig::from(&cli_args), file_config, |name| {
        std::env::var(name).ok()
    })?;

    let persistence = open_persistence(&app_config.backend).await?;

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level,
        port: app_config.port,
        frontend_dir_path: app_config.frontend_dir_path,
    };

    info!("Ready to serve at port {}!", server_config.port);
    run_server(server_config, persistence, shutdown_signal()).await
}

mod file_config;

pub use file_config::{FileConfig, RemoteConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// Environment variables consulted, in order, for the remote base URL when
/// neither the CLI nor the config file names one.
pub const REMOTE_URL_ENV_VARS: [&str; 2] = ["API_BASE_URL", "REMOTE_API_URL"];

pub const DEFAULT_REMOTE_TIMEOUT_SEC: u64 = 30;

/// CLI arguments that can be used for config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub remote_api_url: Option<String>,
    pub remote_timeout_sec: Option<u64>,
}

/// Where records are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { db_path: PathBuf },
    Remote { base_url: String, timeout_sec: u64 },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub backend: Backend,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, the optional TOML file and
    /// the environment. TOML values override CLI values where present.
    pub fn resolve<E>(cli: &CliConfig, file_config: Option<FileConfig>, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file = file_config.unwrap_or_default();
        let remote = file.remote.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let remote_url = remote
            .api_url
            .or_else(|| cli.remote_api_url.clone())
            .or_else(|| REMOTE_URL_ENV_VARS.iter().find_map(|name| env(*name)))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let backend = match remote_url {
            Some(base_url) => {
                if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                    bail!("Remote API URL must start with http:// or https://: {}", base_url);
                }
                let timeout_sec = remote
                    .timeout_sec
                    .or(cli.remote_timeout_sec)
                    .unwrap_or(DEFAULT_REMOTE_TIMEOUT_SEC);
                if timeout_sec == 0 {
                    bail!("Remote timeout must be at least one second");
                }
                Backend::Remote {
                    base_url,
                    timeout_sec,
                }
            }
            None => {
                let db_dir = file
                    .db_dir
                    .map(PathBuf::from)
                    .or_else(|| cli.db_dir.clone())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "db_dir must be specified via --db-dir or in config file \
                             when no remote API URL is configured"
                        )
                    })?;

                if !db_dir.exists() {
                    bail!("Database directory does not exist: {:?}", db_dir);
                }
                if !db_dir.is_dir() {
                    bail!("db_dir is not a directory: {:?}", db_dir);
                }

                Backend::Sqlite {
                    db_path: db_dir.join("clinic.db"),
                }
            }
        };

        Ok(Self {
            port,
            logging_level,
            frontend_dir_path,
            backend,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

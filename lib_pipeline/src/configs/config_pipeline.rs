use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::model::DatasetScope;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("could not read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw, mergeable configuration: every field optional so that the defaults,
/// the JSON config file and the CLI/environment layer can be merged with
/// clear precedence (later layers override earlier ones).
#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Registry synchronization pipeline for football player statistics", version)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    #[clap(long, env = "PITCH_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "PITCH_API_BASE_URL", help = "Base URL of the football statistics API.")]
    pub api_base_url: Option<String>,

    #[clap(long, env = "PITCH_API_KEY", help = "Static API key for the statistics provider.")]
    pub api_key: Option<String>,

    #[clap(long, env = "PITCH_LEDGER_BASE_URL", help = "Base URL of the ledger gateway service.")]
    pub ledger_base_url: Option<String>,

    #[clap(long, env = "PITCH_LEDGER_API_KEY", help = "Optional bearer token for the ledger gateway.")]
    pub ledger_api_key: Option<String>,

    #[clap(long, env = "PITCH_LEAGUE", help = "External league identifier of the dataset scope.")]
    pub league: Option<u32>,

    #[clap(long, env = "PITCH_SEASON", help = "Season year of the dataset scope.")]
    pub season: Option<u32>,

    #[clap(long, env = "PITCH_REGISTRY_PATH", help = "Path of the persisted registry document.")]
    pub registry_path: Option<PathBuf>,

    #[clap(long, env = "PITCH_PACE_MS", help = "Cooperative delay in milliseconds between external calls.")]
    pub pace_ms: Option<u64>,

    #[clap(long, env = "PITCH_CHECKPOINT_EVERY", help = "Registry checkpoint cadence in processed items.")]
    pub checkpoint_every: Option<usize>,

    #[clap(long, env = "PITCH_REQUEST_TIMEOUT_SECS", help = "Per-request timeout for provider and ledger calls.")]
    pub request_timeout_secs: Option<u64>,

    #[clap(long, env = "PITCH_HTTP_RETRIES", help = "Transient-failure retries performed by the HTTP middleware.")]
    pub http_retries: Option<u32>,

    #[clap(long, env = "PITCH_CONFIRM_POLL_MS", help = "Delay in milliseconds between ledger confirmation polls.")]
    pub confirm_poll_ms: Option<u64>,

    #[clap(long, env = "PITCH_CONFIRM_ATTEMPTS", help = "Maximum ledger confirmation polls before a write times out.")]
    pub confirm_attempts: Option<u32>,

    #[clap(long, env = "PITCH_RECONCILE_CRON", help = "Cron expression for the recurring reconciliation pass.")]
    pub reconcile_cron: Option<String>,

    #[clap(long, env = "PITCH_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "PITCH_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            api_base_url: other.api_base_url.or(self.api_base_url),
            api_key: other.api_key.or(self.api_key),
            ledger_base_url: other.ledger_base_url.or(self.ledger_base_url),
            ledger_api_key: other.ledger_api_key.or(self.ledger_api_key),
            league: other.league.or(self.league),
            season: other.season.or(self.season),
            registry_path: other.registry_path.or(self.registry_path),
            pace_ms: other.pace_ms.or(self.pace_ms),
            checkpoint_every: other.checkpoint_every.or(self.checkpoint_every),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            http_retries: other.http_retries.or(self.http_retries),
            confirm_poll_ms: other.confirm_poll_ms.or(self.confirm_poll_ms),
            confirm_attempts: other.confirm_attempts.or(self.confirm_attempts),
            reconcile_cron: other.reconcile_cron.or(self.reconcile_cron),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    fn defaults() -> Config {
        Config {
            api_base_url: Some("https://v3.football.api-sports.io/".to_string()),
            ledger_base_url: Some("http://127.0.0.1:8900/".to_string()),
            registry_path: Some(default_registry_path()),
            pace_ms: Some(1500),
            checkpoint_every: Some(10),
            request_timeout_secs: Some(20),
            http_retries: Some(3),
            confirm_poll_ms: Some(2000),
            confirm_attempts: Some(30),
            reconcile_cron: Some("0 0 * * * *".to_string()),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Config::default()
        }
    }

    /// Resolves the merged layers into explicit pipeline settings.
    ///
    /// Values with no sensible default (API key, league, season) must be
    /// supplied by one of the layers; everything else falls back.
    pub fn resolve(self) -> Result<PipelineConfig, ConfigError> {
        let defaults = Config::defaults();
        let merged = defaults.merge(self);

        Ok(PipelineConfig {
            api_base_url: merged.api_base_url.ok_or(ConfigError::Missing("api_base_url"))?,
            api_key: merged.api_key.ok_or(ConfigError::Missing("api_key"))?,
            ledger_base_url: merged
                .ledger_base_url
                .ok_or(ConfigError::Missing("ledger_base_url"))?,
            ledger_api_key: merged.ledger_api_key,
            scope: DatasetScope::new(
                merged.league.ok_or(ConfigError::Missing("league"))?,
                merged.season.ok_or(ConfigError::Missing("season"))?,
            ),
            registry_path: merged
                .registry_path
                .ok_or(ConfigError::Missing("registry_path"))?,
            pace: Duration::from_millis(merged.pace_ms.unwrap_or(1500)),
            checkpoint_every: merged.checkpoint_every.unwrap_or(10).max(1),
            request_timeout: Duration::from_secs(merged.request_timeout_secs.unwrap_or(20)),
            http_retries: merged.http_retries.unwrap_or(3),
            confirm_poll: Duration::from_millis(merged.confirm_poll_ms.unwrap_or(2000)),
            confirm_attempts: merged.confirm_attempts.unwrap_or(30).max(1),
            reconcile_cron: merged
                .reconcile_cron
                .unwrap_or_else(|| "0 0 * * * *".to_string()),
            log_dir: merged.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn default_registry_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("pitchledger").join("registry.json"))
        .unwrap_or_else(|| PathBuf::from("./data/registry.json"))
}

/// Loads the layered configuration: defaults, then the optional JSON config
/// file, then CLI flags and environment variables on top.
pub fn load_config() -> Result<Config, ConfigError> {
    layer_config(Config::parse())
}

/// Applies the config-file layer underneath an already-parsed CLI layer.
pub fn layer_config(cli: Config) -> Result<Config, ConfigError> {
    let file_config = match &cli.config_path {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: path.clone(),
                source: e,
            })?;
            serde_json::from_str::<Config>(&raw).map_err(|e| ConfigError::Parse {
                path: path.clone(),
                source: e,
            })?
        }
        None => Config::default(),
    };

    Ok(file_config.merge(cli))
}

/// Explicit, fully resolved pipeline settings. Passed into every
/// orchestrator and engine call; nothing in the pipeline reads ambient
/// configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub ledger_base_url: String,
    pub ledger_api_key: Option<String>,
    pub scope: DatasetScope,
    pub registry_path: PathBuf,
    /// Cooperative delay between successive external calls.
    pub pace: Duration,
    /// Registry checkpoint cadence during long batch operations.
    pub checkpoint_every: usize,
    pub request_timeout: Duration,
    pub http_retries: u32,
    pub confirm_poll: Duration,
    pub confirm_attempts: u32,
    pub reconcile_cron: String,
    pub log_dir: PathBuf,
    pub log_level: String,
}

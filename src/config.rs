// Runtime configuration, layered with figment (highest priority last):
//
//   1. built-in defaults
//   2. ./asset-overview.toml (optional)
//   3. environment variables
//
//   ASSET_OVERVIEW_DB            SQLite catalog store    (asset_overview.db)
//   ASSET_OVERVIEW_ADDR          server bind address     (127.0.0.1:3000)
//   ASSET_OVERVIEW_RECENT_LIMIT  recently visited shown  (10)
//   ASSET_OVERVIEW_LOG           tracing filter directive

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "ASSET_OVERVIEW_";
pub const CONFIG_FILE: &str = "asset-overview.toml";
pub const LOG_ENV: &str = "ASSET_OVERVIEW_LOG";

pub const DEFAULT_DB_PATH: &str = "asset_overview.db";
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "db")]
    pub db_path: PathBuf,
    #[serde(rename = "addr")]
    pub bind_addr: String,
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            bind_addr: DEFAULT_ADDR.to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl Config {
    /// Resolve defaults, the optional config file and `ASSET_OVERVIEW_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::figment()
            .extract()
            .context("Failed to load asset-overview configuration")
    }

    /// The provider chain behind [`Config::from_env`].
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["log"]))
    }
}

/// Install the global tracing subscriber; `ASSET_OVERVIEW_LOG` overrides `default_level`.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

//! Configuration loading for Fanout.
//!
//! Settings come from `~/.fanout/config.toml`:
//!
//! ```toml
//! [pool]
//! limit = 10
//!
//! [log]
//! filter = "fanout_pool=debug"
//! ```
//!
//! `FANOUT_LIMIT` overrides `pool.limit`. A missing or broken file is never
//! fatal; it is reported through `tracing` and defaults apply.

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use fanout_types::ConcurrencyLimit;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the configured concurrency limit.
pub const LIMIT_ENV_VAR: &str = "FANOUT_LIMIT";

/// Limit used when neither the environment nor the config file sets one.
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct FanoutConfig {
    pub pool: Option<PoolConfig>,
    pub log: Option<LogConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PoolConfig {
    /// Values `<= 0` are clamped to 1.
    pub limit: Option<ConcurrencyLimit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl FanoutConfig {
    /// Load the user config. `None` when there is no file or it can't be used.
    pub fn load() -> Option<Self> {
        match Self::try_load() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{err}");
                None
            }
        }
    }

    /// Like [`FanoutConfig::load`], but hands the error back so callers can
    /// report it once logging is up.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn limit(&self) -> Option<ConcurrencyLimit> {
        self.pool.as_ref().and_then(|pool| pool.limit)
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log
            .as_ref()
            .and_then(|log| log.filter.as_deref())
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".fanout").join("config.toml"))
}

/// Resolve the effective limit: environment, then config file, then default.
///
/// An unparsable environment value is reported and skipped.
#[must_use]
pub fn resolve_limit(config: Option<&FanoutConfig>, env_value: Option<&str>) -> ConcurrencyLimit {
    if let Some(raw) = env_value {
        match raw.parse::<ConcurrencyLimit>() {
            Ok(limit) => return limit,
            Err(err) => tracing::warn!("Ignoring {LIMIT_ENV_VAR}: {err}"),
        }
    }

    config
        .and_then(FanoutConfig::limit)
        .unwrap_or_else(|| ConcurrencyLimit::new(DEFAULT_LIMIT))
}

/// [`resolve_limit`] reading `FANOUT_LIMIT` from the process environment.
#[must_use]
pub fn resolve_limit_from_env(config: Option<&FanoutConfig>) -> ConcurrencyLimit {
    let env_value = env::var(LIMIT_ENV_VAR).ok();
    resolve_limit(config, env_value.as_deref())
}

//! Engine configuration loaded from the environment.
//!
//! Follows the platform convention: `SCREENMATCH_`-prefixed variables with
//! common fallbacks, `Default` values for everything optional, and explicit
//! `validate()` checks with clear messages.

use screenmatch_core::config::{parse_env_var, ConfigLoader};
use screenmatch_core::CoreError;
use std::time::Duration;
use url::Url;

/// Metadata provider access configuration.
///
/// # Environment Variables
///
/// - `SCREENMATCH_TMDB_TOKEN` (required): bearer token for the provider API
/// - `SCREENMATCH_TMDB_BASE_URL` (optional): API base URL
/// - `SCREENMATCH_TMDB_TIMEOUT` (optional): request timeout in seconds
///   (default: 30)
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub access_token: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: "https://api.themoviedb.org/3".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ConfigLoader for TmdbConfig {
    fn from_env() -> Result<Self, CoreError> {
        let access_token = std::env::var("SCREENMATCH_TMDB_TOKEN")
            .or_else(|_| std::env::var("TMDB_TOKEN"))
            .map_err(|_| {
                CoreError::configuration(
                    "TMDB_TOKEN or SCREENMATCH_TMDB_TOKEN must be set",
                    Some("SCREENMATCH_TMDB_TOKEN"),
                )
            })?;

        let base_url = std::env::var("SCREENMATCH_TMDB_BASE_URL")
            .unwrap_or_else(|_| TmdbConfig::default().base_url);

        let timeout_secs = parse_env_var("SCREENMATCH_TMDB_TIMEOUT", 30u64)?;

        Ok(Self {
            access_token,
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.access_token.is_empty() {
            return Err(CoreError::configuration(
                "provider access token must not be empty",
                Some("SCREENMATCH_TMDB_TOKEN"),
            ));
        }

        Url::parse(&self.base_url).map_err(|e| {
            CoreError::configuration(
                format!("Invalid TMDB base URL: {}", e),
                Some("SCREENMATCH_TMDB_BASE_URL"),
            )
        })?;

        if self.request_timeout.as_secs() == 0 {
            return Err(CoreError::configuration(
                "request_timeout must be greater than 0 seconds",
                Some("SCREENMATCH_TMDB_TIMEOUT"),
            ));
        }

        Ok(())
    }
}

/// Cache backend and per-class TTL configuration.
///
/// Raw metadata changes rarely, so it outlives aggregated results by far:
/// the ranked view is cheap to rebuild from cached metadata.
///
/// # Environment Variables
///
/// - `SCREENMATCH_REDIS_URL` (optional): Redis URL; without it the engine
///   runs on the in-memory store
/// - `SCREENMATCH_METADATA_TTL` (optional): metadata TTL in seconds
///   (default: 7 days)
/// - `SCREENMATCH_RESULTS_TTL` (optional): aggregated-result TTL in seconds
///   (default: 30 minutes)
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub metadata_ttl: Duration,
    pub results_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            metadata_ttl: Duration::from_secs(7 * 86400),
            results_ttl: Duration::from_secs(1800),
        }
    }
}

impl ConfigLoader for CacheConfig {
    fn from_env() -> Result<Self, CoreError> {
        let redis_url = std::env::var("SCREENMATCH_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .ok();

        let metadata_ttl_secs = parse_env_var("SCREENMATCH_METADATA_TTL", 7 * 86400u64)?;
        let results_ttl_secs = parse_env_var("SCREENMATCH_RESULTS_TTL", 1800u64)?;

        Ok(Self {
            redis_url,
            metadata_ttl: Duration::from_secs(metadata_ttl_secs),
            results_ttl: Duration::from_secs(results_ttl_secs),
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if let Some(url) = &self.redis_url {
            Url::parse(url).map_err(|e| {
                CoreError::configuration(
                    format!("Invalid Redis URL: {}", e),
                    Some("SCREENMATCH_REDIS_URL"),
                )
            })?;
        }

        if self.metadata_ttl.as_secs() == 0 || self.results_ttl.as_secs() == 0 {
            return Err(CoreError::configuration(
                "cache TTLs must be greater than 0 seconds",
                Some("SCREENMATCH_METADATA_TTL"),
            ));
        }

        if self.metadata_ttl < self.results_ttl {
            return Err(CoreError::configuration(
                "metadata TTL must not be shorter than the results TTL",
                Some("SCREENMATCH_METADATA_TTL"),
            ));
        }

        Ok(())
    }
}

/// Upper bound on how many candidates may be chain-expanded per seed.
pub const MAX_EXPANSION_BREADTH: usize = 5;

/// Aggregation knobs.
///
/// # Environment Variables
///
/// - `SCREENMATCH_EXPANSION_ENABLED` (optional): whether to widen the pool
///   by one extra recommendation hop (default: true)
/// - `SCREENMATCH_EXPANSION_BREADTH` (optional): candidates expanded per
///   seed, capped at [`MAX_EXPANSION_BREADTH`] (default: 3)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub expansion_enabled: bool,
    pub expansion_breadth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expansion_enabled: true,
            expansion_breadth: 3,
        }
    }
}

impl ConfigLoader for EngineConfig {
    fn from_env() -> Result<Self, CoreError> {
        let expansion_enabled = parse_env_var("SCREENMATCH_EXPANSION_ENABLED", true)?;
        let expansion_breadth = parse_env_var("SCREENMATCH_EXPANSION_BREADTH", 3usize)?;

        Ok(Self {
            expansion_enabled,
            expansion_breadth,
        })
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.expansion_breadth == 0 || self.expansion_breadth > MAX_EXPANSION_BREADTH {
            return Err(CoreError::configuration(
                format!(
                    "expansion_breadth must be between 1 and {}",
                    MAX_EXPANSION_BREADTH
                ),
                Some("SCREENMATCH_EXPANSION_BREADTH"),
            ));
        }
        Ok(())
    }
}

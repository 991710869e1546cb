//! ScreenMatch Recommendation Engine
//!
//! Aggregates recommendation candidates for one or more seed media items:
//! fetches direct recommendations and similar items from the metadata
//! provider, widens the pool through a bounded one-hop expansion,
//! deduplicates and merges overlapping candidates, scores each candidate
//! against its seed with a weighted multi-signal similarity function, and
//! returns a ranked, filtered, cache-backed result list.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod patterns;
pub mod provider;
pub mod rate_limit;
pub mod scorer;
pub mod tmdb;
pub mod types;

// Re-export main types
pub use aggregator::RecommendationEngine;
pub use cache::{keys, CacheError, CacheStore, MemoryCacheStore, RedisCacheStore};
pub use config::{CacheConfig, EngineConfig, TmdbConfig};
pub use patterns::{classify, PatternSet, ThematicPattern, THEMATIC_PATTERNS};
pub use provider::MetadataProvider;
pub use rate_limit::ProviderRateLimiter;
pub use scorer::{ScoreBreakdown, SimilarityScorer, SimilarityWeights};
pub use tmdb::TmdbClient;
pub use types::{
    CandidateSource, RecommendationFilters, RecommendationOptions, RecommendationResult,
    RecommendedItem, SeedSummary,
};

use screenmatch_core::{CoreError, MediaIdentity};
use std::time::Duration;

/// Common error type for the recommendation engine
#[derive(Debug, thiserror::Error)]
pub enum RecsError {
    #[error("invalid media identity: {0}")]
    InvalidIdentity(String),

    #[error("provider has no record for {0}")]
    NotFound(MediaIdentity),

    #[error("provider rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("normalization failed: {0}")]
    Normalization(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache backend error: {0}")]
    Cache(String),

    #[error("none of the requested seeds could be resolved")]
    NoSeedsResolved,

    #[error(transparent)]
    Config(#[from] CoreError),
}

impl RecsError {
    /// Whether the failed operation can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecsError::RateLimited { .. } | RecsError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RecsError>;

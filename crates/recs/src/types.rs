//! Engine-facing request and result types.

use screenmatch_core::{Genre, Keyword, MediaIdentity, MediaMetadata};
use serde::{Deserialize, Serialize};

/// Which provider list surfaced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Returned by the provider's dedicated recommendation endpoint.
    Direct,
    /// Returned by the provider's content-similarity endpoint.
    Similar,
}

/// One sighting of a candidate identity during gathering: where it came
/// from, which seed it belongs to, and the intermediate item's title when it
/// was found through chain expansion.
#[derive(Debug, Clone)]
pub(crate) struct CandidateOccurrence {
    pub identity: MediaIdentity,
    pub source: CandidateSource,
    pub seed: MediaIdentity,
    pub via_title: Option<String>,
}

/// Caller-tunable knobs for a single recommendation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationOptions {
    /// Bypass cache read and write for this call without invalidating
    /// entries other callers may still want.
    #[serde(default)]
    pub skip_cache: bool,
    #[serde(default)]
    pub filters: RecommendationFilters,
}

/// Post-ranking filters. Applied to the full ranked list before the result
/// cap, so the returned items are the best matches under the filter.
/// A candidate missing the data a filter needs is excluded by that filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationFilters {
    /// Keep only candidates whose certification code is in this list.
    #[serde(default)]
    pub allowed_certifications: Option<Vec<String>>,
    /// Keep only candidates with at least this vote average (0-10 scale).
    #[serde(default)]
    pub min_vote_average: Option<f64>,
    /// Inclusive year range on the candidate's primary date.
    #[serde(default)]
    pub year_range: Option<(i32, i32)>,
    /// Drop candidates carrying any of these genre ids.
    #[serde(default)]
    pub excluded_genre_ids: Option<Vec<i64>>,
}

impl RecommendationFilters {
    pub(crate) fn matches(&self, metadata: &MediaMetadata) -> bool {
        if let Some(allowed) = &self.allowed_certifications {
            match metadata.certification.as_deref() {
                Some(certification) if allowed.iter().any(|a| a == certification) => {}
                _ => return false,
            }
        }
        if let Some(minimum) = self.min_vote_average {
            match metadata.vote_average {
                Some(average) if average >= minimum => {}
                _ => return false,
            }
        }
        if let Some((from, to)) = self.year_range {
            match metadata.release_year() {
                Some(year) if year >= from && year <= to => {}
                _ => return false,
            }
        }
        if let Some(excluded) = &self.excluded_genre_ids {
            if metadata.genres.iter().any(|g| excluded.contains(&g.id)) {
                return false;
            }
        }
        true
    }
}

/// A ranked entry in the final result, enriched with full metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub identity: MediaIdentity,
    pub metadata: MediaMetadata,
    /// Mean of the similarity scores across every path that surfaced this
    /// item.
    pub score: f64,
    /// Number of independent paths (seed x source x expansion hop) that
    /// surfaced this item.
    pub match_count: u32,
    /// Provider lists this item arrived through, in first-seen order.
    pub sources: Vec<CandidateSource>,
    /// Title of the intermediate item that surfaced this candidate during
    /// chain expansion. Absent when a seed's own lists carried it.
    pub via_title: Option<String>,
}

/// Seed display metadata echoed back alongside the ranked list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSummary {
    pub identity: MediaIdentity,
    pub title: String,
    pub genres: Vec<Genre>,
    pub keywords: Vec<Keyword>,
}

impl SeedSummary {
    pub(crate) fn from_metadata(metadata: &MediaMetadata) -> Self {
        Self {
            identity: metadata.identity,
            title: metadata.title.clone(),
            genres: metadata.genres.clone(),
            keywords: metadata.keywords.clone(),
        }
    }
}

/// Final result of an aggregation call.
///
/// Invariants: no two items share an identity, no item's identity equals a
/// seed's, and items are ordered by score descending with ties broken by
/// higher match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Summary of the first resolved seed, for display.
    pub source: SeedSummary,
    pub items: Vec<RecommendedItem>,
}

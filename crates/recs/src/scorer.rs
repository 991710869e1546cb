//! Multi-signal similarity scoring between a seed item and a candidate.
//!
//! The score is a weighted sum over signal components, normalized by the
//! weights that actually applied: a component whose data is missing on
//! either side drops out of the denominator instead of deflating the score.
//! The final value is always clamped to `[0, 1]`.

use crate::patterns::PatternSet;
use crate::types::CandidateSource;
use screenmatch_core::{CoreError, MediaMetadata};
use serde::{Deserialize, Serialize};

/// Weight of the provider-source component.
pub const SOURCE_WEIGHT: f64 = 0.60;
/// Weight of the genre-overlap component.
pub const GENRE_WEIGHT: f64 = 0.20;
/// Weight of the thematic-pattern-overlap component.
pub const PATTERN_WEIGHT: f64 = 0.10;
/// Weight of the keyword-overlap component.
pub const KEYWORD_WEIGHT: f64 = 0.05;
/// Weight of the rating-quality component.
pub const RATING_WEIGHT: f64 = 0.03;
/// Weight of the popularity-dampening component.
pub const POPULARITY_WEIGHT: f64 = 0.01;
/// Weight of the year-proximity component.
pub const YEAR_WEIGHT: f64 = 0.01;

/// Component value for candidates from the recommendation endpoint.
const DIRECT_SOURCE_SCORE: f64 = 1.0;
/// Component value for candidates from the similarity endpoint.
const SIMILAR_SOURCE_SCORE: f64 = 0.7;

/// Bayesian shrinkage prior for the rating component (normalized 0-1 mean).
const RATING_PRIOR_MEAN: f64 = 0.7;
const RATING_PRIOR_COUNT: f64 = 1000.0;

/// Year proximity window; items further apart score zero on this axis.
const YEAR_WINDOW: f64 = 10.0;

/// Cap on the keyword-overlap denominator so richly tagged seeds are not
/// penalized.
const KEYWORD_DENOMINATOR_CAP: usize = 20;

/// Immutable component weights, constructed once and threaded through the
/// engine. The canonical allocation is source-dominant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub source: f64,
    pub genre: f64,
    pub pattern: f64,
    pub keyword: f64,
    pub rating: f64,
    pub popularity: f64,
    pub year: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            source: SOURCE_WEIGHT,
            genre: GENRE_WEIGHT,
            pattern: PATTERN_WEIGHT,
            keyword: KEYWORD_WEIGHT,
            rating: RATING_WEIGHT,
            popularity: POPULARITY_WEIGHT,
            year: YEAR_WEIGHT,
        }
    }
}

impl SimilarityWeights {
    pub fn sum(&self) -> f64 {
        self.source
            + self.genre
            + self.pattern
            + self.keyword
            + self.rating
            + self.popularity
            + self.year
    }

    /// Weights must sum to 1.0. Anything else is a construction mistake and
    /// fails hard rather than silently renormalizing to a wrong total.
    pub fn validate(&self) -> Result<(), CoreError> {
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(CoreError::validation(
                format!("similarity weights must sum to 1.0, got {}", sum),
                Some("weights"),
            ));
        }
        Ok(())
    }
}

/// Per-component values behind a final score. Components that did not apply
/// are `None` and their weight was excluded from the normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub source: f64,
    pub genre: Option<f64>,
    pub pattern: Option<f64>,
    pub keyword: Option<f64>,
    pub rating: Option<f64>,
    pub popularity: Option<f64>,
    pub year: Option<f64>,
    pub total: f64,
}

/// Computes normalized seed-candidate similarity scores.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    weights: SimilarityWeights,
}

impl SimilarityScorer {
    pub fn new(weights: SimilarityWeights) -> Result<Self, CoreError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    /// Score a candidate against a seed.
    pub fn score(
        &self,
        seed: &MediaMetadata,
        seed_patterns: &PatternSet,
        candidate: &MediaMetadata,
        candidate_patterns: &PatternSet,
        source: CandidateSource,
    ) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::default();
        let mut weighted = 0.0;
        let mut applied = 0.0;

        // Source confidence always applies; direct recommendations carry
        // more provider signal than similarity matches.
        let source_score = match source {
            CandidateSource::Direct => DIRECT_SOURCE_SCORE,
            CandidateSource::Similar => SIMILAR_SOURCE_SCORE,
        };
        breakdown.source = source_score;
        weighted += source_score * self.weights.source;
        applied += self.weights.source;

        if !seed.genres.is_empty() && !candidate.genres.is_empty() {
            let seed_ids = seed.genre_ids();
            let candidate_ids = candidate.genre_ids();
            let intersection = seed_ids.intersection(&candidate_ids).count() as f64;
            let denominator = seed_ids.len().max(candidate_ids.len()) as f64;
            let value = intersection / denominator;
            breakdown.genre = Some(value);
            weighted += value * self.weights.genre;
            applied += self.weights.genre;
        }

        if !seed_patterns.is_empty() && !candidate_patterns.is_empty() {
            let intersection = seed_patterns.intersection(candidate_patterns).count() as f64;
            let denominator = seed_patterns.len().max(candidate_patterns.len()) as f64;
            let value = intersection / denominator;
            breakdown.pattern = Some(value);
            weighted += value * self.weights.pattern;
            applied += self.weights.pattern;
        }

        if !seed.keywords.is_empty() && !candidate.keywords.is_empty() {
            let seed_ids = seed.keyword_ids();
            let candidate_ids = candidate.keyword_ids();
            let intersection = seed_ids.intersection(&candidate_ids).count() as f64;
            let denominator = seed_ids.len().min(KEYWORD_DENOMINATOR_CAP).max(1) as f64;
            let value = (intersection / denominator).min(1.0);
            breakdown.keyword = Some(value);
            weighted += value * self.weights.keyword;
            applied += self.weights.keyword;
        }

        let quality = candidate.vote_average.map(|average| {
            let votes = candidate.vote_count as f64;
            (votes * (average / 10.0) + RATING_PRIOR_COUNT * RATING_PRIOR_MEAN)
                / (votes + RATING_PRIOR_COUNT)
        });
        if let Some(quality) = quality {
            breakdown.rating = Some(quality);
            weighted += quality * self.weights.rating;
            applied += self.weights.rating;
        }

        // Dampens very popular candidates so less mainstream matches can
        // surface.
        if let (Some(quality), Some(popularity)) = (quality, candidate.popularity) {
            let credibility = (candidate.vote_count as f64 / 1000.0).min(1.0);
            let value = credibility * quality * (1.0 - (popularity / 1000.0).min(0.9));
            breakdown.popularity = Some(value);
            weighted += value * self.weights.popularity;
            applied += self.weights.popularity;
        }

        if let (Some(seed_year), Some(candidate_year)) =
            (seed.release_year(), candidate.release_year())
        {
            let distance = (seed_year - candidate_year).abs() as f64;
            let value = (1.0 - distance / YEAR_WINDOW).max(0.0);
            breakdown.year = Some(value);
            weighted += value * self.weights.year;
            applied += self.weights.year;
        }

        breakdown.total = if applied > 0.0 {
            (weighted / applied).clamp(0.0, 1.0)
        } else {
            0.0
        };
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use screenmatch_core::{Genre, Keyword, MediaIdentity};

    fn scorer() -> SimilarityScorer {
        SimilarityScorer::new(SimilarityWeights::default()).unwrap()
    }

    fn bare(id: u64) -> MediaMetadata {
        MediaMetadata::new(MediaIdentity::movie(id), format!("Item {}", id))
    }

    fn with_genres(id: u64, genre_ids: &[i64]) -> MediaMetadata {
        let mut metadata = bare(id);
        metadata.genres = genre_ids
            .iter()
            .map(|&gid| Genre {
                id: gid,
                name: format!("Genre {}", gid),
            })
            .collect();
        metadata
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(SimilarityWeights::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let weights = SimilarityWeights {
            source: 0.9,
            ..Default::default()
        };
        assert!(SimilarityScorer::new(weights).is_err());
    }

    #[test]
    fn test_score_in_bounds_with_no_metadata() {
        // Only the source component applies; normalization keeps the score
        // meaningful instead of dividing by zero.
        let breakdown = scorer().score(
            &bare(1),
            &PatternSet::new(),
            &bare(2),
            &PatternSet::new(),
            CandidateSource::Direct,
        );
        assert!((0.0..=1.0).contains(&breakdown.total));
        assert_eq!(breakdown.total, 1.0);
        assert!(breakdown.genre.is_none());
        assert!(breakdown.year.is_none());
    }

    #[test]
    fn test_similar_source_scores_below_direct() {
        let direct = scorer().score(
            &bare(1),
            &PatternSet::new(),
            &bare(2),
            &PatternSet::new(),
            CandidateSource::Direct,
        );
        let similar = scorer().score(
            &bare(1),
            &PatternSet::new(),
            &bare(2),
            &PatternSet::new(),
            CandidateSource::Similar,
        );
        assert!(similar.total < direct.total);
    }

    #[test]
    fn test_genre_overlap_ratio() {
        let seed = with_genres(1, &[18, 80]);
        let candidate = with_genres(2, &[18, 80, 53]);
        let breakdown = scorer().score(
            &seed,
            &PatternSet::new(),
            &candidate,
            &PatternSet::new(),
            CandidateSource::Direct,
        );
        // 2 shared over max(2, 3).
        let genre = breakdown.genre.unwrap();
        assert!((genre - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_keyword_denominator_capped() {
        let mut seed = bare(1);
        seed.keywords = (0..40)
            .map(|kid| Keyword {
                id: kid,
                name: format!("kw{}", kid),
            })
            .collect();
        let mut candidate = bare(2);
        candidate.keywords = (0..10)
            .map(|kid| Keyword {
                id: kid,
                name: format!("kw{}", kid),
            })
            .collect();

        let breakdown = scorer().score(
            &seed,
            &PatternSet::new(),
            &candidate,
            &PatternSet::new(),
            CandidateSource::Direct,
        );
        // 10 shared over min(40, 20) = 20, not over 40.
        let keyword = breakdown.keyword.unwrap();
        assert!((keyword - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rating_shrinks_small_samples_toward_prior() {
        let mut small_sample = bare(2);
        small_sample.vote_average = Some(10.0);
        small_sample.vote_count = 5;

        let mut credible = bare(3);
        credible.vote_average = Some(9.0);
        credible.vote_count = 50_000;

        let seed = bare(1);
        let patterns = PatternSet::new();
        let small = scorer()
            .score(&seed, &patterns, &small_sample, &patterns, CandidateSource::Direct)
            .rating
            .unwrap();
        let big = scorer()
            .score(&seed, &patterns, &credible, &patterns, CandidateSource::Direct)
            .rating
            .unwrap();

        // A 10/10 over five votes stays near the prior of 0.7; fifty
        // thousand votes at 9/10 pull well clear of it.
        assert!(small < 0.72);
        assert!(big > 0.85);
    }

    #[test]
    fn test_popularity_dampener_reduces_mainstream_scores() {
        let mut niche = bare(2);
        niche.vote_average = Some(8.0);
        niche.vote_count = 2000;
        niche.popularity = Some(20.0);

        let mut mainstream = niche.clone();
        mainstream.identity = MediaIdentity::movie(3);
        mainstream.popularity = Some(5000.0);

        let seed = bare(1);
        let patterns = PatternSet::new();
        let niche_pop = scorer()
            .score(&seed, &patterns, &niche, &patterns, CandidateSource::Direct)
            .popularity
            .unwrap();
        let mainstream_pop = scorer()
            .score(&seed, &patterns, &mainstream, &patterns, CandidateSource::Direct)
            .popularity
            .unwrap();
        assert!(mainstream_pop < niche_pop);
    }

    #[test]
    fn test_year_proximity_window() {
        let mut seed = bare(1);
        seed.primary_date = NaiveDate::from_ymd_opt(2000, 1, 1);

        let mut near = bare(2);
        near.primary_date = NaiveDate::from_ymd_opt(2005, 1, 1);
        let mut far = bare(3);
        far.primary_date = NaiveDate::from_ymd_opt(2020, 1, 1);

        let patterns = PatternSet::new();
        let near_year = scorer()
            .score(&seed, &patterns, &near, &patterns, CandidateSource::Direct)
            .year
            .unwrap();
        let far_year = scorer()
            .score(&seed, &patterns, &far, &patterns, CandidateSource::Direct)
            .year
            .unwrap();

        assert!((near_year - 0.5).abs() < 1e-9);
        // Outside the window scores zero, never negative.
        assert_eq!(far_year, 0.0);
    }

    #[test]
    fn test_pattern_overlap() {
        let seed_patterns: PatternSet = ["Moral Descent", "Slow-Burn Mystery"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let candidate_patterns: PatternSet =
            ["Moral Descent"].iter().map(|s| s.to_string()).collect();

        let breakdown = scorer().score(
            &bare(1),
            &seed_patterns,
            &bare(2),
            &candidate_patterns,
            CandidateSource::Direct,
        );
        let pattern = breakdown.pattern.unwrap();
        assert!((pattern - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_full_metadata_stays_in_bounds() {
        let mut seed = with_genres(1, &[18, 80]);
        seed.keywords = vec![Keyword {
            id: 1,
            name: "meth".to_string(),
        }];
        seed.primary_date = NaiveDate::from_ymd_opt(2008, 1, 20);
        seed.vote_average = Some(9.0);
        seed.vote_count = 10_000;
        seed.popularity = Some(400.0);

        let mut candidate = seed.clone();
        candidate.identity = MediaIdentity::movie(2);

        let patterns: PatternSet = ["Moral Descent"].iter().map(|s| s.to_string()).collect();
        let breakdown =
            scorer().score(&seed, &patterns, &candidate, &patterns, CandidateSource::Direct);
        assert!((0.0..=1.0).contains(&breakdown.total));
        assert!(breakdown.total > 0.8);
    }
}

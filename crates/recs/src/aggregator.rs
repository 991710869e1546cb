//! Candidate aggregation: gather, expand, deduplicate, score, rank.
//!
//! The pipeline fans out one metadata fetch per independent identity and
//! joins all results before each stage that needs them; the dedup/merge step
//! runs serially after the join, so no shared mutable state is touched by
//! concurrent fetches.

use crate::cache::{self, keys, CacheStore};
use crate::config::{CacheConfig, EngineConfig};
use crate::patterns::{classify, PatternSet};
use crate::provider::MetadataProvider;
use crate::scorer::{SimilarityScorer, SimilarityWeights};
use crate::types::{
    CandidateOccurrence, CandidateSource, RecommendationOptions, RecommendationResult,
    RecommendedItem, SeedSummary,
};
use crate::{RecsError, Result};
use futures::future::join_all;
use screenmatch_core::config::ConfigLoader;
use screenmatch_core::{MediaIdentity, MediaMetadata};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Hard cap on the returned list.
const MAX_RESULTS: usize = 20;

/// Merge accumulator for one unique candidate. Storing the sum and count
/// keeps the mean independent of the order paths were encountered in.
struct CandidateAccumulator {
    score_sum: f64,
    match_count: u32,
    sources: Vec<CandidateSource>,
    via_title: Option<String>,
}

/// Aggregates, scores and ranks recommendation candidates for seed items.
pub struct RecommendationEngine {
    provider: Arc<dyn MetadataProvider>,
    cache: Arc<dyn CacheStore>,
    scorer: SimilarityScorer,
    engine_config: EngineConfig,
    cache_config: CacheConfig,
}

impl RecommendationEngine {
    /// Build an engine. Fails fast on invalid weights or configuration.
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        cache: Arc<dyn CacheStore>,
        weights: SimilarityWeights,
        engine_config: EngineConfig,
        cache_config: CacheConfig,
    ) -> Result<Self> {
        engine_config.validate()?;
        cache_config.validate()?;
        let scorer = SimilarityScorer::new(weights)?;

        Ok(Self {
            provider,
            cache,
            scorer,
            engine_config,
            cache_config,
        })
    }

    /// Ranked recommendations for one or more seed identities.
    ///
    /// Returns a best-effort list: candidates that fail to resolve are
    /// dropped silently. The call itself fails only when no seed resolves.
    #[instrument(skip(self, options), fields(seeds = seeds.len()))]
    pub async fn get_recommendations(
        &self,
        seeds: &[MediaIdentity],
        options: &RecommendationOptions,
    ) -> Result<RecommendationResult> {
        if seeds.is_empty() {
            return Err(RecsError::InvalidIdentity(
                "at least one seed is required".to_string(),
            ));
        }
        for seed in seeds {
            seed.validate()
                .map_err(|e| RecsError::InvalidIdentity(e.to_string()))?;
        }

        let cache_key = keys::recommendations(seeds);
        if !options.skip_cache {
            if let Some(ranked) =
                cache::get_or_miss::<RecommendationResult>(self.cache.as_ref(), &cache_key).await
            {
                debug!(key = %cache_key, "serving aggregated result from cache");
                return Ok(finalize(ranked, options));
            }
        }

        let ranked = self.aggregate(seeds, options.skip_cache).await?;

        if !options.skip_cache {
            cache::set_or_skip(
                self.cache.as_ref(),
                &cache_key,
                &ranked,
                self.cache_config.results_ttl,
            )
            .await;
        }

        Ok(finalize(ranked, options))
    }

    /// Full aggregation pass: the ranked, unfiltered, uncapped list.
    async fn aggregate(
        &self,
        seeds: &[MediaIdentity],
        skip_cache: bool,
    ) -> Result<RecommendationResult> {
        // Stage 1: resolve every seed concurrently; skip the ones that fail.
        let outcomes = join_all(seeds.iter().map(|seed| self.resolve(*seed, skip_cache))).await;
        let mut resolved: Vec<(MediaMetadata, PatternSet)> = Vec::new();
        for (seed, outcome) in seeds.iter().zip(outcomes) {
            match outcome {
                Ok(Some(metadata)) => {
                    let patterns = classify(&metadata.classification_text());
                    resolved.push((metadata, patterns));
                }
                Ok(None) => warn!(seed = %seed, "seed not found, skipping"),
                Err(error) => warn!(seed = %seed, %error, "seed resolution failed, skipping"),
            }
        }
        if resolved.is_empty() {
            return Err(RecsError::NoSeedsResolved);
        }

        let seed_identities: HashSet<MediaIdentity> = seeds.iter().copied().collect();

        // Stage 2: raw candidate occurrences from every seed's lists.
        let mut occurrences: Vec<CandidateOccurrence> = Vec::new();
        for (metadata, _) in &resolved {
            for identity in &metadata.direct_recommendations {
                occurrences.push(CandidateOccurrence {
                    identity: *identity,
                    source: CandidateSource::Direct,
                    seed: metadata.identity,
                    via_title: None,
                });
            }
            for identity in &metadata.similar_items {
                occurrences.push(CandidateOccurrence {
                    identity: *identity,
                    source: CandidateSource::Similar,
                    seed: metadata.identity,
                    via_title: None,
                });
            }
        }

        // Stage 3: one bounded extra hop through top direct recommendations.
        if self.engine_config.expansion_enabled {
            let expanded = self
                .expand(&resolved, &seed_identities, skip_cache)
                .await;
            occurrences.extend(expanded);
        }

        // Never recommend an input back to itself.
        occurrences.retain(|occurrence| !seed_identities.contains(&occurrence.identity));

        // Stage 4: resolve each unique candidate once, concurrently.
        let mut unique: Vec<MediaIdentity> = Vec::new();
        let mut seen: HashSet<MediaIdentity> = HashSet::new();
        for occurrence in &occurrences {
            if seen.insert(occurrence.identity) {
                unique.push(occurrence.identity);
            }
        }

        let outcomes =
            join_all(unique.iter().map(|c| self.resolve(*c, skip_cache))).await;
        let mut candidates: HashMap<MediaIdentity, (MediaMetadata, PatternSet)> = HashMap::new();
        for (identity, outcome) in unique.iter().zip(outcomes) {
            match outcome {
                Ok(Some(metadata)) => {
                    let patterns = classify(&metadata.classification_text());
                    candidates.insert(*identity, (metadata, patterns));
                }
                Ok(None) => debug!(candidate = %identity, "candidate not found, dropped"),
                Err(error) => {
                    warn!(candidate = %identity, %error, "candidate resolution failed, dropped")
                }
            }
        }

        // Stage 5: serialized merge after all fetches joined. Each path
        // scores against its own originating seed; paths converging on one
        // identity average out.
        let seeds_by_identity: HashMap<MediaIdentity, &(MediaMetadata, PatternSet)> =
            resolved.iter().map(|entry| (entry.0.identity, entry)).collect();

        let mut merged: HashMap<MediaIdentity, CandidateAccumulator> = HashMap::new();
        let mut first_seen: Vec<MediaIdentity> = Vec::new();
        for occurrence in &occurrences {
            let Some((candidate_metadata, candidate_patterns)) =
                candidates.get(&occurrence.identity)
            else {
                continue;
            };
            let Some((seed_metadata, seed_patterns)) = seeds_by_identity.get(&occurrence.seed)
            else {
                continue;
            };

            let breakdown = self.scorer.score(
                seed_metadata,
                seed_patterns,
                candidate_metadata,
                candidate_patterns,
                occurrence.source,
            );

            let accumulator = merged.entry(occurrence.identity).or_insert_with(|| {
                first_seen.push(occurrence.identity);
                CandidateAccumulator {
                    score_sum: 0.0,
                    match_count: 0,
                    sources: Vec::new(),
                    via_title: occurrence.via_title.clone(),
                }
            });
            accumulator.score_sum += breakdown.total;
            accumulator.match_count += 1;
            if !accumulator.sources.contains(&occurrence.source) {
                accumulator.sources.push(occurrence.source);
            }
        }

        let mut items: Vec<RecommendedItem> = first_seen
            .iter()
            .map(|identity| {
                let accumulator = &merged[identity];
                let (metadata, _) = &candidates[identity];
                RecommendedItem {
                    identity: *identity,
                    metadata: metadata.clone(),
                    score: accumulator.score_sum / f64::from(accumulator.match_count),
                    match_count: accumulator.match_count,
                    sources: accumulator.sources.clone(),
                    via_title: accumulator.via_title.clone(),
                }
            })
            .collect();

        // Stage 6: rank. More agreeing paths win ties.
        items.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.match_count.cmp(&a.match_count))
        });

        info!(
            seeds = resolved.len(),
            candidates = items.len(),
            "aggregation complete"
        );

        Ok(RecommendationResult {
            source: SeedSummary::from_metadata(&resolved[0].0),
            items,
        })
    }

    /// One extra recommendation hop, strictly bounded: per seed, only the
    /// first `expansion_breadth` direct recommendations are walked, each
    /// exactly once, and their lists are never expanded further.
    async fn expand(
        &self,
        resolved: &[(MediaMetadata, PatternSet)],
        seed_identities: &HashSet<MediaIdentity>,
        skip_cache: bool,
    ) -> Vec<CandidateOccurrence> {
        let mut visited: HashSet<MediaIdentity> = seed_identities.clone();
        let mut frontier: Vec<(MediaIdentity, MediaIdentity)> = Vec::new();
        for (metadata, _) in resolved {
            for identity in metadata
                .direct_recommendations
                .iter()
                .take(self.engine_config.expansion_breadth)
            {
                if visited.insert(*identity) {
                    frontier.push((*identity, metadata.identity));
                }
            }
        }

        debug!(hops = frontier.len(), "expanding recommendation chain");

        let outcomes =
            join_all(frontier.iter().map(|(hop, _)| self.resolve(*hop, skip_cache))).await;

        let mut discovered = Vec::new();
        for ((hop, seed), outcome) in frontier.iter().zip(outcomes) {
            match outcome {
                Ok(Some(hop_metadata)) => {
                    for identity in &hop_metadata.direct_recommendations {
                        discovered.push(CandidateOccurrence {
                            identity: *identity,
                            source: CandidateSource::Direct,
                            seed: *seed,
                            via_title: Some(hop_metadata.title.clone()),
                        });
                    }
                }
                Ok(None) => debug!(hop = %hop, "expansion hop not found, skipped"),
                Err(error) => warn!(hop = %hop, %error, "expansion hop failed, skipped"),
            }
        }
        discovered
    }

    /// Cache-backed metadata resolution; the provider itself stays pure I/O.
    async fn resolve(
        &self,
        identity: MediaIdentity,
        skip_cache: bool,
    ) -> Result<Option<MediaMetadata>> {
        let key = keys::media(&identity);
        if !skip_cache {
            if let Some(hit) =
                cache::get_or_miss::<MediaMetadata>(self.cache.as_ref(), &key).await
            {
                return Ok(Some(hit));
            }
        }

        let fetched = self.provider.fetch(identity).await?;
        if !skip_cache {
            if let Some(metadata) = &fetched {
                cache::set_or_skip(
                    self.cache.as_ref(),
                    &key,
                    metadata,
                    self.cache_config.metadata_ttl,
                )
                .await;
            }
        }
        Ok(fetched)
    }
}

/// Post-ranking filter pass and the final cap. Filtering first means the cap
/// keeps the best matches under the filter, not the first ones found.
fn finalize(mut ranked: RecommendationResult, options: &RecommendationOptions) -> RecommendationResult {
    ranked
        .items
        .retain(|item| options.filters.matches(&item.metadata));
    ranked.items.truncate(MAX_RESULTS);
    ranked
}

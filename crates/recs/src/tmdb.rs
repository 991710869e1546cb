//! TMDB metadata provider client.
//!
//! Normalizes provider payloads into [`MediaMetadata`]. Movies resolve
//! through a single combined detail call; shows need separate
//! recommendation and similar-item calls, because the provider offers no
//! combined retrieval for that type. Unexpected or missing payload fields
//! are treated as absent data, not as failures.

use crate::config::TmdbConfig;
use crate::provider::MetadataProvider;
use crate::rate_limit::ProviderRateLimiter;
use crate::{RecsError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use screenmatch_core::{Genre, Keyword, MediaIdentity, MediaMetadata, MediaType};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff used when a rate-limited response carries no hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Extra payloads appended to a movie detail call. One request carries the
/// full candidate lists plus everything the classifier and scorer need.
const MOVIE_APPENDS: &str = "recommendations,similar,keywords,release_dates,reviews,translations";

/// Extra payloads appended to a TV detail call. Candidate lists are fetched
/// separately for this type.
const TV_APPENDS: &str = "keywords,content_ratings,reviews,translations";

/// Certification region the normalizer prefers.
const CERTIFICATION_REGION: &str = "US";

/// HTTP client for the TMDB API.
pub struct TmdbClient {
    client: Client,
    access_token: String,
    base_url: String,
    limiter: ProviderRateLimiter,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            access_token: config.access_token,
            base_url: config.base_url,
            limiter: ProviderRateLimiter::default(),
        })
    }

    /// GET a provider path with bearer auth and budget gating.
    ///
    /// Returns `Ok(None)` on 404. Each rate-limited response triggers one
    /// retry after the provider's own `Retry-After` hint, so backoff never
    /// busy-loops and never outpaces the provider.
    async fn get_json(&self, path_and_query: &str) -> Result<Option<Value>> {
        loop {
            self.limiter.acquire().await;

            let url = format!("{}{}", self.base_url, path_and_query);
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .send()
                .await?;

            match response.status() {
                StatusCode::NOT_FOUND => return Ok(None),
                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = parse_retry_after(&response);
                    warn!(
                        path = %path_and_query,
                        delay_ms = retry_after.as_millis() as u64,
                        "provider rate limited, backing off"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                status if status.is_success() => {
                    return Ok(Some(response.json().await?));
                }
                status => {
                    let message = response.text().await.unwrap_or_default();
                    return Err(RecsError::Upstream {
                        status: status.as_u16(),
                        message,
                    });
                }
            }
        }
    }

    async fn fetch_movie(&self, id: u64) -> Result<Option<MediaMetadata>> {
        let path = format!("/movie/{}?append_to_response={}", id, MOVIE_APPENDS);
        let Some(data) = self.get_json(&path).await? else {
            return Ok(None);
        };
        parse_movie(&data).map(Some)
    }

    async fn fetch_tv(&self, id: u64) -> Result<Option<MediaMetadata>> {
        let path = format!("/tv/{}?append_to_response={}", id, TV_APPENDS);
        let Some(detail) = self.get_json(&path).await? else {
            return Ok(None);
        };

        // The provider has no combined retrieval for shows, so the candidate
        // lists take two more calls. A missing list is absent data.
        let recommendations = self
            .get_json(&format!("/tv/{}/recommendations", id))
            .await?;
        let similar = self.get_json(&format!("/tv/{}/similar", id)).await?;

        parse_tv(&detail, recommendations.as_ref(), similar.as_ref()).map(Some)
    }

    /// Multi-type title search. Persons and unrecognized media types in the
    /// response are skipped.
    pub async fn search(&self, query: &str) -> Result<Vec<(MediaIdentity, String)>> {
        let path = format!("/search/multi?query={}", urlencoding::encode(query));
        let Some(data) = self.get_json(&path).await? else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::new();
        for item in data
            .get("results")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            let Some(media_type) = item
                .get("media_type")
                .and_then(Value::as_str)
                .and_then(|t| t.parse::<MediaType>().ok())
            else {
                continue;
            };
            let Some(id) = item.get("id").and_then(Value::as_u64) else {
                continue;
            };
            let Some(title) = item
                .get("title")
                .or_else(|| item.get("name"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            hits.push((MediaIdentity::new(media_type, id), title.to_string()));
        }

        debug!(query = %query, hits = hits.len(), "provider search complete");
        Ok(hits)
    }
}

#[async_trait]
impl MetadataProvider for TmdbClient {
    async fn fetch(&self, identity: MediaIdentity) -> Result<Option<MediaMetadata>> {
        identity
            .validate()
            .map_err(|e| RecsError::InvalidIdentity(e.to_string()))?;

        match identity.media_type {
            MediaType::Movie => self.fetch_movie(identity.id).await,
            MediaType::Tv => self.fetch_tv(identity.id).await,
        }
    }
}

fn parse_retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn parse_movie(data: &Value) -> Result<MediaMetadata> {
    let mut metadata = parse_common(data, MediaType::Movie)?;

    metadata.primary_date = parse_date(data.get("release_date"));
    metadata.keywords = parse_keywords(data.get("keywords").and_then(|k| k.get("keywords")));
    metadata.certification = parse_movie_certification(data.get("release_dates"));
    metadata.direct_recommendations = parse_identity_list(
        data.get("recommendations").unwrap_or(&Value::Null),
        MediaType::Movie,
    );
    metadata.similar_items =
        parse_identity_list(data.get("similar").unwrap_or(&Value::Null), MediaType::Movie);

    Ok(metadata)
}

fn parse_tv(
    detail: &Value,
    recommendations: Option<&Value>,
    similar: Option<&Value>,
) -> Result<MediaMetadata> {
    let mut metadata = parse_common(detail, MediaType::Tv)?;

    metadata.primary_date = parse_date(detail.get("first_air_date"));
    metadata.keywords = parse_keywords(detail.get("keywords").and_then(|k| k.get("results")));
    metadata.certification = parse_tv_certification(detail.get("content_ratings"));
    metadata.direct_recommendations =
        parse_identity_list(recommendations.unwrap_or(&Value::Null), MediaType::Tv);
    metadata.similar_items = parse_identity_list(similar.unwrap_or(&Value::Null), MediaType::Tv);

    Ok(metadata)
}

/// Fields shared by both detail payload shapes.
fn parse_common(data: &Value, media_type: MediaType) -> Result<MediaMetadata> {
    let id = data
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| RecsError::Normalization("missing id".to_string()))?;

    let title = data
        .get("title")
        .or_else(|| data.get("name"))
        .and_then(Value::as_str)
        .ok_or_else(|| RecsError::Normalization("missing title".to_string()))?
        .to_string();

    let mut metadata = MediaMetadata::new(MediaIdentity::new(media_type, id), title);

    metadata.overview = non_empty_string(data.get("overview"));
    metadata.tagline = non_empty_string(data.get("tagline"));
    metadata.extra_text = parse_extra_text(data);
    metadata.genres = data
        .get("genres")
        .and_then(Value::as_array)
        .map(|genres| {
            genres
                .iter()
                .filter_map(|genre| {
                    Some(Genre {
                        id: genre.get("id")?.as_i64()?,
                        name: genre.get("name")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    metadata.vote_average = data.get("vote_average").and_then(Value::as_f64);
    metadata.vote_count = data.get("vote_count").and_then(Value::as_u64).unwrap_or(0);
    metadata.popularity = data.get("popularity").and_then(Value::as_f64);
    metadata.poster_path = non_empty_string(data.get("poster_path"));

    Ok(metadata)
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    value
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

fn parse_keywords(value: Option<&Value>) -> Vec<Keyword> {
    value
        .and_then(Value::as_array)
        .map(|keywords| {
            keywords
                .iter()
                .filter_map(|keyword| {
                    Some(Keyword {
                        id: keyword.get("id")?.as_i64()?,
                        name: keyword.get("name")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Review bodies and translated overviews feed the pattern classifier.
fn parse_extra_text(data: &Value) -> Vec<String> {
    let mut texts = Vec::new();

    for review in data
        .get("reviews")
        .and_then(|r| r.get("results"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(content) = review.get("content").and_then(Value::as_str) {
            if !content.is_empty() {
                texts.push(content.to_string());
            }
        }
    }

    for translation in data
        .get("translations")
        .and_then(|t| t.get("translations"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(overview) = translation
            .get("data")
            .and_then(|d| d.get("overview"))
            .and_then(Value::as_str)
        {
            if !overview.is_empty() {
                texts.push(overview.to_string());
            }
        }
    }

    texts
}

/// Movie certifications sit inside per-region release date groups.
fn parse_movie_certification(value: Option<&Value>) -> Option<String> {
    let regions = value.and_then(|v| v.get("results")).and_then(Value::as_array)?;
    let region = regions.iter().find(|region| {
        region.get("iso_3166_1").and_then(Value::as_str) == Some(CERTIFICATION_REGION)
    })?;
    region
        .get("release_dates")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|release| {
            release
                .get("certification")
                .and_then(Value::as_str)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        })
}

/// TV ratings are a flat per-region list.
fn parse_tv_certification(value: Option<&Value>) -> Option<String> {
    let regions = value.and_then(|v| v.get("results")).and_then(Value::as_array)?;
    regions
        .iter()
        .find(|region| {
            region.get("iso_3166_1").and_then(Value::as_str) == Some(CERTIFICATION_REGION)
        })
        .and_then(|region| {
            region
                .get("rating")
                .and_then(Value::as_str)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
        })
}

fn parse_identity_list(value: &Value, media_type: MediaType) -> Vec<MediaIdentity> {
    value
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|item| item.get("id").and_then(Value::as_u64))
                .map(|id| MediaIdentity::new(media_type, id))
                .collect()
        })
        .unwrap_or_default()
}

//! Core domain types for media items and their provider metadata.

use crate::error::CoreError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Media classification used by the metadata provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(CoreError::validation(
                format!("unknown media type '{}'", other),
                Some("media_type"),
            )),
        }
    }
}

/// Identity of a media item at the provider: media type plus numeric id.
///
/// Movies and shows live in separate id namespaces, so equality requires
/// both fields to match. This is the primary key for caching and
/// deduplication everywhere in the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MediaIdentity {
    pub media_type: MediaType,
    pub id: u64,
}

impl MediaIdentity {
    pub fn new(media_type: MediaType, id: u64) -> Self {
        Self { media_type, id }
    }

    pub fn movie(id: u64) -> Self {
        Self::new(MediaType::Movie, id)
    }

    pub fn tv(id: u64) -> Self {
        Self::new(MediaType::Tv, id)
    }

    /// The provider never issues id 0; it marks a caller mistake.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id == 0 {
            return Err(CoreError::validation(
                "media id must be a positive integer",
                Some("id"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.media_type, self.id)
    }
}

/// A provider genre tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A provider keyword tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub name: String,
}

/// Normalized metadata for a single media item.
///
/// Fetched on demand from the provider, cached as JSON with a long TTL, and
/// never mutated in place: a refresh replaces the cache entry wholesale.
/// Genres and keywords carry set semantics (unique by id, order irrelevant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub identity: MediaIdentity,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    /// Review bodies and translated overviews, fed to the pattern classifier.
    #[serde(default)]
    pub extra_text: Vec<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    /// Release date for movies, first-air date for shows.
    #[serde(default)]
    pub primary_date: Option<NaiveDate>,
    /// Provider vote average on a 0-10 scale.
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub popularity: Option<f64>,
    /// Region certification code, when the provider reports one.
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Candidates from the provider's dedicated recommendation endpoint.
    #[serde(default)]
    pub direct_recommendations: Vec<MediaIdentity>,
    /// Candidates from the provider's content-similarity endpoint.
    #[serde(default)]
    pub similar_items: Vec<MediaIdentity>,
}

impl MediaMetadata {
    /// Empty metadata shell for the given identity and title.
    pub fn new(identity: MediaIdentity, title: impl Into<String>) -> Self {
        Self {
            identity,
            title: title.into(),
            overview: None,
            tagline: None,
            extra_text: Vec::new(),
            genres: Vec::new(),
            keywords: Vec::new(),
            primary_date: None,
            vote_average: None,
            vote_count: 0,
            popularity: None,
            certification: None,
            poster_path: None,
            direct_recommendations: Vec::new(),
            similar_items: Vec::new(),
        }
    }

    pub fn release_year(&self) -> Option<i32> {
        self.primary_date.map(|d| d.year())
    }

    /// All free-text fields joined with single spaces, in a stable order.
    /// Absent fields contribute nothing.
    pub fn classification_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(overview) = self.overview.as_deref() {
            parts.push(overview);
        }
        if let Some(tagline) = self.tagline.as_deref() {
            parts.push(tagline);
        }
        for text in &self.extra_text {
            parts.push(text);
        }
        parts.join(" ")
    }

    pub fn genre_ids(&self) -> HashSet<i64> {
        self.genres.iter().map(|g| g.id).collect()
    }

    pub fn keyword_ids(&self) -> HashSet<i64> {
        self.keywords.iter().map(|k| k.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        assert_eq!(MediaIdentity::movie(603).to_string(), "movie:603");
        assert_eq!(MediaIdentity::tv(1396).to_string(), "tv:1396");
    }

    #[test]
    fn test_identity_equality_requires_both_fields() {
        assert_ne!(MediaIdentity::movie(42), MediaIdentity::tv(42));
        assert_eq!(MediaIdentity::movie(42), MediaIdentity::movie(42));
    }

    #[test]
    fn test_identity_zero_id_invalid() {
        assert!(MediaIdentity::movie(0).validate().is_err());
        assert!(MediaIdentity::tv(1396).validate().is_ok());
    }

    #[test]
    fn test_media_type_round_trip() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("tv".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("person".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_classification_text_skips_absent_fields() {
        let mut metadata = MediaMetadata::new(MediaIdentity::movie(1), "Test");
        assert_eq!(metadata.classification_text(), "");

        metadata.overview = Some("a dream within a dream".to_string());
        metadata.extra_text.push("reviewer notes".to_string());
        assert_eq!(
            metadata.classification_text(),
            "a dream within a dream reviewer notes"
        );
    }

    #[test]
    fn test_release_year() {
        let mut metadata = MediaMetadata::new(MediaIdentity::tv(1396), "Test");
        assert_eq!(metadata.release_year(), None);

        metadata.primary_date = NaiveDate::from_ymd_opt(2008, 1, 20);
        assert_eq!(metadata.release_year(), Some(2008));
    }

    #[test]
    fn test_metadata_serde_round_trip() {
        let mut metadata = MediaMetadata::new(MediaIdentity::movie(603), "The Matrix");
        metadata.genres.push(Genre {
            id: 878,
            name: "Science Fiction".to_string(),
        });
        metadata.vote_average = Some(8.2);
        metadata.vote_count = 25000;

        let json = serde_json::to_string(&metadata).unwrap();
        let back: MediaMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metadata);
    }
}

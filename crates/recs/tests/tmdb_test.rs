//! HTTP-level tests for the TMDB client against a mock provider.

use screenmatch_core::MediaIdentity;
use screenmatch_recs::{MetadataProvider, RecsError, TmdbClient, TmdbConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MOVIE_APPENDS: &str =
    "recommendations,similar,keywords,release_dates,reviews,translations";
const TV_APPENDS: &str = "keywords,content_ratings,reviews,translations";

fn client(server: &MockServer) -> TmdbClient {
    TmdbClient::new(TmdbConfig {
        access_token: "test-token".to_string(),
        base_url: server.uri(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_movie_resolves_through_a_single_combined_call() {
    let server = MockServer::start().await;

    let body = json!({
        "id": 603,
        "title": "The Matrix",
        "overview": "A hacker learns the truth.",
        "release_date": "1999-03-30",
        "vote_average": 8.2,
        "vote_count": 25000,
        "popularity": 98.5,
        "genres": [{"id": 878, "name": "Science Fiction"}],
        "keywords": {"keywords": [{"id": 310, "name": "simulation"}]},
        "release_dates": {"results": [
            {"iso_3166_1": "US", "release_dates": [{"certification": "R"}]}
        ]},
        "recommendations": {"results": [{"id": 604}, {"id": 605}]},
        "similar": {"results": [{"id": 550}]},
        "reviews": {"results": []},
        "translations": {"translations": []}
    });

    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .and(query_param("append_to_response", MOVIE_APPENDS))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = client(&server)
        .fetch(MediaIdentity::movie(603))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(metadata.title, "The Matrix");
    assert_eq!(metadata.release_year(), Some(1999));
    assert_eq!(metadata.certification.as_deref(), Some("R"));
    assert_eq!(
        metadata.direct_recommendations,
        vec![MediaIdentity::movie(604), MediaIdentity::movie(605)]
    );
    assert_eq!(metadata.similar_items, vec![MediaIdentity::movie(550)]);
}

#[tokio::test]
async fn test_tv_resolves_through_three_separate_calls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tv/1396"))
        .and(query_param("append_to_response", TV_APPENDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "genres": [{"id": 18, "name": "Drama"}],
            "keywords": {"results": [{"id": 1, "name": "drug cartel"}]},
            "content_ratings": {"results": [{"iso_3166_1": "US", "rating": "TV-MA"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tv/1396/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 1398}, {"id": 60059}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tv/1396/similar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 60059}, {"id": 1399}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let metadata = client(&server)
        .fetch(MediaIdentity::tv(1396))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(metadata.title, "Breaking Bad");
    assert_eq!(metadata.certification.as_deref(), Some("TV-MA"));
    assert_eq!(metadata.keywords.len(), 1);
    assert_eq!(
        metadata.direct_recommendations,
        vec![MediaIdentity::tv(1398), MediaIdentity::tv(60059)]
    );
    assert_eq!(
        metadata.similar_items,
        vec![MediaIdentity::tv(60059), MediaIdentity::tv(1399)]
    );
}

#[tokio::test]
async fn test_not_found_is_a_typed_outcome_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/999999"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status_message": "The resource you requested could not be found."
        })))
        .mount(&server)
        .await;

    let outcome = client(&server).fetch(MediaIdentity::movie(999_999)).await;
    assert!(matches!(outcome, Ok(None)));
}

#[tokio::test]
async fn test_server_error_surfaces_as_upstream_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let outcome = client(&server).fetch(MediaIdentity::movie(603)).await;
    match outcome {
        Err(RecsError::Upstream { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal error");
        }
        other => panic!("expected upstream error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_rate_limited_request_retries_after_the_hint() {
    let server = MockServer::start().await;

    // First response throttles with a one-second hint; the retry succeeds.
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_json(json!({"status_message": "Request count over limit."})),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "title": "The Matrix"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let metadata = client(&server)
        .fetch(MediaIdentity::movie(603))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(metadata.title, "The Matrix");
    // The caller observes the result only after the provider's backoff.
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_zero_id_never_reaches_the_network() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would fail the call.

    let outcome = client(&server).fetch(MediaIdentity::movie(0)).await;
    assert!(matches!(outcome, Err(RecsError::InvalidIdentity(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_skips_non_media_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/multi"))
        .and(query_param("query", "breaking bad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"media_type": "tv", "id": 1396, "name": "Breaking Bad"},
                {"media_type": "person", "id": 17419, "name": "Bryan Cranston"},
                {"media_type": "movie", "id": 603, "title": "The Matrix"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server).search("breaking bad").await.unwrap();
    assert_eq!(
        hits,
        vec![
            (MediaIdentity::tv(1396), "Breaking Bad".to_string()),
            (MediaIdentity::movie(603), "The Matrix".to_string()),
        ]
    );
}

use fixture_cache::data_fetcher::api::{RetryPolicy, create_http_client_with_timeout};
use fixture_cache::data_fetcher::cache::{FixtureCache, FreshnessPolicy, MemoryStore, PersistentTier};
use fixture_cache::data_fetcher::{FixtureService, HttpFixtureSource};
use fixture_cache::testing_utils::ManualClock;
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn fixture_json(id: i64, at: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "scheduledAt": at,
        "status": { "short": status },
        "homeTeam": { "id": id * 2, "name": format!("Home {id}") },
        "awayTeam": { "id": id * 2 + 1, "name": format!("Away {id}") },
        "league": { "id": 39, "name": "Premier League" },
        "scoreHome": 2,
        "scoreAway": 1
    })
}

fn service_for(server: &MockServer, store: Arc<MemoryStore>) -> FixtureService<HttpFixtureSource> {
    let clock = Arc::new(ManualClock::at("2025-03-10T18:00:00Z"));
    let tier = PersistentTier::open(store, vec!["auth-session".to_string()]).unwrap();
    let cache = FixtureCache::new(100, FreshnessPolicy::default())
        .with_clock(clock)
        .with_persistent_tier(tier);
    let source = HttpFixtureSource::new(create_http_client_with_timeout(5).unwrap(), server.uri())
        .with_retry_policy(RetryPolicy::none());
    FixtureService::new(Arc::new(cache), Arc::new(source))
}

/// Concurrent dashboard requests for one past date reach upstream once, and
/// a restarted process serves the date from the durable tier
#[tokio::test]
async fn test_single_flight_then_durable_across_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .and(query_param("date", "2025-03-05"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({
                    "results": 3,
                    "response": [
                        fixture_json(1, "2025-03-05T12:00:00Z", "FT"),
                        fixture_json(2, "2025-03-05T15:00:00Z", "AET"),
                        fixture_json(3, "2025-03-05T18:00:00Z", "PEN"),
                    ]
                }))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let service = service_for(&server, store.clone());
    let day = "2025-03-05".parse().unwrap();

    let (a, b, c) = tokio::join!(
        service.fixtures_for_date(day),
        service.fixtures_for_date(day),
        service.fixtures_for_date(day)
    );
    for shown in [a, b, c] {
        assert_eq!(shown.unwrap().fixtures.len(), 3);
    }
    assert_eq!(service.cache().stats().await.persistent_size, 1);

    let restarted = service_for(&server, store);
    let shown = restarted.fixtures_for_date(day).await.unwrap();
    assert!(shown.from_cache);
    assert_eq!(shown.fixtures.len(), 3);
}

#[tokio::test]
async fn test_live_poll_bypasses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fixtures"))
        .and(query_param("live", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": [fixture_json(7, "2025-03-10T17:00:00Z", "2H")]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let service = service_for(&server, Arc::new(MemoryStore::new()));
    assert_eq!(service.live_fixtures().await.unwrap().len(), 1);
    assert_eq!(service.live_fixtures().await.unwrap().len(), 1);
    assert!(service.cache().get_fixture(7).await.is_none());
    assert_eq!(service.cache().stats().await.tracked_fixtures, 1);
}

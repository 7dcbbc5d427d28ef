//! Read-path fallback test: empty store -> upstream fetch -> persist ->
//! cached on the second request. Needs PostgreSQL and Redis; skips when
//! DATABASE_URL or REDIS_URL are not set.

use actix_web::{test, web, App};
use async_trait::async_trait;
use hotel_gateway_api::search::IndexStats;
use hotel_gateway_api::{
    handlers, ApiError, AppState, HotelDocument, HotelReadRepository, SearchEngine, SearchParams,
    SearchResult, Suggestion, SyncService,
};
use hotel_gateway_core::config::UpstreamConfig;
use hotel_gateway_core::{PropertyApiClient, RedisCache};
use hotel_gateway_worker::PostgresWorkerRepository;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingIndex {
    indexed: Mutex<Vec<HotelDocument>>,
}

#[async_trait]
impl SearchEngine for RecordingIndex {
    async fn index(&self, documents: &[HotelDocument]) -> Result<(), ApiError> {
        self.indexed.lock().unwrap().extend(documents.iter().cloned());
        Ok(())
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchResult, ApiError> {
        Ok(SearchResult {
            hotels: Vec::new(),
            total_hits: 0,
            page: params.page,
            limit: params.limit,
            total_pages: 0,
        })
    }

    async fn suggestions(&self, _query: &str, _limit: i64) -> Result<Vec<Suggestion>, ApiError> {
        Ok(Vec::new())
    }

    async fn update_hotel(&self, document: &HotelDocument) -> Result<(), ApiError> {
        self.indexed.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn delete_hotel(&self, _hotel_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn clear_index(&self) -> Result<(), ApiError> {
        self.indexed.lock().unwrap().clear();
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats, ApiError> {
        Ok(IndexStats {
            total_documents: self.indexed.lock().unwrap().len() as i64,
            last_updated: chrono::Utc::now(),
        })
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

async fn build_state(
    upstream_server: &MockServer,
) -> Option<(web::Data<AppState>, Arc<RecordingIndex>, sqlx::PgPool)> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let redis_url = std::env::var("REDIS_URL").ok()?;

    let pool = sqlx::PgPool::connect(&database_url).await.ok()?;
    sqlx::migrate!("../../migrations").run(&pool).await.ok()?;
    let cache = RedisCache::connect(&redis_url).await.ok()?;

    let upstream = Arc::new(
        PropertyApiClient::new(&UpstreamConfig {
            base_url: upstream_server.uri(),
            api_key: "test".to_string(),
            timeout_seconds: 5,
            rate_limit_per_second: 100,
            burst_limit: 100,
            max_retry_attempts: 0,
            retry_base_delay_ms: 1,
            breaker_max_failures: 5,
            breaker_reset_seconds: 60,
        })
        .unwrap(),
    );

    let index = Arc::new(RecordingIndex::default());
    let engine: Arc<dyn SearchEngine> = index.clone();
    let read_repo = HotelReadRepository::new(pool.clone());
    let sync = Arc::new(SyncService::new(
        read_repo.clone(),
        engine.clone(),
        cache.clone(),
        100,
        Duration::from_millis(1),
    ));

    let state = web::Data::new(AppState {
        read_repo,
        write_repo: Arc::new(PostgresWorkerRepository::new(pool.clone())),
        cache,
        upstream,
        index: engine,
        sync,
        hotel_cache_ttl: Duration::from_secs(300),
    });
    Some((state, index, pool))
}

#[actix_web::test]
async fn store_miss_falls_back_to_upstream_and_persists() {
    let server = MockServer::start().await;
    // Unique id per run keeps reruns against a shared database clean.
    let hotel_id: i64 = 8_000_000_000 + (uuid::Uuid::new_v4().as_u128() % 1_000_000) as i64;

    Mock::given(method("GET"))
        .and(path(format!("/property/{hotel_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hotel_id": hotel_id,
            "hotel_name": "Fallback Suites",
            "rating": 4.0,
            "stars": 4
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/property/reviews/{hotel_id}/10")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"review_id": hotel_id, "average_score": 8, "headline": "nice"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/property/{hotel_id}/lang/es")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hotel_id": hotel_id,
            "hotel_name": "Suites de Reserva"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/property/{hotel_id}/lang/fr")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let Some((state, index, pool)) = build_state(&server).await else {
        eprintln!("skipping: DATABASE_URL or REDIS_URL not set");
        return;
    };

    let app = test::init_service(
        App::new()
            .app_data(state.clone())
            .configure(handlers::configure),
    )
    .await;

    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/hotels/{hotel_id}"))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());

    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["hotel_id"], hotel_id);
    assert_eq!(body["data"]["name"], "Fallback Suites");
    assert_eq!(body["data"]["reviews"][0]["headline"], "nice");
    assert_eq!(body["data"]["translations"][0]["lang"], "es");

    // Persisted to the canonical store.
    let stored: Option<String> =
        sqlx::query_scalar("SELECT name FROM hotels WHERE hotel_id = $1")
            .bind(hotel_id)
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert_eq!(stored.as_deref(), Some("Fallback Suites"));

    // Second request is served from cache: the upstream mock expects
    // exactly one property call.
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/hotels/{hotel_id}"))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());

    // The detached index task had time to run.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(index
        .indexed
        .lock()
        .unwrap()
        .iter()
        .any(|doc| doc.hotel_id == hotel_id));

    sqlx::query("DELETE FROM hotels WHERE hotel_id = $1")
        .bind(hotel_id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM reviews WHERE hotel_id = $1")
        .bind(hotel_id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM translations WHERE hotel_id = $1")
        .bind(hotel_id)
        .execute(&pool)
        .await
        .unwrap();
}

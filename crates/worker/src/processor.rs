//! The per-job pipeline.
//!
//! For every delivered message: parse, take the per-entity advisory lock,
//! consult the cache, resolve the external identity, call the upstream
//! API, upsert the canonical store, refresh the cache, release the lock.
//! Lock contention and cache hits are successes (another owner already
//! did or is doing the work); errors bubble to the consumer, which routes
//! the message to the dead-letter queue.

use crate::ports::{CachePort, LockPort};
use crate::repository::WorkerRepository;
use crate::{Result, WorkerError};
use chrono::{Duration as ChronoDuration, Utc};
use hotel_gateway_core::config::TtlConfig;
use hotel_gateway_core::message::{JobMessage, MessageKind};
use hotel_gateway_core::{PropertyApiClient, EntityTtl};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// How a job concluded; everything here results in an ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Processed,
    /// Another worker holds the entity lock.
    SkippedLocked,
    /// The cache already carries fresh data for this entity.
    SkippedCached,
    /// No external identity could be resolved (row gone, id 0).
    SkippedMissingIdentity,
}

pub struct MessageProcessor {
    repository: Arc<dyn WorkerRepository>,
    upstream: Arc<PropertyApiClient>,
    cache: Arc<dyn CachePort>,
    lock: Arc<dyn LockPort>,
    ttl: TtlConfig,
}

impl MessageProcessor {
    pub fn new(
        repository: Arc<dyn WorkerRepository>,
        upstream: Arc<PropertyApiClient>,
        cache: Arc<dyn CachePort>,
        lock: Arc<dyn LockPort>,
        ttl: TtlConfig,
    ) -> Self {
        Self {
            repository,
            upstream,
            cache,
            lock,
            ttl,
        }
    }

    /// Decode and run one queue payload.
    pub async fn process(&self, payload: &str) -> Result<JobOutcome> {
        let message: JobMessage = serde_json::from_str(payload)?;
        info!(id = %message.id, kind = %message.kind, "processing job");

        let ttl = self.ttl.for_kind(message.kind);
        let lock_key = format!("hotel_lock_{}", message.id);

        let acquired = self
            .lock
            .acquire(&lock_key, Duration::from_secs(ttl.lock_seconds))
            .await
            .map_err(WorkerError::Lock)?;
        if !acquired {
            warn!(id = %message.id, kind = %message.kind, "already being processed elsewhere, skipping");
            return Ok(JobOutcome::SkippedLocked);
        }

        let result = self.handle(&message, ttl).await;

        // Best-effort: the TTL bounds a lock we fail to release.
        if let Err(e) = self.lock.release(&lock_key).await {
            warn!(id = %message.id, error = %e, "failed to release lock");
        }

        if let Ok(outcome) = &result {
            info!(id = %message.id, kind = %message.kind, ?outcome, "job finished");
        }
        result
    }

    async fn handle(&self, message: &JobMessage, ttl: EntityTtl) -> Result<JobOutcome> {
        match message.kind {
            MessageKind::UpdateHotel => self.process_hotel(message, ttl).await,
            MessageKind::UpdateReview | MessageKind::FetchReview => {
                self.process_reviews(message, ttl).await
            }
            MessageKind::UpdateTranslation | MessageKind::FetchTranslation => {
                self.process_translation(message, ttl).await
            }
        }
    }

    /// Cache probe; cache failures count as misses.
    async fn cached(&self, key: &str) -> bool {
        match self.cache.get_json(key).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                false
            }
        }
    }

    /// Cache write failures after a successful fetch are warnings only.
    async fn cache_response(&self, key: &str, value: &serde_json::Value, ttl: EntityTtl) {
        if let Err(e) = self
            .cache
            .set_json(key, value, Duration::from_secs(ttl.cache_seconds))
            .await
        {
            warn!(key, error = %e, "failed to cache upstream response");
        }
    }

    fn hotel_id_from_data(message: &JobMessage) -> Option<i64> {
        message
            .data
            .hotel_id
            .as_deref()
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|id| *id > 0)
    }

    async fn process_hotel(&self, message: &JobMessage, ttl: EntityTtl) -> Result<JobOutcome> {
        let cache_key = format!("hotel_data_{}", message.id);
        if self.cached(&cache_key).await {
            info!(id = %message.id, "using cached hotel data");
            return Ok(JobOutcome::SkippedCached);
        }

        let hotel_id = self.repository.hotel_id_by_pk(&message.id).await?;
        if hotel_id == 0 {
            return Ok(JobOutcome::SkippedMissingIdentity);
        }

        let response = self.upstream.fetch_hotel(hotel_id).await?;
        let raw = serde_json::to_value(&response)?;

        let next_update_at = Utc::now() + ChronoDuration::seconds(ttl.next_update_seconds);
        let hotel = response.into_hotel_record(next_update_at);
        self.repository.upsert_hotel(&hotel).await?;

        self.cache_response(&cache_key, &raw, ttl).await;
        info!(id = %message.id, hotel_id, next_update_at = %next_update_at.to_rfc3339(), "hotel persisted");
        Ok(JobOutcome::Processed)
    }

    async fn process_reviews(&self, message: &JobMessage, ttl: EntityTtl) -> Result<JobOutcome> {
        let cache_key = format!("reviews_data_{}", message.id);
        if self.cached(&cache_key).await {
            info!(id = %message.id, "using cached reviews");
            return Ok(JobOutcome::SkippedCached);
        }

        let (hotel_id, review_count) = if message.kind == MessageKind::FetchReview {
            let hotel_id = Self::hotel_id_from_data(message).ok_or_else(|| {
                WorkerError::InvalidJob("fetch_review job without hotel_id".to_string())
            })?;
            (hotel_id, 10)
        } else {
            let hotel_id = self.repository.hotel_id_from_review_by_pk(&message.id).await?;
            if hotel_id == 0 {
                return Ok(JobOutcome::SkippedMissingIdentity);
            }
            let review_count = self.repository.review_count_by_hotel_id(hotel_id).await?;
            if review_count == 0 {
                return Ok(JobOutcome::SkippedMissingIdentity);
            }
            (hotel_id, review_count)
        };

        let fetched = self.upstream.fetch_reviews(hotel_id, review_count).await?;
        let raw = serde_json::to_value(&fetched)?;

        let next_update_at = Utc::now() + ChronoDuration::seconds(ttl.next_update_seconds);
        let mut persisted = 0usize;
        for response in fetched {
            let mut review = response.into_review_record(hotel_id, next_update_at);
            // Re-fetches keep the original row identity.
            match self.repository.review_by_review_id(review.review_id).await? {
                Some(existing) => {
                    review.id = existing.id;
                    review.created_at = existing.created_at;
                    self.repository.update_review(&review).await?;
                }
                None => self.repository.create_review(&review).await?,
            }
            persisted += 1;
        }

        self.cache_response(&cache_key, &raw, ttl).await;
        info!(id = %message.id, hotel_id, count = persisted, "reviews persisted");
        Ok(JobOutcome::Processed)
    }

    async fn process_translation(&self, message: &JobMessage, ttl: EntityTtl) -> Result<JobOutcome> {
        let cache_key = format!("translations_data_{}", message.id);
        if self.cached(&cache_key).await {
            info!(id = %message.id, "using cached translations data");
            return Ok(JobOutcome::SkippedCached);
        }

        let hotel_id_raw = message.data.hotel_id.clone().ok_or_else(|| {
            WorkerError::InvalidJob("translation job without hotel_id".to_string())
        })?;

        let lang = if message.kind == MessageKind::FetchTranslation {
            message.data.lang.clone().unwrap_or_default()
        } else {
            self.repository
                .translation_lang_by_pk(&message.id)
                .await?
                .unwrap_or_default()
        };
        if lang.is_empty() {
            return Err(WorkerError::InvalidJob("lang is empty".to_string()));
        }

        let response = self.upstream.fetch_translation(&hotel_id_raw, &lang).await?;
        let raw = serde_json::to_value(&response)?;

        let hotel_id = if response.hotel_id > 0 {
            response.hotel_id
        } else {
            hotel_id_raw.parse::<i64>().map_err(|_| {
                WorkerError::InvalidJob(format!("invalid hotel_id '{}'", hotel_id_raw))
            })?
        };

        let next_update_at = Utc::now() + ChronoDuration::seconds(ttl.next_update_seconds);
        let translation = response.into_translation_record(hotel_id, &lang, next_update_at);
        self.repository.upsert_translation(&translation).await?;

        self.cache_response(&cache_key, &raw, ttl).await;
        info!(id = %message.id, hotel_id, lang = %lang, next_update_at = %next_update_at.to_rfc3339(), "translation persisted");
        Ok(JobOutcome::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hotel_gateway_core::config::UpstreamConfig;
    use hotel_gateway_core::{CacheError, HotelRecord, ReviewRecord, TranslationRecord};
    use serde_json::Value;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct MockCache {
        entries: Mutex<HashMap<String, Value>>,
    }

    #[async_trait]
    impl CachePort for MockCache {
        async fn get_json(&self, key: &str) -> std::result::Result<Option<Value>, CacheError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_json(
            &self,
            key: &str,
            value: &Value,
            _ttl: Duration,
        ) -> std::result::Result<(), CacheError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockLock {
        held: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl LockPort for MockLock {
        async fn acquire(&self, key: &str, _ttl: Duration) -> std::result::Result<bool, CacheError> {
            Ok(self.held.lock().unwrap().insert(key.to_string()))
        }

        async fn release(&self, key: &str) -> std::result::Result<(), CacheError> {
            self.held.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockRepository {
        hotel_ids: Mutex<HashMap<String, i64>>,
        review_hotel_ids: Mutex<HashMap<String, i64>>,
        review_counts: Mutex<HashMap<i64, i64>>,
        reviews_by_review_id: Mutex<HashMap<i64, ReviewRecord>>,
        translation_langs: Mutex<HashMap<String, String>>,
        upserted_hotels: Mutex<Vec<HotelRecord>>,
        upserted_translations: Mutex<Vec<TranslationRecord>>,
        created_reviews: Mutex<Vec<ReviewRecord>>,
        updated_reviews: Mutex<Vec<ReviewRecord>>,
    }

    #[async_trait]
    impl WorkerRepository for MockRepository {
        async fn hotel_id_by_pk(&self, id: &str) -> std::result::Result<i64, sqlx::Error> {
            Ok(*self.hotel_ids.lock().unwrap().get(id).unwrap_or(&0))
        }

        async fn hotel_id_from_review_by_pk(&self, id: &str) -> std::result::Result<i64, sqlx::Error> {
            Ok(*self.review_hotel_ids.lock().unwrap().get(id).unwrap_or(&0))
        }

        async fn review_count_by_hotel_id(&self, hotel_id: i64) -> std::result::Result<i64, sqlx::Error> {
            Ok(*self.review_counts.lock().unwrap().get(&hotel_id).unwrap_or(&0))
        }

        async fn review_by_review_id(
            &self,
            review_id: i64,
        ) -> std::result::Result<Option<ReviewRecord>, sqlx::Error> {
            Ok(self
                .reviews_by_review_id
                .lock()
                .unwrap()
                .get(&review_id)
                .cloned())
        }

        async fn create_review(&self, review: &ReviewRecord) -> std::result::Result<(), sqlx::Error> {
            self.created_reviews.lock().unwrap().push(review.clone());
            Ok(())
        }

        async fn update_review(&self, review: &ReviewRecord) -> std::result::Result<(), sqlx::Error> {
            self.updated_reviews.lock().unwrap().push(review.clone());
            Ok(())
        }

        async fn translation_lang_by_pk(&self, id: &str) -> std::result::Result<Option<String>, sqlx::Error> {
            Ok(self.translation_langs.lock().unwrap().get(id).cloned())
        }

        async fn upsert_hotel(&self, hotel: &HotelRecord) -> std::result::Result<(), sqlx::Error> {
            self.upserted_hotels.lock().unwrap().push(hotel.clone());
            Ok(())
        }

        async fn upsert_translation(
            &self,
            translation: &TranslationRecord,
        ) -> std::result::Result<(), sqlx::Error> {
            self.upserted_translations
                .lock()
                .unwrap()
                .push(translation.clone());
            Ok(())
        }
    }

    fn upstream_client(server: &MockServer) -> Arc<PropertyApiClient> {
        Arc::new(
            PropertyApiClient::new(&UpstreamConfig {
                base_url: server.uri(),
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
        )
    }

    struct Fixture {
        processor: MessageProcessor,
        repository: Arc<MockRepository>,
        cache: Arc<MockCache>,
        lock: Arc<MockLock>,
    }

    fn fixture(server: &MockServer) -> Fixture {
        let repository = Arc::new(MockRepository::default());
        let cache = Arc::new(MockCache::default());
        let lock = Arc::new(MockLock::default());
        let mut ttl = TtlConfig::default();
        ttl.hotels.next_update_seconds = 3600;
        ttl.reviews.next_update_seconds = 7200;
        ttl.translations.next_update_seconds = 10_800;

        let processor = MessageProcessor::new(
            repository.clone(),
            upstream_client(server),
            cache.clone(),
            lock.clone(),
            ttl,
        );
        Fixture {
            processor,
            repository,
            cache,
            lock,
        }
    }

    fn job_json(id: &str, kind: &str, hotel_id: Option<&str>, lang: Option<&str>) -> String {
        let mut data = serde_json::Map::new();
        if let Some(hotel_id) = hotel_id {
            data.insert("hotel_id".to_string(), Value::String(hotel_id.to_string()));
        }
        if let Some(lang) = lang {
            data.insert("lang".to_string(), Value::String(lang.to_string()));
        }
        serde_json::json!({"id": id, "type": kind, "data": data}).to_string()
    }

    #[tokio::test]
    async fn update_hotel_fetches_upserts_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/1641879"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hotel_id": 1641879,
                "hotel_name": "Orange Riverside",
                "stars": 4,
                "rating": 4.3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .repository
            .hotel_ids
            .lock()
            .unwrap()
            .insert("row-1".to_string(), 1641879);
        let before = Utc::now();
        let payload = job_json("row-1", "update_hotel", Some("1641879"), None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::Processed);

        let hotels = fixture.repository.upserted_hotels.lock().unwrap();
        assert_eq!(hotels.len(), 1);
        assert_eq!(hotels[0].hotel_id, 1641879);
        assert!(hotels[0].next_update_at >= before + ChronoDuration::seconds(3600));

        let cache = fixture.cache.entries.lock().unwrap();
        assert!(cache.contains_key("hotel_data_row-1"));

        // Lock released after the run.
        assert!(fixture.lock.held.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lock_contention_skips_without_an_upstream_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .lock
            .held
            .lock()
            .unwrap()
            .insert("hotel_lock_row-1".to_string());

        let payload = job_json("row-1", "update_hotel", Some("1"), None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::SkippedLocked);
        assert!(fixture.repository.upserted_hotels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_hit_means_nothing_to_do() {
        let server = MockServer::start().await;
        let fixture = fixture(&server);
        fixture
            .cache
            .entries
            .lock()
            .unwrap()
            .insert("hotel_data_row-1".to_string(), serde_json::json!({}));

        let payload = job_json("row-1", "update_hotel", Some("1"), None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::SkippedCached);
        // Lock was taken then released.
        assert!(fixture.lock.held.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_identity_is_treated_as_success() {
        let server = MockServer::start().await;
        let fixture = fixture(&server);
        // No row in the store for this id.
        let payload = job_json("row-gone", "update_hotel", None, None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::SkippedMissingIdentity);
    }

    #[tokio::test]
    async fn update_hotel_resolves_identity_from_the_store() {
        let server = MockServer::start().await;
        // The store is authoritative: the upstream call must use the row's
        // hotel_id even when the job payload carries a different one.
        Mock::given(method("GET"))
            .and(path("/property/555"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hotel_id": 555,
                "hotel_name": "Store Truth"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .repository
            .hotel_ids
            .lock()
            .unwrap()
            .insert("row-1".to_string(), 555);

        let payload = job_json("row-1", "update_hotel", Some("999"), None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::Processed);

        let hotels = fixture.repository.upserted_hotels.lock().unwrap();
        assert_eq!(hotels.len(), 1);
        assert_eq!(hotels[0].hotel_id, 555);
    }

    #[tokio::test]
    async fn upstream_404_bubbles_and_releases_the_lock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .repository
            .hotel_ids
            .lock()
            .unwrap()
            .insert("row-1".to_string(), 99);
        let payload = job_json("row-1", "update_hotel", Some("99"), None);
        let err = fixture.processor.process(&payload).await.unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Upstream(hotel_gateway_core::UpstreamError::NotFound)
        ));
        assert!(fixture.repository.upserted_hotels.lock().unwrap().is_empty());
        assert!(fixture.cache.entries.lock().unwrap().is_empty());
        assert!(fixture.lock.held.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refetched_reviews_keep_their_row_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/reviews/317597/10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"review_id": 900123, "average_score": 9, "headline": "great"},
                {"review_id": 900124, "average_score": 7, "headline": "fine"}
            ])))
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        let existing = {
            let mut existing = ReviewRecord::new(317597, 900123);
            existing.id = "original-row-id".to_string();
            existing
        };
        fixture
            .repository
            .reviews_by_review_id
            .lock()
            .unwrap()
            .insert(900123, existing);

        let payload = job_json("row-r", "fetch_review", Some("317597"), None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::Processed);

        let updated = fixture.repository.updated_reviews.lock().unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, "original-row-id");
        assert_eq!(updated[0].review_id, 900123);

        let created = fixture.repository.created_reviews.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].review_id, 900124);
    }

    #[tokio::test]
    async fn update_review_resolves_identity_from_the_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/reviews/42/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .repository
            .review_hotel_ids
            .lock()
            .unwrap()
            .insert("row-r".to_string(), 42);
        fixture.repository.review_counts.lock().unwrap().insert(42, 3);

        let payload = job_json("row-r", "update_review", None, None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::Processed);
    }

    #[tokio::test]
    async fn fetch_translation_uses_job_data_for_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/317597/lang/es"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hotel_id": 317597,
                "hotel_name": "Hotel del Mar",
                "description": "Un hotel junto al mar"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        let payload = job_json("317597_es", "fetch_translation", Some("317597"), Some("es"));
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::Processed);

        let translations = fixture.repository.upserted_translations.lock().unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].hotel_id, 317597);
        assert_eq!(translations[0].lang, "es");
        assert_eq!(translations[0].name, "Hotel del Mar");
    }

    #[tokio::test]
    async fn update_translation_reads_lang_from_the_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/1202743/lang/fr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hotel_id": 1202743,
                "hotel_name": "Hôtel du Parc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .repository
            .translation_langs
            .lock()
            .unwrap()
            .insert("row-t".to_string(), "fr".to_string());

        let payload = job_json("row-t", "update_translation", Some("1202743"), None);
        let outcome = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(outcome, JobOutcome::Processed);
    }

    #[tokio::test]
    async fn translation_without_lang_is_invalid() {
        let server = MockServer::start().await;
        let fixture = fixture(&server);
        let payload = job_json("row-t", "update_translation", Some("1"), None);
        let err = fixture.processor.process(&payload).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidJob(_)));
    }

    #[tokio::test]
    async fn undecodable_payloads_error_out() {
        let server = MockServer::start().await;
        let fixture = fixture(&server);
        let err = fixture.processor.process("{not json").await.unwrap_err();
        assert!(matches!(err, WorkerError::Decode(_)));

        let err = fixture
            .processor
            .process(&job_json("x", "mystery_kind", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Decode(_)));
    }

    #[tokio::test]
    async fn idempotent_runs_converge_on_the_same_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/property/1641879"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hotel_id": 1641879,
                "hotel_name": "Orange Riverside"
            })))
            .mount(&server)
            .await;

        let fixture = fixture(&server);
        fixture
            .repository
            .hotel_ids
            .lock()
            .unwrap()
            .insert("row-1".to_string(), 1641879);
        let payload = job_json("row-1", "update_hotel", Some("1641879"), None);

        let first = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(first, JobOutcome::Processed);
        // Second run sees the cache and does nothing.
        let second = fixture.processor.process(&payload).await.unwrap();
        assert_eq!(second, JobOutcome::SkippedCached);
        assert_eq!(fixture.repository.upserted_hotels.lock().unwrap().len(), 1);
    }
}

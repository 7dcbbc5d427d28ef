//! Index synchronization from the canonical store.

use crate::repository::HotelReadRepository;
use crate::search::{HotelDocument, SearchEngine};
use crate::{ApiError, Result};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use hotel_gateway_core::RedisCache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const FULL_SYNC_PAGE: i64 = 1000;
const LAST_SYNC_CACHE_KEY: &str = "last_sync_time";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub full_sync: bool,
    pub batch_size: usize,
    pub since: Option<DateTime<Utc>>,
    pub update_cache_after: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub total_hotels: usize,
    pub indexed_hotels: usize,
    pub failed_hotels: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub errors: Vec<String>,
}

pub struct SyncService {
    repository: HotelReadRepository,
    index: Arc<dyn SearchEngine>,
    cache: RedisCache,
    batch_pause: Duration,
    default_batch_size: usize,
}

impl SyncService {
    pub fn new(
        repository: HotelReadRepository,
        index: Arc<dyn SearchEngine>,
        cache: RedisCache,
        default_batch_size: usize,
        batch_pause: Duration,
    ) -> Self {
        Self {
            repository,
            index,
            cache,
            batch_pause,
            default_batch_size,
        }
    }

    /// Full or incremental backfill into the index. Index failures are
    /// counted per batch, never fatal to the run.
    pub async fn execute(&self, options: SyncOptions) -> Result<SyncReport> {
        let started_at = Utc::now();
        let batch_size = if options.batch_size > 0 {
            options.batch_size
        } else {
            self.default_batch_size
        };
        let mut errors = Vec::new();

        info!(
            full_sync = options.full_sync,
            batch_size,
            since = ?options.since,
            "starting hotel synchronization"
        );

        if options.full_sync {
            if let Err(e) = self.index.clear_index().await {
                error!(error = %e, "failed to clear search index");
                errors.push(format!("failed to clear index: {}", e));
            }
        }

        let hotels = if options.full_sync {
            self.load_all_hotels().await?
        } else {
            let since = options
                .since
                .unwrap_or_else(|| Utc::now() - ChronoDuration::days(30));
            self.repository
                .find_updated_after(since)
                .await
                .map_err(ApiError::Database)?
        };

        let total_hotels = hotels.len();
        info!(count = total_hotels, "hotels fetched from database");

        let mut indexed = 0usize;
        let mut failed = 0usize;
        for batch in hotels.chunks(batch_size.max(1)) {
            let documents: Vec<HotelDocument> =
                batch.iter().map(HotelDocument::from_record).collect();
            match self.index.index(&documents).await {
                Ok(()) => indexed += batch.len(),
                Err(e) => {
                    warn!(error = %e, batch_len = batch.len(), "failed to index batch");
                    errors.push(format!("batch failed: {}", e));
                    failed += batch.len();
                }
            }
            tokio::time::sleep(self.batch_pause).await;
        }

        let finished_at = Utc::now();
        if options.update_cache_after {
            if let Err(e) = self
                .cache
                .set(LAST_SYNC_CACHE_KEY, &finished_at, Duration::from_secs(86_400))
                .await
            {
                warn!(error = %e, "failed to cache last sync time");
            }
        }

        let report = SyncReport {
            total_hotels,
            indexed_hotels: indexed,
            failed_hotels: failed,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            started_at,
            finished_at,
            errors,
        };

        info!(
            total = report.total_hotels,
            indexed = report.indexed_hotels,
            failed = report.failed_hotels,
            duration_ms = report.duration_ms,
            "hotel synchronization completed"
        );
        Ok(report)
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.cache.get(LAST_SYNC_CACHE_KEY).await.ok().flatten()
    }

    async fn load_all_hotels(&self) -> Result<Vec<hotel_gateway_core::HotelRecord>> {
        let mut all = Vec::new();
        let mut offset = 0i64;
        loop {
            let page = self
                .repository
                .find_all(FULL_SYNC_PAGE, offset)
                .await
                .map_err(ApiError::Database)?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len() as i64;
            offset += page_len;
            all.extend(page);
            if page_len < FULL_SYNC_PAGE {
                break;
            }
        }
        Ok(all)
    }
}

/// Accepts RFC3339, common date formats and unix seconds.
pub fn parse_since_timestamp(raw: &serde_json::Value) -> Option<DateTime<Utc>> {
    match raw {
        serde_json::Value::Number(n) => {
            let seconds = n.as_i64()?;
            Utc.timestamp_opt(seconds, 0).single()
        }
        serde_json::Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date
                    .and_hms_opt(0, 0, 0)
                    .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc));
            }
            if let Ok(seconds) = s.parse::<i64>() {
                return Utc.timestamp_opt(seconds, 0).single();
            }
            None
        }
        _ => None,
    }
}

//! Read-side store access for the API.
//!
//! Writes on the fallback path go through the shared worker repository
//! (the same upsert semantics the pipeline uses), so the read API never
//! grows a second, subtly different persistence layer.

use chrono::{DateTime, Utc};
use hotel_gateway_core::{HotelRecord, ReviewRecord, TranslationRecord};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A hotel with its attached relations, as served to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelView {
    #[serde(flatten)]
    pub hotel: HotelRecord,
    pub reviews: Vec<ReviewRecord>,
    pub translations: Vec<TranslationRecord>,
}

#[derive(Clone)]
pub struct HotelReadRepository {
    pool: PgPool,
}

impl HotelReadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hotel by external identity, with up to `reviews_limit` reviews and
    /// all translations.
    pub async fn find_by_hotel_id(
        &self,
        hotel_id: i64,
        reviews_limit: i64,
    ) -> Result<Option<HotelView>, sqlx::Error> {
        let hotel = sqlx::query_as::<_, HotelRecord>(
            "SELECT * FROM hotels WHERE hotel_id = $1 AND deleted_at IS NULL",
        )
        .bind(hotel_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(hotel) = hotel else {
            return Ok(None);
        };

        let reviews = sqlx::query_as::<_, ReviewRecord>(
            "SELECT * FROM reviews \
             WHERE hotel_id = $1 AND deleted_at IS NULL \
             ORDER BY date DESC LIMIT $2",
        )
        .bind(hotel_id)
        .bind(reviews_limit.max(1))
        .fetch_all(&self.pool)
        .await?;

        let translations = sqlx::query_as::<_, TranslationRecord>(
            "SELECT * FROM translations \
             WHERE hotel_id = $1 AND deleted_at IS NULL \
             ORDER BY lang ASC",
        )
        .bind(hotel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(HotelView {
            hotel,
            reviews,
            translations,
        }))
    }

    /// Hotels touched after `since`, for incremental index sync.
    pub async fn find_updated_after(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HotelRecord>, sqlx::Error> {
        sqlx::query_as::<_, HotelRecord>(
            "SELECT * FROM hotels \
             WHERE updated_at > $1 AND deleted_at IS NULL \
             ORDER BY hotel_id ASC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    /// One page of the whole table, for full index sync.
    pub async fn find_all(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<HotelRecord>, sqlx::Error> {
        sqlx::query_as::<_, HotelRecord>(
            "SELECT * FROM hotels \
             WHERE deleted_at IS NULL \
             ORDER BY hotel_id ASC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }
}

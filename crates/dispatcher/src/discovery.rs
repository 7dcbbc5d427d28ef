//! Keyset-paginated discovery of eligible entities.
//!
//! Every query orders by `hotel_id ASC` (plus `lang ASC` where a language
//! is part of the identity) and takes the last seen `hotel_id` as the
//! cursor, so a scan stays stable under the concurrent updates the worker
//! pool makes while a dispatch is running.

use async_trait::async_trait;
use hotel_gateway_core::DESIRED_LANGS;
use sqlx::{FromRow, PgPool};

/// A row due for a refresh job.
#[derive(Debug, Clone, FromRow)]
pub struct EligibleRow {
    pub id: String,
    pub hotel_id: i64,
}

/// A `(hotel, lang)` pair with no translation row yet.
#[derive(Debug, Clone, FromRow)]
pub struct MissingTranslation {
    pub hotel_id: i64,
    pub missing_lang: String,
}

/// Discovery seam so the orchestrator can be driven by an in-memory
/// double in tests.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Hotels whose `next_update_at` has passed.
    async fn due_hotels(&self, last_hotel_id: i64, limit: i64)
        -> Result<Vec<EligibleRow>, sqlx::Error>;

    /// Reviews whose `next_update_at` has passed.
    async fn due_reviews(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error>;

    /// Translations whose `next_update_at` has passed.
    async fn due_translations(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error>;

    /// Hotels lacking a translation for one of the desired languages.
    async fn missing_translations(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<MissingTranslation>, sqlx::Error>;

    /// Hotels with zero review rows.
    async fn hotels_without_reviews(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error>;
}

pub struct PostgresJobSource {
    pool: PgPool,
}

impl PostgresJobSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn due_rows(
        &self,
        table: &str,
        order: &str,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error> {
        let sql = format!(
            "SELECT id, hotel_id FROM {table} \
             WHERE next_update_at < NOW() AND hotel_id > 0 AND hotel_id > $1 \
             ORDER BY {order} LIMIT $2"
        );
        sqlx::query_as::<_, EligibleRow>(&sql)
            .bind(last_hotel_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}

/// The missing-translation anti-join: one branch per desired language,
/// unioned and re-sorted so the `(hotel_id, lang)` keyset order holds.
fn missing_translations_sql() -> String {
    let branches: Vec<String> = DESIRED_LANGS
        .iter()
        .map(|lang| {
            format!(
                "SELECT h.hotel_id AS hotel_id, '{lang}' AS missing_lang \
                 FROM hotels h \
                 WHERE NOT EXISTS (\
                     SELECT 1 FROM translations t \
                     WHERE t.hotel_id = h.hotel_id AND t.lang = '{lang}'\
                 ) AND h.hotel_id > 0 AND h.hotel_id > $1"
            )
        })
        .collect();

    format!(
        "SELECT hotel_id, missing_lang FROM ({}) AS combined \
         ORDER BY hotel_id ASC, missing_lang ASC LIMIT $2",
        branches.join(" UNION ALL ")
    )
}

#[async_trait]
impl JobSource for PostgresJobSource {
    async fn due_hotels(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error> {
        self.due_rows("hotels", "hotel_id ASC", last_hotel_id, limit).await
    }

    async fn due_reviews(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error> {
        self.due_rows("reviews", "hotel_id ASC", last_hotel_id, limit).await
    }

    async fn due_translations(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error> {
        self.due_rows("translations", "hotel_id ASC, lang ASC", last_hotel_id, limit)
            .await
    }

    async fn missing_translations(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<MissingTranslation>, sqlx::Error> {
        sqlx::query_as::<_, MissingTranslation>(&missing_translations_sql())
            .bind(last_hotel_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }

    async fn hotels_without_reviews(
        &self,
        last_hotel_id: i64,
        limit: i64,
    ) -> Result<Vec<EligibleRow>, sqlx::Error> {
        sqlx::query_as::<_, EligibleRow>(
            "SELECT h.id AS id, h.hotel_id AS hotel_id \
             FROM hotels h \
             WHERE NOT EXISTS (SELECT 1 FROM reviews r WHERE r.hotel_id = h.hotel_id) \
               AND h.hotel_id > 0 AND h.hotel_id > $1 \
             ORDER BY h.hotel_id ASC LIMIT $2",
        )
        .bind(last_hotel_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_join_covers_every_desired_language() {
        let sql = missing_translations_sql();
        for lang in DESIRED_LANGS {
            assert!(sql.contains(&format!("t.lang = '{lang}'")));
        }
        assert!(sql.contains("ORDER BY hotel_id ASC, missing_lang ASC"));
        assert!(sql.contains("UNION ALL"));
    }
}

//! Canonical-store access for the job handlers.

use async_trait::async_trait;
use hotel_gateway_core::{HotelRecord, ReviewRecord, TranslationRecord};
use sqlx::PgPool;

/// The queries the per-job pipeline needs. A trait seam so the processor
/// can be exercised against an in-memory double.
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    /// External hotel identity for a hotel row; 0 when the row is missing.
    async fn hotel_id_by_pk(&self, id: &str) -> Result<i64, sqlx::Error>;

    /// External hotel identity recorded on a review row; 0 when missing.
    async fn hotel_id_from_review_by_pk(&self, id: &str) -> Result<i64, sqlx::Error>;

    async fn review_count_by_hotel_id(&self, hotel_id: i64) -> Result<i64, sqlx::Error>;

    async fn review_by_review_id(&self, review_id: i64)
        -> Result<Option<ReviewRecord>, sqlx::Error>;

    async fn create_review(&self, review: &ReviewRecord) -> Result<(), sqlx::Error>;

    /// Update in place, preserving the row's `id` and `created_at`.
    async fn update_review(&self, review: &ReviewRecord) -> Result<(), sqlx::Error>;

    /// Language recorded on a translation row, if the row exists.
    async fn translation_lang_by_pk(&self, id: &str) -> Result<Option<String>, sqlx::Error>;

    async fn upsert_hotel(&self, hotel: &HotelRecord) -> Result<(), sqlx::Error>;

    async fn upsert_translation(&self, translation: &TranslationRecord)
        -> Result<(), sqlx::Error>;
}

pub struct PostgresWorkerRepository {
    pool: PgPool,
}

impl PostgresWorkerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerRepository for PostgresWorkerRepository {
    async fn hotel_id_by_pk(&self, id: &str) -> Result<i64, sqlx::Error> {
        let hotel_id: Option<i64> =
            sqlx::query_scalar("SELECT hotel_id FROM hotels WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hotel_id.unwrap_or(0))
    }

    async fn hotel_id_from_review_by_pk(&self, id: &str) -> Result<i64, sqlx::Error> {
        let hotel_id: Option<i64> =
            sqlx::query_scalar("SELECT hotel_id FROM reviews WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hotel_id.unwrap_or(0))
    }

    async fn review_count_by_hotel_id(&self, hotel_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE hotel_id = $1 AND deleted_at IS NULL")
            .bind(hotel_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn review_by_review_id(
        &self,
        review_id: i64,
    ) -> Result<Option<ReviewRecord>, sqlx::Error> {
        sqlx::query_as::<_, ReviewRecord>("SELECT * FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_review(&self, review: &ReviewRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, hotel_id, review_id, average_score, country, type, name,
                date, headline, language, pros, cons, source,
                created_at, updated_at, next_update_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW(), NOW(), $14)
            "#,
        )
        .bind(&review.id)
        .bind(review.hotel_id)
        .bind(review.review_id)
        .bind(review.average_score)
        .bind(&review.country)
        .bind(&review.review_type)
        .bind(&review.name)
        .bind(review.date)
        .bind(&review.headline)
        .bind(&review.language)
        .bind(&review.pros)
        .bind(&review.cons)
        .bind(&review.source)
        .bind(review.next_update_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_review(&self, review: &ReviewRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE reviews SET
                hotel_id = $2,
                review_id = $3,
                average_score = $4,
                country = $5,
                type = $6,
                name = $7,
                date = $8,
                headline = $9,
                language = $10,
                pros = $11,
                cons = $12,
                source = $13,
                updated_at = NOW(),
                next_update_at = $14
            WHERE id = $1
            "#,
        )
        .bind(&review.id)
        .bind(review.hotel_id)
        .bind(review.review_id)
        .bind(review.average_score)
        .bind(&review.country)
        .bind(&review.review_type)
        .bind(&review.name)
        .bind(review.date)
        .bind(&review.headline)
        .bind(&review.language)
        .bind(&review.pros)
        .bind(&review.cons)
        .bind(&review.source)
        .bind(review.next_update_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn translation_lang_by_pk(&self, id: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT lang FROM translations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert_hotel(&self, hotel: &HotelRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO hotels (
                id, hotel_id, cupid_id, hotel_type_id, name, description,
                markdown_description, important_info, address, rating,
                star_rating, latitude, longitude, amenities, policies,
                contact_info, status, source, main_image_th, hotel_type,
                chain, chain_id, phone, fax, email, airport_code,
                review_count, checkin, parking, group_room_min,
                child_allowed, pets_allowed, photos, facilities, rooms,
                created_at, updated_at, next_update_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32, $33, $34, $35, NOW(), NOW(), $36
            )
            ON CONFLICT (hotel_id) DO UPDATE SET
                cupid_id = EXCLUDED.cupid_id,
                hotel_type_id = EXCLUDED.hotel_type_id,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                markdown_description = EXCLUDED.markdown_description,
                important_info = EXCLUDED.important_info,
                address = EXCLUDED.address,
                rating = EXCLUDED.rating,
                star_rating = EXCLUDED.star_rating,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                amenities = EXCLUDED.amenities,
                policies = EXCLUDED.policies,
                contact_info = EXCLUDED.contact_info,
                status = CASE WHEN hotels.deleted_at IS NULL THEN 'active' ELSE hotels.status END,
                main_image_th = EXCLUDED.main_image_th,
                hotel_type = EXCLUDED.hotel_type,
                chain = EXCLUDED.chain,
                chain_id = EXCLUDED.chain_id,
                phone = EXCLUDED.phone,
                fax = EXCLUDED.fax,
                email = EXCLUDED.email,
                airport_code = EXCLUDED.airport_code,
                review_count = EXCLUDED.review_count,
                checkin = EXCLUDED.checkin,
                parking = EXCLUDED.parking,
                group_room_min = EXCLUDED.group_room_min,
                child_allowed = EXCLUDED.child_allowed,
                pets_allowed = EXCLUDED.pets_allowed,
                photos = EXCLUDED.photos,
                facilities = EXCLUDED.facilities,
                rooms = EXCLUDED.rooms,
                updated_at = NOW(),
                next_update_at = EXCLUDED.next_update_at
            "#,
        )
        .bind(&hotel.id)
        .bind(hotel.hotel_id)
        .bind(hotel.cupid_id)
        .bind(hotel.hotel_type_id)
        .bind(&hotel.name)
        .bind(&hotel.description)
        .bind(&hotel.markdown_description)
        .bind(&hotel.important_info)
        .bind(&hotel.address)
        .bind(hotel.rating)
        .bind(hotel.star_rating)
        .bind(hotel.latitude)
        .bind(hotel.longitude)
        .bind(&hotel.amenities)
        .bind(&hotel.policies)
        .bind(&hotel.contact_info)
        .bind(&hotel.status)
        .bind(&hotel.source)
        .bind(&hotel.main_image_th)
        .bind(&hotel.hotel_type)
        .bind(&hotel.chain)
        .bind(hotel.chain_id)
        .bind(&hotel.phone)
        .bind(&hotel.fax)
        .bind(&hotel.email)
        .bind(&hotel.airport_code)
        .bind(hotel.review_count)
        .bind(&hotel.checkin)
        .bind(&hotel.parking)
        .bind(&hotel.group_room_min)
        .bind(hotel.child_allowed)
        .bind(hotel.pets_allowed)
        .bind(&hotel.photos)
        .bind(&hotel.facilities)
        .bind(&hotel.rooms)
        .bind(hotel.next_update_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_translation(
        &self,
        translation: &TranslationRecord,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO translations (
                id, hotel_id, lang, name, description, markdown_description,
                important_info, address, policies, contact_info, status,
                source, chain, checkin, parking, group_room_min, photos,
                facilities, rooms, created_at, updated_at, next_update_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, NOW(), NOW(), $20
            )
            ON CONFLICT (hotel_id, lang) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                markdown_description = EXCLUDED.markdown_description,
                important_info = EXCLUDED.important_info,
                address = EXCLUDED.address,
                policies = EXCLUDED.policies,
                contact_info = EXCLUDED.contact_info,
                status = CASE WHEN translations.deleted_at IS NULL THEN 'active' ELSE translations.status END,
                chain = EXCLUDED.chain,
                checkin = EXCLUDED.checkin,
                parking = EXCLUDED.parking,
                group_room_min = EXCLUDED.group_room_min,
                photos = EXCLUDED.photos,
                facilities = EXCLUDED.facilities,
                rooms = EXCLUDED.rooms,
                updated_at = NOW(),
                next_update_at = EXCLUDED.next_update_at
            "#,
        )
        .bind(&translation.id)
        .bind(translation.hotel_id)
        .bind(&translation.lang)
        .bind(&translation.name)
        .bind(&translation.description)
        .bind(&translation.markdown_description)
        .bind(&translation.important_info)
        .bind(&translation.address)
        .bind(&translation.policies)
        .bind(&translation.contact_info)
        .bind(&translation.status)
        .bind(&translation.source)
        .bind(&translation.chain)
        .bind(&translation.checkin)
        .bind(&translation.parking)
        .bind(&translation.group_room_min)
        .bind(&translation.photos)
        .bind(&translation.facilities)
        .bind(&translation.rooms)
        .bind(translation.next_update_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

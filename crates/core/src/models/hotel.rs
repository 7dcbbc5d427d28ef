//! The canonical hotel row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{new_row_id, SOURCE_PROPERTY_API, STATUS_ACTIVE};

/// One row of the `hotels` table. Nested aggregates (address, policies,
/// photos, facilities, rooms, checkin, group_room_min, contact info) are
/// stored as JSONB blobs beside the relational columns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HotelRecord {
    pub id: String,
    pub hotel_id: i64,
    pub cupid_id: i64,
    pub hotel_type_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub markdown_description: Option<String>,
    pub important_info: Option<String>,
    pub address: Option<Value>,
    pub rating: f64,
    pub star_rating: i16,
    pub latitude: f64,
    pub longitude: f64,
    pub amenities: Option<Value>,
    pub policies: Option<Value>,
    pub contact_info: Option<Value>,
    pub status: String,
    pub source: String,
    pub main_image_th: Option<String>,
    pub hotel_type: Option<String>,
    pub chain: Option<String>,
    pub chain_id: Option<i32>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub airport_code: Option<String>,
    pub review_count: i32,
    pub checkin: Option<Value>,
    pub parking: Option<String>,
    pub group_room_min: Option<Value>,
    pub child_allowed: bool,
    pub pets_allowed: bool,
    pub photos: Option<Value>,
    pub facilities: Option<Value>,
    pub rooms: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub next_update_at: DateTime<Utc>,
}

impl HotelRecord {
    /// A blank record with defaults applied, ready to be filled from an
    /// upstream payload.
    pub fn new(hotel_id: i64, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_row_id(),
            hotel_id,
            cupid_id: 0,
            hotel_type_id: None,
            name: name.into(),
            description: None,
            markdown_description: None,
            important_info: None,
            address: None,
            rating: 0.0,
            star_rating: 0,
            latitude: 0.0,
            longitude: 0.0,
            amenities: None,
            policies: None,
            contact_info: None,
            status: STATUS_ACTIVE.to_string(),
            source: SOURCE_PROPERTY_API.to_string(),
            main_image_th: None,
            hotel_type: None,
            chain: None,
            chain_id: None,
            phone: None,
            fax: None,
            email: None,
            airport_code: None,
            review_count: 0,
            checkin: None,
            parking: None,
            group_room_min: None,
            child_allowed: false,
            pets_allowed: false,
            photos: None,
            facilities: None,
            rooms: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            next_update_at: now,
        }
    }

}

//! Per-language hotel translations, unique on `(hotel_id, lang)`.
//!
//! A translation carries the hotel's textual surface only; the numeric
//! fields the pipeline treats as canonical (rating, star rating,
//! coordinates) live solely on the hotel row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

use super::{new_row_id, SOURCE_PROPERTY_API, STATUS_ACTIVE};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TranslationRecord {
    pub id: String,
    pub hotel_id: i64,
    pub lang: String,
    pub name: String,
    pub description: Option<String>,
    pub markdown_description: Option<String>,
    pub important_info: Option<String>,
    pub address: Option<Value>,
    pub policies: Option<Value>,
    pub contact_info: Option<Value>,
    pub status: String,
    pub source: String,
    pub chain: Option<String>,
    pub checkin: Option<Value>,
    pub parking: Option<String>,
    pub group_room_min: Option<Value>,
    pub photos: Option<Value>,
    pub facilities: Option<Value>,
    pub rooms: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub next_update_at: DateTime<Utc>,
}

impl TranslationRecord {
    pub fn new(hotel_id: i64, lang: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_row_id(),
            hotel_id,
            lang: lang.into(),
            name: name.into(),
            description: None,
            markdown_description: None,
            important_info: None,
            address: None,
            policies: None,
            contact_info: None,
            status: STATUS_ACTIVE.to_string(),
            source: SOURCE_PROPERTY_API.to_string(),
            chain: None,
            checkin: None,
            parking: None,
            group_room_min: None,
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

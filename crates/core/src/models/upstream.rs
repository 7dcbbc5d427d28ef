//! Upstream property API payloads and their mapping onto canonical rows.
//!
//! The upstream schema is treated as opaque beyond the fields persisted
//! here; nested aggregates are carried through as raw JSON values so the
//! cache and the store see exactly what the API returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{HotelRecord, ReviewRecord, TranslationRecord};

/// `GET /property/{id}` and `GET /property/{id}/lang/{lang}` share this
/// shape; the translated variant simply carries localized text fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyResponse {
    pub hotel_id: i64,
    pub cupid_id: i64,
    pub main_image_th: Option<String>,
    pub hotel_type: Option<String>,
    pub hotel_type_id: Option<i64>,
    pub chain: Option<String>,
    pub chain_id: Option<i32>,
    pub latitude: f64,
    pub longitude: f64,
    pub hotel_name: String,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
    pub address: Option<Value>,
    pub stars: i16,
    pub airport_code: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub checkin: Option<Value>,
    pub parking: Option<String>,
    pub group_room_min: Option<Value>,
    pub child_allowed: bool,
    pub pets_allowed: bool,
    pub photos: Option<Value>,
    pub description: Option<String>,
    pub markdown_description: Option<String>,
    pub important_info: Option<String>,
    pub facilities: Option<Value>,
    pub policies: Option<Value>,
    pub amenities: Option<Value>,
    pub rooms: Option<Value>,
}

impl PropertyResponse {
    /// Map onto a hotel row with the refresh deadline already applied.
    pub fn into_hotel_record(self, next_update_at: DateTime<Utc>) -> HotelRecord {
        let mut hotel = HotelRecord::new(self.hotel_id, self.hotel_name);
        hotel.cupid_id = self.cupid_id;
        hotel.hotel_type_id = self.hotel_type_id;
        hotel.description = self.description;
        hotel.markdown_description = self.markdown_description;
        hotel.important_info = self.important_info;
        hotel.address = self.address;
        hotel.rating = self.rating;
        hotel.star_rating = self.stars;
        hotel.latitude = self.latitude;
        hotel.longitude = self.longitude;
        hotel.amenities = self.amenities;
        hotel.policies = self.policies;
        hotel.main_image_th = self.main_image_th;
        hotel.hotel_type = self.hotel_type;
        hotel.chain = self.chain;
        hotel.chain_id = self.chain_id;
        hotel.phone = self.phone;
        hotel.fax = self.fax;
        hotel.email = self.email;
        hotel.airport_code = self.airport_code;
        hotel.review_count = self.review_count;
        hotel.checkin = self.checkin;
        hotel.parking = self.parking;
        hotel.group_room_min = self.group_room_min;
        hotel.child_allowed = self.child_allowed;
        hotel.pets_allowed = self.pets_allowed;
        hotel.photos = self.photos;
        hotel.facilities = self.facilities;
        hotel.rooms = self.rooms;
        hotel.next_update_at = next_update_at;
        hotel
    }

    /// Map a localized payload onto a translation row.
    pub fn into_translation_record(
        self,
        hotel_id: i64,
        lang: &str,
        next_update_at: DateTime<Utc>,
    ) -> TranslationRecord {
        let mut translation = TranslationRecord::new(hotel_id, lang, self.hotel_name);
        translation.description = self.description;
        translation.markdown_description = self.markdown_description;
        translation.important_info = self.important_info;
        translation.address = self.address;
        translation.policies = self.policies;
        translation.chain = self.chain;
        translation.checkin = self.checkin;
        translation.parking = self.parking;
        translation.group_room_min = self.group_room_min;
        translation.photos = self.photos;
        translation.facilities = self.facilities;
        translation.rooms = self.rooms;
        translation.next_update_at = next_update_at;
        translation
    }
}

/// One element of `GET /property/reviews/{id}/{n}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewResponse {
    pub review_id: i64,
    pub average_score: i32,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub review_type: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub headline: Option<String>,
    pub language: Option<String>,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub source: Option<String>,
}

impl ReviewResponse {
    /// Map onto a review row attached to `hotel_id`. Unparseable dates
    /// fall back to the fetch time.
    pub fn into_review_record(self, hotel_id: i64, next_update_at: DateTime<Utc>) -> ReviewRecord {
        let mut review = ReviewRecord::new(hotel_id, self.review_id);
        review.average_score = self.average_score;
        review.country = self.country;
        review.review_type = self.review_type;
        review.name = self.name;
        review.date = self
            .date
            .as_deref()
            .and_then(parse_review_date)
            .unwrap_or_else(Utc::now);
        review.headline = self.headline;
        if let Some(language) = self.language {
            if !language.is_empty() {
                review.language = language;
            }
        }
        review.pros = self.pros;
        review.cons = self.cons;
        review.source = self.source;
        review.next_update_at = next_update_at;
        review
    }
}

fn parse_review_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_maps_onto_hotel_record() {
        let payload: PropertyResponse = serde_json::from_value(serde_json::json!({
            "hotel_id": 1641879,
            "cupid_id": 1641879,
            "hotel_name": "Orange Riverside",
            "stars": 4,
            "rating": 4.3,
            "latitude": 10.78,
            "longitude": 106.7,
            "review_count": 212,
            "address": {"city": "Ho Chi Minh City", "country": "vn"},
            "photos": [{"url": "https://img.example.com/1.jpg"}],
            "child_allowed": true
        }))
        .unwrap();

        let deadline = Utc::now() + chrono::Duration::hours(6);
        let hotel = payload.into_hotel_record(deadline);
        assert_eq!(hotel.hotel_id, 1641879);
        assert_eq!(hotel.name, "Orange Riverside");
        assert_eq!(hotel.star_rating, 4);
        assert_eq!(hotel.review_count, 212);
        assert!(hotel.child_allowed);
        assert_eq!(hotel.next_update_at, deadline);
        assert_eq!(hotel.address.unwrap()["city"], "Ho Chi Minh City");
    }

    #[test]
    fn translation_keeps_only_textual_surface() {
        let payload: PropertyResponse = serde_json::from_value(serde_json::json!({
            "hotel_id": 317597,
            "hotel_name": "Hôtel du Parc",
            "description": "Un hôtel charmant",
            "rating": 4.9,
            "stars": 5
        }))
        .unwrap();

        let translation =
            payload.into_translation_record(317597, "fr", Utc::now());
        assert_eq!(translation.lang, "fr");
        assert_eq!(translation.name, "Hôtel du Parc");
        assert_eq!(translation.description.as_deref(), Some("Un hôtel charmant"));
    }

    #[test]
    fn review_date_parsing_falls_back() {
        let review = ReviewResponse {
            review_id: 1,
            date: Some("2024-03-01".to_string()),
            ..Default::default()
        };
        let record = review.into_review_record(1, Utc::now());
        assert_eq!(record.date.format("%Y-%m-%d").to_string(), "2024-03-01");

        let review = ReviewResponse {
            review_id: 2,
            date: Some("not-a-date".to_string()),
            ..Default::default()
        };
        let record = review.into_review_record(1, Utc::now());
        assert!(record.date <= Utc::now());
    }

    #[test]
    fn review_tolerates_missing_fields() {
        let review: ReviewResponse = serde_json::from_value(serde_json::json!({
            "review_id": 900123,
            "average_score": 9
        }))
        .unwrap();
        let record = review.into_review_record(317597, Utc::now());
        assert_eq!(record.review_id, 900123);
        assert_eq!(record.language, "en");
    }
}

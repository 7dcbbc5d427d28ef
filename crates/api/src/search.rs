//! Search parameter surface, index document shape and the engine seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_gateway_core::HotelRecord;
use serde::{Deserialize, Serialize};

use crate::ApiError;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

const VALID_SORT_FIELDS: &[&str] = &[
    "rating",
    "price",
    "distance",
    "relevance",
    "name",
    "created_at",
];

/// The full search filter surface accepted by `GET /search/hotels`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub chain: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub airport_code: Option<String>,
    pub parking: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub rating_min: Option<f64>,
    pub rating_max: Option<f64>,
    pub star_rating: Option<i16>,
    pub review_count: Option<i32>,
    pub child_allowed: Option<bool>,
    pub pets_allowed: Option<bool>,
    pub amenities: Vec<String>,
    pub tags: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: i64,
    pub limit: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

impl SearchParams {
    /// Clamp paging and normalize sort fields; invalid sorts fall back to
    /// relevance/desc.
    pub fn validate(&mut self) {
        if self.page <= 0 {
            self.page = 1;
        }
        if self.limit <= 0 {
            self.limit = DEFAULT_LIMIT;
        }
        if self.limit > MAX_LIMIT {
            self.limit = MAX_LIMIT;
        }
        if let Some(rating_min) = self.rating_min {
            if rating_min < 0.0 {
                self.rating_min = Some(0.0);
            }
        }
        if let Some(rating_max) = self.rating_max {
            if rating_max > 5.0 {
                self.rating_max = Some(5.0);
            }
        }
        if let Some(star_rating) = self.star_rating {
            if !(0..=5).contains(&star_rating) {
                self.star_rating = None;
            }
        }
        if let Some(sort_by) = &self.sort_by {
            if !VALID_SORT_FIELDS.contains(&sort_by.as_str()) {
                self.sort_by = Some("relevance".to_string());
            }
        }
        match self.sort_order.as_deref() {
            Some("asc") | Some("desc") => {}
            _ => self.sort_order = Some("desc".to_string()),
        }
    }

    pub fn has_location_filter(&self) -> bool {
        matches!(
            (self.latitude, self.longitude, self.radius),
            (Some(lat), Some(lon), Some(radius))
                if lat != 0.0 && lon != 0.0 && radius > 0.0
        )
    }
}

/// The flat document shape pushed into the external index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelDocument {
    pub id: String,
    pub hotel_id: i64,
    pub name: String,
    pub description: String,
    pub phone: String,
    pub chain: String,
    pub rating: f64,
    pub star_rating: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub fax: String,
    pub email: String,
    pub airport_code: String,
    pub review_count: i32,
    pub child_allowed: bool,
    pub pets_allowed: bool,
    pub parking: String,
    pub city: String,
    pub country: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl HotelDocument {
    pub fn from_record(hotel: &HotelRecord) -> Self {
        let city = json_address_field(hotel, "city");
        let country = json_address_field(hotel, "country");
        Self {
            id: hotel.hotel_id.to_string(),
            hotel_id: hotel.hotel_id,
            name: hotel.name.clone(),
            description: hotel.description.clone().unwrap_or_default(),
            phone: hotel.phone.clone().unwrap_or_default(),
            chain: hotel.chain.clone().unwrap_or_default(),
            rating: hotel.rating,
            star_rating: hotel.star_rating as i32,
            latitude: hotel.latitude,
            longitude: hotel.longitude,
            fax: hotel.fax.clone().unwrap_or_default(),
            email: hotel.email.clone().unwrap_or_default(),
            airport_code: hotel.airport_code.clone().unwrap_or_default(),
            review_count: hotel.review_count,
            child_allowed: hotel.child_allowed,
            pets_allowed: hotel.pets_allowed,
            parking: hotel.parking.clone().unwrap_or_default(),
            city,
            country,
            created_at: hotel.created_at.timestamp(),
            updated_at: hotel.updated_at.timestamp(),
        }
    }
}

fn json_address_field(hotel: &HotelRecord, field: &str) -> String {
    hotel
        .address
        .as_ref()
        .and_then(|address| address.get(field))
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub hotels: Vec<HotelDocument>,
    pub total_hits: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl SearchResult {
    pub fn finalize(mut self) -> Self {
        if self.limit > 0 {
            self.total_pages = (self.total_hits + self.limit - 1) / self.limit;
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: i64,
    pub last_updated: DateTime<Utc>,
}

/// The external index seam. Production talks to a Typesense-compatible
/// collection API; tests use an in-memory double.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn index(&self, documents: &[HotelDocument]) -> Result<(), ApiError>;
    async fn search(&self, params: &SearchParams) -> Result<SearchResult, ApiError>;
    async fn suggestions(&self, query: &str, limit: i64) -> Result<Vec<Suggestion>, ApiError>;
    async fn update_hotel(&self, document: &HotelDocument) -> Result<(), ApiError>;
    async fn delete_hotel(&self, hotel_id: &str) -> Result<(), ApiError>;
    async fn clear_index(&self) -> Result<(), ApiError>;
    async fn stats(&self) -> Result<IndexStats, ApiError>;
    async fn health_check(&self) -> Result<(), ApiError>;
}

/// Build the index-side `filter_by` expression.
pub fn build_filters(params: &SearchParams) -> String {
    let mut filters: Vec<String> = Vec::new();

    let exact = [
        ("name", &params.name),
        ("description", &params.description),
        ("phone", &params.phone),
        ("chain", &params.chain),
        ("email", &params.email),
        ("fax", &params.fax),
        ("airport_code", &params.airport_code),
        ("parking", &params.parking),
        ("city", &params.city),
        ("country", &params.country),
        ("currency", &params.currency),
    ];
    for (field, value) in exact {
        if let Some(value) = value {
            if !value.is_empty() {
                filters.push(format!("{field}:={value}"));
            }
        }
    }

    if let Some(rating_min) = params.rating_min {
        if rating_min > 0.0 {
            filters.push(format!("rating:>={rating_min}"));
        }
    }
    if let Some(rating_max) = params.rating_max {
        if rating_max > 0.0 {
            filters.push(format!("rating:<={rating_max}"));
        }
    }
    if let Some(star_rating) = params.star_rating {
        if star_rating > 0 {
            filters.push(format!("star_rating:>={star_rating}"));
        }
    }
    if let Some(review_count) = params.review_count {
        if review_count > 0 {
            filters.push(format!("review_count:>={review_count}"));
        }
    }
    if let Some(child_allowed) = params.child_allowed {
        filters.push(format!("child_allowed:={child_allowed}"));
    }
    if let Some(pets_allowed) = params.pets_allowed {
        filters.push(format!("pets_allowed:={pets_allowed}"));
    }

    if !params.amenities.is_empty() {
        let any: Vec<String> = params
            .amenities
            .iter()
            .map(|amenity| format!("amenities:={amenity}"))
            .collect();
        filters.push(format!("({})", any.join(" || ")));
    }
    if !params.tags.is_empty() {
        let any: Vec<String> = params.tags.iter().map(|tag| format!("tags:={tag}")).collect();
        filters.push(format!("({})", any.join(" || ")));
    }

    match (params.price_min, params.price_max) {
        (Some(min), Some(max)) if min > 0.0 && max > 0.0 => {
            filters.push(format!("price_max:>={min}"));
            filters.push(format!("price_min:<={max}"));
        }
        (Some(min), _) if min > 0.0 => filters.push(format!("price_max:>={min}")),
        (_, Some(max)) if max > 0.0 => filters.push(format!("price_min:<={max}")),
        _ => {}
    }

    if params.has_location_filter() {
        filters.push(format!(
            "location:({}, {}, {} km)",
            params.latitude.unwrap_or_default(),
            params.longitude.unwrap_or_default(),
            params.radius.unwrap_or_default()
        ));
    }

    filters.join(" && ")
}

/// Build the index-side `sort_by` expression; empty means relevance.
pub fn build_sort(params: &SearchParams) -> String {
    let Some(sort_by) = params.sort_by.as_deref() else {
        return String::new();
    };
    let order = match params.sort_order.as_deref() {
        Some("asc") => "asc",
        _ => "desc",
    };
    match sort_by {
        "relevance" => String::new(),
        "price" => format!("price_min:{order}"),
        "distance" => {
            if params.has_location_filter() {
                format!(
                    "location({}, {}):{order}",
                    params.latitude.unwrap_or_default(),
                    params.longitude.unwrap_or_default()
                )
            } else {
                String::new()
            }
        }
        other => format!("{other}:{order}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_clamps_paging_and_sorting() {
        let mut params = SearchParams {
            page: -1,
            limit: 500,
            sort_by: Some("bogus".to_string()),
            sort_order: Some("sideways".to_string()),
            ..Default::default()
        };
        params.validate();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 100);
        assert_eq!(params.sort_by.as_deref(), Some("relevance"));
        assert_eq!(params.sort_order.as_deref(), Some("desc"));
    }

    #[test]
    fn filters_combine_with_and() {
        let params = SearchParams {
            chain: Some("Hilton".to_string()),
            rating_min: Some(3.5),
            pets_allowed: Some(true),
            amenities: vec!["wifi".to_string(), "pool".to_string()],
            ..Default::default()
        };
        let filters = build_filters(&params);
        assert!(filters.contains("chain:=Hilton"));
        assert!(filters.contains("rating:>=3.5"));
        assert!(filters.contains("pets_allowed:=true"));
        assert!(filters.contains("(amenities:=wifi || amenities:=pool)"));
        assert_eq!(filters.matches(" && ").count(), 3);
    }

    #[test]
    fn geo_filter_requires_all_three_coordinates() {
        let mut params = SearchParams {
            latitude: Some(10.78),
            longitude: Some(106.7),
            ..Default::default()
        };
        assert!(!params.has_location_filter());
        params.radius = Some(5.0);
        assert!(params.has_location_filter());
        assert!(build_filters(&params).contains("location:(10.78, 106.7, 5 km)"));
    }

    #[test]
    fn sort_expression_per_field() {
        let mut params = SearchParams {
            sort_by: Some("rating".to_string()),
            sort_order: Some("asc".to_string()),
            ..Default::default()
        };
        assert_eq!(build_sort(&params), "rating:asc");

        params.sort_by = Some("price".to_string());
        assert_eq!(build_sort(&params), "price_min:asc");

        params.sort_by = Some("distance".to_string());
        assert_eq!(build_sort(&params), "");

        params.latitude = Some(1.0);
        params.longitude = Some(2.0);
        params.radius = Some(3.0);
        assert_eq!(build_sort(&params), "location(1, 2):asc");

        params.sort_by = Some("relevance".to_string());
        assert_eq!(build_sort(&params), "");
    }

    #[test]
    fn document_flattens_the_address_blob() {
        let mut hotel = HotelRecord::new(378772, "Seaside Inn");
        hotel.address = Some(serde_json::json!({"city": "Lisbon", "country": "pt"}));
        hotel.rating = 4.1;
        let document = HotelDocument::from_record(&hotel);
        assert_eq!(document.id, "378772");
        assert_eq!(document.city, "Lisbon");
        assert_eq!(document.country, "pt");
        assert!((document.rating - 4.1).abs() < f64::EPSILON);
    }

    #[test]
    fn result_total_pages() {
        let result = SearchResult {
            hotels: Vec::new(),
            total_hits: 101,
            page: 1,
            limit: 20,
            total_pages: 0,
        }
        .finalize();
        assert_eq!(result.total_pages, 6);
    }
}

//! Search and suggestion delegation to the external index.

use crate::search::SearchParams;
use crate::state::AppState;
use crate::{ApiError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

const DEFAULT_SUGGESTION_LIMIT: i64 = 10;
const MAX_SUGGESTION_LIMIT: i64 = 50;

/// Raw query surface; list-valued filters arrive comma-separated.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
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
    pub amenities: Option<String>,
    pub tags: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub currency: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl From<SearchQuery> for SearchParams {
    fn from(query: SearchQuery) -> Self {
        SearchParams {
            q: query.q,
            name: query.name,
            description: query.description,
            phone: query.phone,
            chain: query.chain,
            email: query.email,
            fax: query.fax,
            airport_code: query.airport_code,
            parking: query.parking,
            city: query.city,
            country: query.country,
            rating_min: query.rating_min,
            rating_max: query.rating_max,
            star_rating: query.star_rating,
            review_count: query.review_count,
            child_allowed: query.child_allowed,
            pets_allowed: query.pets_allowed,
            amenities: split_list(query.amenities),
            tags: split_list(query.tags),
            price_min: query.price_min,
            price_max: query.price_max,
            currency: query.currency,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            page: query.page.unwrap_or(0),
            limit: query.limit.unwrap_or(0),
            latitude: query.latitude,
            longitude: query.longitude,
            radius: query.radius,
        }
    }
}

pub async fn search_hotels(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let mut params: SearchParams = query.into_inner().into();
    params.validate();

    let result = state.index.search(&params).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": result.hotels,
        "meta": {
            "page": result.page,
            "limit": result.limit,
            "total_hits": result.total_hits,
            "total_pages": result.total_pages,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_suggestions(
    state: web::Data<AppState>,
    query: web::Query<SuggestionQuery>,
) -> Result<HttpResponse> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("query parameter 'q' is required".to_string()))?;

    let limit = query
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_SUGGESTION_LIMIT)
        .min(MAX_SUGGESTION_LIMIT);

    let suggestions = state.index.suggestions(q, limit).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": suggestions,
    })))
}

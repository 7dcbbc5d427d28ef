//! `GET /hotels/{id}`: cache -> store -> upstream fallback.
//!
//! On a store miss the hotel, its reviews and the desired-language
//! translations are fetched from the upstream API, persisted through the
//! pipeline's upsert path, cached, and pushed into the search index on a
//! deliberately detached task with its own deadline (the index update
//! must not ride on the request lifetime).

use crate::repository::HotelView;
use crate::search::{HotelDocument, SearchEngine};
use crate::state::AppState;
use crate::{ApiError, Result};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use hotel_gateway_core::{HotelRecord, ReviewRecord, TranslationRecord, DESIRED_LANGS};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Deadline for the detached index update.
const INDEX_UPDATE_TIMEOUT: Duration = Duration::from_secs(180);

const DEFAULT_REVIEWS_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct HotelQuery {
    #[serde(rename = "reviewsLimit")]
    pub reviews_limit: Option<i64>,
}

pub async fn get_hotel_by_id(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<HotelQuery>,
) -> Result<HttpResponse> {
    let hotel_id = path.into_inner();
    if hotel_id <= 0 {
        return Err(ApiError::BadRequest(format!("invalid hotel id {hotel_id}")));
    }
    let reviews_limit = query
        .reviews_limit
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_REVIEWS_LIMIT);

    let cache_key = format!("hotel:{hotel_id}");
    match state.cache.get::<HotelView>(&cache_key).await {
        Ok(Some(view)) => {
            return Ok(ok_response(&view));
        }
        Ok(None) => {}
        Err(e) => warn!(hotel_id, error = %e, "hotel cache read failed"),
    }

    match state.read_repo.find_by_hotel_id(hotel_id, reviews_limit).await {
        Ok(Some(view)) => {
            cache_view(&state, &cache_key, &view).await;
            spawn_index_update(state.index.clone(), HotelDocument::from_record(&view.hotel));
            return Ok(ok_response(&view));
        }
        Ok(None) => {}
        Err(e) => warn!(hotel_id, error = %e, "error querying hotel from database"),
    }

    info!(hotel_id, "falling back to upstream property API");
    let view = fetch_and_persist(&state, hotel_id, reviews_limit).await?;
    cache_view(&state, &cache_key, &view).await;
    spawn_index_update(state.index.clone(), HotelDocument::from_record(&view.hotel));
    Ok(ok_response(&view))
}

fn ok_response(view: &HotelView) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": view,
    }))
}

async fn cache_view(state: &AppState, cache_key: &str, view: &HotelView) {
    if let Err(e) = state.cache.set(cache_key, view, state.hotel_cache_ttl).await {
        warn!(cache_key, error = %e, "failed to cache hotel");
    }
}

/// Upstream fetch of hotel + reviews + translations, persisted through
/// the pipeline's upsert path. Persistence failures are logged, not
/// fatal; the client still gets the fetched body.
async fn fetch_and_persist(
    state: &AppState,
    hotel_id: i64,
    reviews_limit: i64,
) -> Result<HotelView> {
    let property = state.upstream.fetch_hotel(hotel_id).await.map_err(|e| {
        error!(hotel_id, error = %e, "failed to fetch hotel from upstream");
        match e {
            hotel_gateway_core::UpstreamError::NotFound => {
                ApiError::NotFound(format!("hotel {hotel_id} not found"))
            }
            other => ApiError::Upstream(other),
        }
    })?;

    let hotel: HotelRecord = property.into_hotel_record(Utc::now());

    let reviews: Vec<ReviewRecord> = match state
        .upstream
        .fetch_reviews(hotel_id, reviews_limit)
        .await
    {
        Ok(fetched) => fetched
            .into_iter()
            .map(|review| review.into_review_record(hotel_id, Utc::now()))
            .collect(),
        Err(e) => {
            warn!(hotel_id, error = %e, "failed to fetch hotel reviews");
            Vec::new()
        }
    };

    let mut translations: Vec<TranslationRecord> = Vec::new();
    for lang in DESIRED_LANGS {
        match state
            .upstream
            .fetch_translation(&hotel_id.to_string(), lang)
            .await
        {
            Ok(localized) => {
                translations.push(localized.into_translation_record(hotel_id, lang, Utc::now()))
            }
            Err(e) => warn!(hotel_id, lang, error = %e, "failed to fetch hotel translation"),
        }
    }

    if let Err(e) = state.write_repo.upsert_hotel(&hotel).await {
        error!(hotel_id, error = %e, "failed to save hotel from upstream");
    } else {
        info!(hotel_id, "hotel saved to database from upstream");
    }
    for review in &reviews {
        let saved = match state.write_repo.review_by_review_id(review.review_id).await {
            Ok(Some(existing)) => {
                let mut update = review.clone();
                update.id = existing.id;
                update.created_at = existing.created_at;
                state.write_repo.update_review(&update).await
            }
            Ok(None) => state.write_repo.create_review(review).await,
            Err(e) => Err(e),
        };
        if let Err(e) = saved {
            warn!(hotel_id, review_id = review.review_id, error = %e, "failed to save review");
        }
    }
    for translation in &translations {
        if let Err(e) = state.write_repo.upsert_translation(translation).await {
            warn!(hotel_id, lang = %translation.lang, error = %e, "failed to save translation");
        }
    }

    Ok(HotelView {
        hotel,
        reviews,
        translations,
    })
}

/// Push one hotel into the search index on a supervised task detached
/// from the request scope.
pub fn spawn_index_update(index: Arc<dyn SearchEngine>, document: HotelDocument) {
    tokio::spawn(async move {
        let hotel_id = document.hotel_id;
        match tokio::time::timeout(INDEX_UPDATE_TIMEOUT, index.update_hotel(&document)).await {
            Ok(Ok(())) => info!(hotel_id, "hotel indexed in search engine"),
            Ok(Err(e)) => error!(hotel_id, error = %e, "failed to index hotel in search engine"),
            Err(_) => error!(hotel_id, "hotel index update timed out"),
        }
    });
}

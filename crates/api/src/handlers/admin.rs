//! Operator-facing sync trigger.

use crate::state::AppState;
use crate::sync::{parse_since_timestamp, SyncOptions};
use crate::{ApiError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncRequest {
    pub full_sync: bool,
    pub batch_size: usize,
    /// RFC3339, `YYYY-MM-DD[ HH:MM:SS]`, or unix seconds.
    pub since_timestamp: Option<serde_json::Value>,
    pub update_cache_after: bool,
}

pub async fn trigger_sync(
    state: web::Data<AppState>,
    body: web::Json<SyncRequest>,
) -> Result<HttpResponse> {
    let body = body.into_inner();

    let since = match &body.since_timestamp {
        Some(raw) => Some(parse_since_timestamp(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("unparseable sinceTimestamp: {raw}"))
        })?),
        None => None,
    };

    let report = state
        .sync
        .execute(SyncOptions {
            full_sync: body.full_sync,
            batch_size: body.batch_size,
            since,
            update_cache_after: body.update_cache_after,
        })
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": report,
    })))
}

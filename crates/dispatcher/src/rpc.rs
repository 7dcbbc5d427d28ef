//! The dispatcher's RPC surface.
//!
//! HTTP JSON carrying the same request/response contract the scheduler
//! speaks: `ProcessFetchRequest` and a static health probe.

use crate::orchestrator::Orchestrator;
use actix_web::{web, HttpResponse, Responder};
use hotel_gateway_core::message::RpcMessageType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const JOB_STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    #[serde(default)]
    pub correlation_id: String,
    pub message_type: RpcMessageType,
    #[serde(default)]
    pub timestamp: i64,
    /// Advisory; carried through and logged, never branched on.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub hotel_id: i64,
    pub message_type: RpcMessageType,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub success: bool,
    pub message: String,
    pub correlation_id: String,
    pub jobs_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<JobInfo>>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rpc")
            .route("/process-fetch-request", web::post().to(process_fetch_request))
            .route("/health", web::get().to(health)),
    );
}

async fn process_fetch_request(
    orchestrator: web::Data<Arc<Orchestrator>>,
    request: web::Json<FetchRequest>,
) -> impl Responder {
    let mut request = request.into_inner();
    if request.correlation_id.is_empty() {
        request.correlation_id = uuid::Uuid::new_v4().to_string();
    }
    let response = orchestrator.process_fetch_request(&request).await;
    HttpResponse::Ok().json(response)
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"status": "healthy"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_request_accepts_wire_enum_names() {
        let request: FetchRequest = serde_json::from_str(
            r#"{"correlation_id":"c1","message_type":"FETCH_MISSING_TRANSLATIONS","timestamp":1700000000,"force":true}"#,
        )
        .unwrap();
        assert_eq!(request.message_type, RpcMessageType::FetchMissingTranslations);
        assert!(request.force);
    }

    #[test]
    fn fetch_response_omits_jobs_when_absent() {
        let response = FetchResponse {
            success: true,
            message: "jobs enqueued".to_string(),
            correlation_id: "c1".to_string(),
            jobs_created: 3,
            jobs: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("jobs").is_none());
        assert_eq!(json["jobs_created"], 3);
    }
}

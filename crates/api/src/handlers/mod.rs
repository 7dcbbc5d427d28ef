//! HTTP route configuration.

pub mod admin;
pub mod hotels;
pub mod search;

use actix_web::{web, HttpResponse, Responder};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/hotels/{hotel_id}", web::get().to(hotels::get_hotel_by_id))
            .route("/search/hotels", web::get().to(search::search_hotels))
            .route("/search/suggestions", web::get().to(search::get_suggestions))
            .route("/admin/sync", web::post().to(admin::trigger_sync)),
    );
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "hotel-gateway-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

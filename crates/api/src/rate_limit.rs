//! Per-client-IP rate limiting middleware.
//!
//! An in-process keyed token bucket; clients over budget get a 429 with
//! the standard JSON error envelope.

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpResponse};
use futures_util::future::LocalBoxFuture;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use hotel_gateway_core::config::RateLimitSettings;
use nonzero_ext::nonzero;
use std::future::{ready, Ready};
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;
use tracing::warn;

pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// One limiter shared across all server workers so a client's budget is
/// global, not per worker thread.
pub fn shared_limiter(settings: &RateLimitSettings) -> Arc<IpLimiter> {
    let rate = NonZeroU32::new(settings.requests_per_second).unwrap_or(nonzero!(20u32));
    let burst = NonZeroU32::new(settings.burst).unwrap_or(rate);
    Arc::new(RateLimiter::keyed(Quota::per_second(rate).allow_burst(burst)))
}

pub struct RateLimitMiddleware {
    limiter: Arc<IpLimiter>,
}

impl RateLimitMiddleware {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self::from_limiter(shared_limiter(settings))
    }

    pub fn from_limiter(limiter: Arc<IpLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: Arc<IpLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let client_ip = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        if self.limiter.check_key(&client_ip).is_err() {
            warn!(client_ip = %client_ip, path = %req.path(), "client rate limited");
            let response = HttpResponse::TooManyRequests().json(serde_json::json!({
                "success": false,
                "error": "rate limit exceeded",
            }));
            return Box::pin(async move {
                Ok(req.into_response(response).map_into_right_body())
            });
        }

        let service = self.service.clone();
        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn over_budget_requests_get_429() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(&RateLimitSettings {
                    requests_per_second: 1,
                    burst: 2,
                }))
                .route("/ping", web::get().to(|| async { "pong" })),
        )
        .await;

        let mut last_status = 0;
        for _ in 0..5 {
            let response =
                test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
            last_status = response.status().as_u16();
        }
        assert_eq!(last_status, 429);
    }

    #[actix_web::test]
    async fn within_budget_requests_pass() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(&RateLimitSettings {
                    requests_per_second: 100,
                    burst: 100,
                }))
                .route("/ping", web::get().to(|| async { "pong" })),
        )
        .await;

        let response =
            test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert!(response.status().is_success());
    }
}

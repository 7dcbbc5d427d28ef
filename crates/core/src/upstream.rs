//! Upstream property API client.
//!
//! Every dispatch goes through a client-side token bucket, then the
//! circuit breaker, then the HTTP call. Transient statuses (429, 500,
//! 502, 503, 504) and transport errors are retried with exponential
//! backoff; 404 means "nothing exists for this target" and is neither
//! retried nor counted as a breaker failure.

use crate::config::UpstreamConfig;
use crate::models::upstream::{PropertyResponse, ReviewResponse};
use crate::resilience::{BreakerConfig, CircuitBreaker, CircuitOpen};
use crate::retry::{retry_with_backoff, RetryPolicy};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Statuses worth retrying.
const RETRYABLE_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Default review page size when the caller does not specify one.
const DEFAULT_REVIEW_COUNT: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// 404 from the upstream; a semantic "absent", not a fault.
    #[error("upstream resource not found")]
    NotFound,

    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpen),

    #[error("upstream transient error: HTTP {status}")]
    Transient { status: u16 },

    #[error("upstream error: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("lang is required for translation fetches")]
    MissingLang,
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Transient { .. } | UpstreamError::Transport(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound)
    }
}

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate-limited, circuit-broken HTTP client for the property API.
pub struct PropertyApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: DirectLimiter,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl PropertyApiClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let rate = NonZeroU32::new(config.rate_limit_per_second).unwrap_or(nonzero!(10u32));
        let burst = NonZeroU32::new(config.burst_limit).unwrap_or(rate);
        let limiter = RateLimiter::direct(Quota::per_second(rate).allow_burst(burst));

        let breaker = CircuitBreaker::new(
            "property-api",
            BreakerConfig {
                max_failures: config.breaker_max_failures,
                reset_timeout_seconds: config.breaker_reset_seconds,
            },
        );

        let retry = RetryPolicy::new(
            config.max_retry_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_secs(30),
        );

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            limiter,
            breaker,
            retry,
        })
    }

    /// `GET /property/{hotel_id}`
    pub async fn fetch_hotel(&self, hotel_id: i64) -> Result<PropertyResponse, UpstreamError> {
        let url = format!("{}/property/{}", self.base_url, hotel_id);
        self.get_json(url).await
    }

    /// `GET /property/reviews/{hotel_id}/{n}`
    pub async fn fetch_reviews(
        &self,
        hotel_id: i64,
        review_count: i64,
    ) -> Result<Vec<ReviewResponse>, UpstreamError> {
        let count = if review_count > 0 {
            review_count
        } else {
            DEFAULT_REVIEW_COUNT
        };
        let url = format!("{}/property/reviews/{}/{}", self.base_url, hotel_id, count);
        self.get_json(url).await
    }

    /// `GET /property/{hotel_id}/lang/{lang}`
    pub async fn fetch_translation(
        &self,
        hotel_id: &str,
        lang: &str,
    ) -> Result<PropertyResponse, UpstreamError> {
        if lang.is_empty() {
            return Err(UpstreamError::MissingLang);
        }
        let url = format!("{}/property/{}/lang/{}", self.base_url, hotel_id, lang);
        self.get_json(url).await
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, UpstreamError> {
        retry_with_backoff(
            || self.attempt(&url),
            self.retry,
            UpstreamError::is_retryable,
        )
        .await
    }

    async fn attempt<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        self.limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;
        self.breaker.try_acquire()?;

        debug!(url, "upstream request");
        let response = match self
            .http
            .get(url)
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.breaker.record_failure();
                return Err(UpstreamError::Transport(e));
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    self.breaker.record_failure();
                    return Err(UpstreamError::Transport(e));
                }
            };
            self.breaker.record_success();
            return Ok(serde_json::from_slice(&body)?);
        }

        if status == 404 {
            // Absent records must not poison the circuit.
            self.breaker.record_success();
            return Err(UpstreamError::NotFound);
        }

        self.breaker.record_failure();
        if RETRYABLE_STATUSES.contains(&status) {
            Err(UpstreamError::Transient { status })
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(UpstreamError::Status { status, body })
        }
    }
}

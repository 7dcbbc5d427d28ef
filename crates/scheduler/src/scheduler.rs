//! Tick loops and the dispatcher RPC client.

use chrono::Utc;
use hotel_gateway_core::config::SchedulerConfig;
use hotel_gateway_core::message::RpcMessageType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize)]
struct TriggerRequest {
    correlation_id: String,
    message_type: RpcMessageType,
    timestamp: i64,
    force: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TriggerReply {
    success: bool,
    message: String,
    correlation_id: String,
    #[serde(default)]
    jobs_created: usize,
}

/// What one tick produced, for logging and tests.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub success: bool,
    pub message: String,
    pub correlation_id: String,
    pub jobs_queued: usize,
}

/// HTTP client for the dispatcher RPC surface.
#[derive(Clone)]
pub struct DispatcherClient {
    http: reqwest::Client,
    endpoint: String,
}

impl DispatcherClient {
    pub fn new(host: &str, port: u16) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("http://{}:{}/rpc/process-fetch-request", host, port),
        })
    }

    /// Fire one `TriggerFetch`. Transport failures come back as a failed
    /// outcome rather than an error; the caller never retries.
    pub async fn trigger_fetch(&self, message_type: RpcMessageType) -> TriggerOutcome {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let request = TriggerRequest {
            correlation_id: correlation_id.clone(),
            message_type,
            timestamp: Utc::now().timestamp(),
            force: false,
        };

        let response = self.http.post(&self.endpoint).json(&request).send().await;
        match response {
            Ok(response) => match response.json::<TriggerReply>().await {
                Ok(reply) => TriggerOutcome {
                    success: reply.success,
                    message: reply.message,
                    correlation_id: reply.correlation_id,
                    jobs_queued: reply.jobs_created,
                },
                Err(e) => TriggerOutcome {
                    success: false,
                    message: format!("failed to decode trigger response: {}", e),
                    correlation_id,
                    jobs_queued: 0,
                },
            },
            Err(e) => TriggerOutcome {
                success: false,
                message: format!("failed to trigger fetch: {}", e),
                correlation_id,
                jobs_queued: 0,
            },
        }
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    client: DispatcherClient,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, reqwest::Error> {
        let client = DispatcherClient::new(&config.dispatcher_host, config.dispatcher_port)?;
        Ok(Self { config, client })
    }

    /// Spawn one interval loop per message kind and run until cancelled.
    /// Overlapping ticks within a kind are fine: the dispatcher discovers
    /// what is eligible *now*, and worker-side locks suppress duplicates.
    pub async fn run(&self) {
        let intervals = &self.config.intervals_in_minutes;
        let schedules = [
            (RpcMessageType::UpdateHotel, intervals.update_hotels),
            (RpcMessageType::UpdateReview, intervals.update_reviews),
            (RpcMessageType::UpdateTranslation, intervals.update_translations),
            (
                RpcMessageType::FetchMissingTranslations,
                intervals.fetch_missing_translations,
            ),
            (
                RpcMessageType::FetchMissingReviews,
                intervals.fetch_missing_reviews,
            ),
        ];

        info!(
            update_hotels = intervals.update_hotels,
            update_reviews = intervals.update_reviews,
            update_translations = intervals.update_translations,
            fetch_missing_translations = intervals.fetch_missing_translations,
            fetch_missing_reviews = intervals.fetch_missing_reviews,
            "schedules configured"
        );

        let mut handles = Vec::new();
        for (message_type, minutes) in schedules {
            let client = self.client.clone();
            handles.push(tokio::spawn(Self::tick_loop(
                client,
                message_type,
                Duration::from_secs(minutes.max(1) * 60),
            )));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn tick_loop(client: DispatcherClient, message_type: RpcMessageType, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        // The immediate first tick belongs to the dispatcher's run-once.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let outcome = client.trigger_fetch(message_type).await;
            if !outcome.success {
                error!(
                    message_type = ?message_type,
                    correlation_id = %outcome.correlation_id,
                    message = %outcome.message,
                    "trigger failed"
                );
            } else if outcome.jobs_queued > 0 {
                info!(
                    message_type = ?message_type,
                    correlation_id = %outcome.correlation_id,
                    jobs_queued = outcome.jobs_queued,
                    "fetch triggered"
                );
            }
        }
    }
}

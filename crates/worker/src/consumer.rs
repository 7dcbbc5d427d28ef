//! Queue consumption loop with reconnect backoff and a breaker around
//! channel acquisition.
//!
//! Successful jobs are acked; failed jobs are nacked without requeue,
//! which routes them to the dead-letter stream. Read failures back off
//! `base * 2^(attempt-1)` capped at a maximum, and repeated failures open
//! the breaker so the loop short-circuits while the broker recovers.

use crate::processor::MessageProcessor;
use hotel_gateway_core::queue::{Delivery, JobConsumer};
use hotel_gateway_core::resilience::{BreakerConfig, CircuitBreaker};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

const RECONNECT_BASE: Duration = Duration::from_secs(1);
const RECONNECT_MAX: Duration = Duration::from_secs(30);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

pub struct WorkerConsumer {
    queue: JobConsumer,
    processor: Arc<MessageProcessor>,
    breaker: CircuitBreaker,
}

impl WorkerConsumer {
    pub fn new(queue: JobConsumer, processor: Arc<MessageProcessor>) -> Self {
        Self {
            queue,
            processor,
            breaker: CircuitBreaker::new(
                "queue-consumer",
                BreakerConfig {
                    max_failures: 3,
                    reset_timeout_seconds: 30,
                },
            ),
        }
    }

    /// Consume until the surrounding task is cancelled. Redelivers this
    /// consumer's unacked backlog before reading new entries.
    pub async fn run(&self) {
        info!(consumer = %self.queue.consumer_name(), "starting message consumption");

        match self.queue.fetch_pending().await {
            Ok(pending) if !pending.is_empty() => {
                info!(count = pending.len(), "redelivering pending messages");
                for delivery in pending {
                    self.dispatch(delivery).await;
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "failed to read pending entries"),
        }

        let mut read_failures: u32 = 0;
        loop {
            if self.breaker.try_acquire().is_err() {
                warn!("queue breaker open, waiting before next attempt");
                sleep(RECONNECT_MAX).await;
                continue;
            }

            match self.queue.fetch().await {
                Ok(deliveries) => {
                    self.breaker.record_success();
                    read_failures = 0;
                    for delivery in deliveries {
                        self.dispatch(delivery).await;
                    }
                }
                Err(e) => {
                    self.breaker.record_failure();
                    read_failures += 1;
                    let delay = reconnect_delay(read_failures);
                    error!(error = %e, attempt = read_failures, delay_ms = delay.as_millis() as u64, "queue read failed, backing off");
                    sleep(delay).await;
                }
            }
        }
    }

    async fn dispatch(&self, delivery: Delivery) {
        match self.processor.process(&delivery.payload).await {
            Ok(_) => {
                if let Err(e) = self.queue.ack(&delivery.entry_id).await {
                    error!(entry_id = %delivery.entry_id, error = %e, "failed to ack message");
                }
            }
            Err(e) => {
                error!(entry_id = %delivery.entry_id, error = %e, "failed to process message");
                if let Err(dlq_err) = self.queue.dead_letter(&delivery, &e.to_string()).await {
                    error!(entry_id = %delivery.entry_id, error = %dlq_err, "failed to dead-letter message");
                }
            }
        }
    }

    /// Periodic broker liveness probe; runs beside the consume loop.
    pub async fn run_health_checks(queue: JobConsumer) {
        let mut ticker = tokio::time::interval(HEALTH_CHECK_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = queue.health_check().await {
                warn!(error = %e, "queue health check failed");
            }
        }
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    let exp = RECONNECT_BASE.as_millis() as u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(exp.min(RECONNECT_MAX.as_millis() as u64))
}

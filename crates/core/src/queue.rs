//! Durable work queue on Redis Streams.
//!
//! The dispatcher publishes job batches with `XADD`; the returned stream
//! id is the durability confirm. Workers consume through a consumer group
//! (`XREADGROUP`), which gives at-least-once delivery: entries stay in the
//! pending list until `XACK`. A failed job is copied to the dead-letter
//! stream and then acked on the main stream, i.e. nack-without-requeue.

use crate::message::JobMessage;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed backoff schedule for publish retries.
const PUBLISH_BACKOFF: &[Duration] = &[
    Duration::from_secs(1),
    Duration::from_secs(5),
    Duration::from_secs(30),
    Duration::from_secs(120),
    Duration::from_secs(300),
];

/// Suffix appended to the main stream name for the dead-letter stream.
const DLQ_SUFFIX: &str = ":dlq";

/// Consumer group shared by the worker pool.
pub const CONSUMER_GROUP: &str = "hotel-workers";

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("publish failed after {attempts} attempts: {source}")]
    PublishExhausted {
        attempts: usize,
        source: redis::RedisError,
    },
}

/// Queue depth snapshot for health reporting.
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub pending: u64,
    pub dead_letter: u64,
}

/// One delivered queue entry, not yet acknowledged.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub entry_id: String,
    pub payload: String,
}

fn backoff_delay(attempt: usize) -> Duration {
    PUBLISH_BACKOFF[attempt.min(PUBLISH_BACKOFF.len() - 1)]
}

/// Publishing side of the work queue.
#[derive(Clone)]
pub struct JobPublisher {
    manager: ConnectionManager,
    stream: String,
}

impl JobPublisher {
    pub async fn connect(redis_url: &str, stream: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            stream: stream.to_string(),
        })
    }

    pub fn from_manager(manager: ConnectionManager, stream: &str) -> Self {
        Self {
            manager,
            stream: stream.to_string(),
        }
    }

    /// Publish one batch; every entry id returned by the broker is a
    /// durability confirm.
    pub async fn publish_batch(&self, jobs: &[JobMessage]) -> Result<usize, QueueError> {
        let mut conn = self.manager.clone();
        for job in jobs {
            let payload = serde_json::to_string(job)?;
            let entry_id: String = conn
                .xadd(&self.stream, "*", &[("payload", payload.as_str())])
                .await?;
            debug!(job_id = %job.id, kind = %job.kind, entry_id = %entry_id, "job published");
        }
        Ok(jobs.len())
    }

    /// Publish with the fixed 1s/5s/30s/2m/5m backoff schedule, capped at
    /// `max_attempts`. Exhaustion surfaces the last broker error.
    pub async fn publish_with_retry(
        &self,
        jobs: &[JobMessage],
        max_attempts: usize,
    ) -> Result<usize, QueueError> {
        let mut last_err: Option<redis::RedisError> = None;
        for attempt in 1..=max_attempts.max(1) {
            match self.publish_batch(jobs).await {
                Ok(count) => return Ok(count),
                Err(QueueError::Redis(e)) => {
                    warn!(attempt, error = %e, "publish failed, backing off");
                    last_err = Some(e);
                    tokio::time::sleep(backoff_delay(attempt - 1)).await;
                }
                Err(other) => return Err(other),
            }
        }
        Err(QueueError::PublishExhausted {
            attempts: max_attempts,
            source: last_err.expect("retry loop always records an error"),
        })
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let mut conn = self.manager.clone();
        let pending: u64 = conn.xlen(&self.stream).await.unwrap_or(0);
        let dead_letter: u64 = conn
            .xlen(format!("{}{}", self.stream, DLQ_SUFFIX))
            .await
            .unwrap_or(0);
        Ok(QueueStats {
            pending,
            dead_letter,
        })
    }
}

/// Consuming side of the work queue.
#[derive(Clone)]
pub struct JobConsumer {
    manager: ConnectionManager,
    stream: String,
    dlq_stream: String,
    consumer_name: String,
    prefetch: usize,
    block: Duration,
}

impl JobConsumer {
    pub async fn connect(
        redis_url: &str,
        stream: &str,
        prefetch: usize,
        block: Duration,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        let consumer = Self {
            manager,
            stream: stream.to_string(),
            dlq_stream: format!("{}{}", stream, DLQ_SUFFIX),
            consumer_name: format!("worker-{}", uuid::Uuid::new_v4()),
            prefetch: prefetch.max(1),
            block,
        };
        consumer.ensure_group().await?;
        info!(stream, consumer = %consumer.consumer_name, "queue consumer ready");
        Ok(consumer)
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Create the consumer group if it does not exist yet.
    async fn ensure_group(&self) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        let created: Result<String, redis::RedisError> = conn
            .xgroup_create_mkstream(&self.stream, CONSUMER_GROUP, "0")
            .await;
        match created {
            Ok(_) => Ok(()),
            // BUSYGROUP means another worker already created it.
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read up to `prefetch` new entries, blocking briefly when the stream
    /// is idle. Prefetch bounds in-flight work per consumer.
    pub async fn fetch(&self) -> Result<Vec<Delivery>, QueueError> {
        self.read(">").await
    }

    /// Re-read this consumer's pending entries (delivered but never
    /// acked, e.g. before a crash). Called once on startup so redelivery
    /// happens ahead of new work.
    pub async fn fetch_pending(&self) -> Result<Vec<Delivery>, QueueError> {
        self.read("0").await
    }

    async fn read(&self, cursor: &str) -> Result<Vec<Delivery>, QueueError> {
        let mut conn = self.manager.clone();
        let opts = StreamReadOptions::default()
            .group(CONSUMER_GROUP, &self.consumer_name)
            .count(self.prefetch)
            .block(self.block.as_millis() as usize);

        let reply: StreamReadReply = conn
            .xread_options(&[&self.stream], &[cursor], &opts)
            .await?;

        let mut deliveries = Vec::new();
        for key in reply.keys {
            for entry in key.ids {
                let Some(value) = entry.map.get("payload") else {
                    warn!(entry_id = %entry.id, "stream entry without payload field");
                    continue;
                };
                let payload: String = redis::from_redis_value(value)?;
                deliveries.push(Delivery {
                    entry_id: entry.id,
                    payload,
                });
            }
        }
        Ok(deliveries)
    }

    pub async fn ack(&self, entry_id: &str) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        let _: i32 = conn.xack(&self.stream, CONSUMER_GROUP, &[entry_id]).await?;
        Ok(())
    }

    /// Route a failed delivery to the dead-letter stream and ack it on
    /// the main stream so it is never redelivered here.
    pub async fn dead_letter(&self, delivery: &Delivery, error: &str) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        let _: String = conn
            .xadd(
                &self.dlq_stream,
                "*",
                &[
                    ("payload", delivery.payload.as_str()),
                    ("error", error),
                    ("failed_at", &chrono::Utc::now().to_rfc3339()),
                ],
            )
            .await?;
        let _: i32 = conn
            .xack(&self.stream, CONSUMER_GROUP, &[&delivery.entry_id])
            .await?;
        warn!(entry_id = %delivery.entry_id, error, "message routed to dead-letter queue");
        Ok(())
    }

    /// Liveness probe used by the consumer watchdog.
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{JobMessage, MessageKind};

    #[test]
    fn backoff_schedule_is_fixed_and_capped() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(5));
        assert_eq!(backoff_delay(2), Duration::from_secs(30));
        assert_eq!(backoff_delay(3), Duration::from_secs(120));
        assert_eq!(backoff_delay(4), Duration::from_secs(300));
        assert_eq!(backoff_delay(40), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn publish_consume_ack_round_trip() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            eprintln!("skipping: REDIS_URL not set");
            return;
        };
        let stream = format!("test_jobs_{}", uuid::Uuid::new_v4());
        let publisher = JobPublisher::connect(&url, &stream).await.unwrap();
        let consumer = JobConsumer::connect(&url, &stream, 10, Duration::from_millis(100))
            .await
            .unwrap();

        let job = JobMessage::new("row-1", MessageKind::UpdateHotel, 1641879);
        publisher.publish_batch(std::slice::from_ref(&job)).await.unwrap();

        let deliveries = consumer.fetch().await.unwrap();
        assert_eq!(deliveries.len(), 1);
        let parsed: JobMessage = serde_json::from_str(&deliveries[0].payload).unwrap();
        assert_eq!(parsed, job);

        consumer.ack(&deliveries[0].entry_id).await.unwrap();

        let mut conn = publisher.manager.clone();
        let _: () = redis::cmd("DEL").arg(&stream).query_async(&mut conn).await.unwrap();
    }

    #[tokio::test]
    async fn dead_letter_moves_message_off_main_stream() {
        let Ok(url) = std::env::var("REDIS_URL") else {
            eprintln!("skipping: REDIS_URL not set");
            return;
        };
        let stream = format!("test_dlq_{}", uuid::Uuid::new_v4());
        let publisher = JobPublisher::connect(&url, &stream).await.unwrap();
        let consumer = JobConsumer::connect(&url, &stream, 10, Duration::from_millis(100))
            .await
            .unwrap();

        let job = JobMessage::fetch_translation(317597, "es");
        publisher.publish_batch(std::slice::from_ref(&job)).await.unwrap();

        let deliveries = consumer.fetch().await.unwrap();
        assert_eq!(deliveries.len(), 1);
        consumer
            .dead_letter(&deliveries[0], "decode failure")
            .await
            .unwrap();

        let stats = publisher.stats().await.unwrap();
        assert_eq!(stats.dead_letter, 1);

        // Nothing left to deliver on the main stream.
        let again = consumer.fetch().await.unwrap();
        assert!(again.is_empty());

        let mut conn = publisher.manager.clone();
        let _: () = redis::cmd("DEL")
            .arg(&stream)
            .arg(format!("{}{}", stream, DLQ_SUFFIX))
            .query_async(&mut conn)
            .await
            .unwrap();
    }
}

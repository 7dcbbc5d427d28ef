//! Batch enumeration and publication of jobs.

use crate::discovery::JobSource;
use crate::rpc::{FetchRequest, FetchResponse, JobInfo, JOB_STATUS_PENDING};
use crate::Result;
use async_trait::async_trait;
use hotel_gateway_core::message::{JobMessage, MessageKind, RpcMessageType};
use hotel_gateway_core::{JobPublisher, QueueError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Publishing seam; production uses the Redis Streams publisher.
#[async_trait]
pub trait JobSink: Send + Sync {
    async fn publish(&self, jobs: &[JobMessage], max_attempts: usize)
        -> std::result::Result<usize, QueueError>;
}

pub struct QueuePublisherSink {
    publisher: JobPublisher,
}

impl QueuePublisherSink {
    pub fn new(publisher: JobPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl JobSink for QueuePublisherSink {
    async fn publish(
        &self,
        jobs: &[JobMessage],
        max_attempts: usize,
    ) -> std::result::Result<usize, QueueError> {
        self.publisher.publish_with_retry(jobs, max_attempts).await
    }
}

pub struct Orchestrator {
    source: Arc<dyn JobSource>,
    sink: Arc<dyn JobSink>,
    batch_size: i64,
    batch_delay: Duration,
    max_retry_attempts: usize,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn JobSource>,
        sink: Arc<dyn JobSink>,
        batch_size: i64,
        batch_delay: Duration,
        max_retry_attempts: usize,
    ) -> Self {
        Self {
            source,
            sink,
            batch_size: if batch_size > 0 { batch_size } else { 1000 },
            batch_delay,
            max_retry_attempts,
        }
    }

    /// Serve one RPC fetch request. Errors come back as `success=false`
    /// responses; partially published batches stand (the next tick will
    /// re-enumerate, and worker locks plus advanced `next_update_at`
    /// suppress duplicates).
    pub async fn process_fetch_request(&self, request: &FetchRequest) -> FetchResponse {
        let Some(kind) = request.message_type.message_kind() else {
            return FetchResponse {
                success: false,
                message: "invalid message type".to_string(),
                correlation_id: request.correlation_id.clone(),
                jobs_created: 0,
                jobs: None,
            };
        };

        match self.enqueue_jobs(kind, true).await {
            Ok((jobs_created, job_infos)) => {
                if jobs_created > 0 {
                    info!(
                        correlation_id = %request.correlation_id,
                        kind = %kind,
                        jobs_created,
                        force = request.force,
                        "jobs enqueued"
                    );
                }
                FetchResponse {
                    success: true,
                    message: "jobs enqueued".to_string(),
                    correlation_id: request.correlation_id.clone(),
                    jobs_created,
                    jobs: Some(job_infos),
                }
            }
            Err(e) => {
                error!(correlation_id = %request.correlation_id, kind = %kind, error = %e, "fetch request failed");
                FetchResponse {
                    success: false,
                    message: format!("enqueue failed: {}", e),
                    correlation_id: request.correlation_id.clone(),
                    jobs_created: 0,
                    jobs: None,
                }
            }
        }
    }

    /// One full enumeration per kind on startup, without job-info
    /// collection.
    pub async fn run_once(&self) {
        let mut total = 0usize;
        for kind in [
            MessageKind::UpdateHotel,
            MessageKind::FetchTranslation,
            MessageKind::FetchReview,
        ] {
            match self.enqueue_jobs(kind, false).await {
                Ok((count, _)) => total += count,
                Err(e) => {
                    error!(kind = %kind, error = %e, "startup batch processing failed");
                    return;
                }
            }
        }
        if total > 0 {
            info!(jobs_total = total, "startup jobs published");
        } else {
            info!("no startup jobs published");
        }
    }

    /// Enumerate every currently eligible entity for `kind` and publish a
    /// job per entity in cursor-paged batches.
    pub async fn enqueue_jobs(
        &self,
        kind: MessageKind,
        collect_job_infos: bool,
    ) -> Result<(usize, Vec<JobInfo>)> {
        let mut last_hotel_id: i64 = 0;
        let mut total = 0usize;
        let mut job_infos = Vec::new();

        loop {
            let (jobs, page_len) = match kind {
                MessageKind::FetchTranslation => {
                    let rows = self
                        .source
                        .missing_translations(last_hotel_id, self.batch_size)
                        .await?;
                    let len = rows.len();
                    if let Some(last) = rows.last() {
                        last_hotel_id = last.hotel_id;
                    }
                    let jobs: Vec<JobMessage> = rows
                        .iter()
                        .map(|row| JobMessage::fetch_translation(row.hotel_id, &row.missing_lang))
                        .collect();
                    (jobs, len)
                }
                MessageKind::FetchReview => {
                    let rows = self
                        .source
                        .hotels_without_reviews(last_hotel_id, self.batch_size)
                        .await?;
                    let len = rows.len();
                    if let Some(last) = rows.last() {
                        last_hotel_id = last.hotel_id;
                    }
                    let jobs: Vec<JobMessage> = rows
                        .iter()
                        .map(|row| JobMessage::new(row.id.clone(), kind, row.hotel_id))
                        .collect();
                    (jobs, len)
                }
                MessageKind::UpdateHotel | MessageKind::UpdateReview
                | MessageKind::UpdateTranslation => {
                    let rows = match kind {
                        MessageKind::UpdateHotel => {
                            self.source.due_hotels(last_hotel_id, self.batch_size).await?
                        }
                        MessageKind::UpdateReview => {
                            self.source.due_reviews(last_hotel_id, self.batch_size).await?
                        }
                        _ => {
                            self.source
                                .due_translations(last_hotel_id, self.batch_size)
                                .await?
                        }
                    };
                    let len = rows.len();
                    if let Some(last) = rows.last() {
                        last_hotel_id = last.hotel_id;
                    }
                    let jobs: Vec<JobMessage> = rows
                        .iter()
                        .map(|row| JobMessage::new(row.id.clone(), kind, row.hotel_id))
                        .collect();
                    (jobs, len)
                }
            };

            if page_len == 0 {
                break;
            }

            if collect_job_infos {
                job_infos.extend(jobs.iter().map(|job| JobInfo {
                    hotel_id: job
                        .data
                        .hotel_id
                        .as_deref()
                        .and_then(|raw| raw.parse().ok())
                        .unwrap_or(0),
                    message_type: rpc_type_for(kind),
                    status: JOB_STATUS_PENDING.to_string(),
                }));
            }

            self.sink.publish(&jobs, self.max_retry_attempts).await?;
            total += jobs.len();

            // A short page means the scan is complete.
            if (page_len as i64) < self.batch_size {
                break;
            }

            // Throttle DB and broker pressure between pages.
            tokio::time::sleep(self.batch_delay).await;
        }

        Ok((total, job_infos))
    }
}

fn rpc_type_for(kind: MessageKind) -> RpcMessageType {
    match kind {
        MessageKind::UpdateHotel => RpcMessageType::UpdateHotel,
        MessageKind::UpdateReview => RpcMessageType::UpdateReview,
        MessageKind::UpdateTranslation => RpcMessageType::UpdateTranslation,
        MessageKind::FetchTranslation => RpcMessageType::FetchMissingTranslations,
        MessageKind::FetchReview => RpcMessageType::FetchMissingReviews,
    }
}

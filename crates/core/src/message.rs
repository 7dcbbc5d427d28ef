//! Pipeline message kinds and the queue job envelope.
//!
//! Five job classes flow through the work queue. The `update_*` kinds
//! refresh rows whose `next_update_at` deadline has passed; the `fetch_*`
//! kinds backfill relations that are missing entirely (translations for a
//! configured language, hotels with zero reviews).

use serde::{Deserialize, Serialize};

/// Translation languages every hotel is expected to carry.
pub const DESIRED_LANGS: &[&str] = &["es", "fr"];

/// The five pipeline job classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    UpdateHotel,
    UpdateReview,
    UpdateTranslation,
    FetchTranslation,
    FetchReview,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::UpdateHotel => "update_hotel",
            MessageKind::UpdateReview => "update_review",
            MessageKind::UpdateTranslation => "update_translation",
            MessageKind::FetchTranslation => "fetch_translation",
            MessageKind::FetchReview => "fetch_review",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message types on the scheduler -> dispatcher RPC surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcMessageType {
    Unspecified,
    UpdateHotel,
    UpdateReview,
    UpdateTranslation,
    FetchMissingTranslations,
    FetchMissingReviews,
}

impl RpcMessageType {
    /// The queue message kind this RPC type dispatches as, if any.
    pub fn message_kind(&self) -> Option<MessageKind> {
        match self {
            RpcMessageType::Unspecified => None,
            RpcMessageType::UpdateHotel => Some(MessageKind::UpdateHotel),
            RpcMessageType::UpdateReview => Some(MessageKind::UpdateReview),
            RpcMessageType::UpdateTranslation => Some(MessageKind::UpdateTranslation),
            RpcMessageType::FetchMissingTranslations => Some(MessageKind::FetchTranslation),
            RpcMessageType::FetchMissingReviews => Some(MessageKind::FetchReview),
        }
    }
}

/// Identifiers the worker needs beyond the job id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// The JSON envelope published to the work queue.
///
/// `id` is the primary-key id of the source row, except for
/// `fetch_translation` jobs where it is `"<hotel_id>_<lang>"` (the target
/// row does not exist yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub data: JobData,
}

impl JobMessage {
    pub fn new(id: impl Into<String>, kind: MessageKind, hotel_id: i64) -> Self {
        Self {
            id: id.into(),
            kind,
            data: JobData {
                hotel_id: Some(hotel_id.to_string()),
                lang: None,
            },
        }
    }

    /// Build a missing-translation backfill job for `(hotel_id, lang)`.
    pub fn fetch_translation(hotel_id: i64, lang: &str) -> Self {
        Self {
            id: format!("{}_{}", hotel_id, lang),
            kind: MessageKind::FetchTranslation,
            data: JobData {
                hotel_id: Some(hotel_id.to_string()),
                lang: Some(lang.to_string()),
            },
        }
    }
}

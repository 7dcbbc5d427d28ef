//! Guest review rows, identity-stable on the upstream `review_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::new_row_id;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRecord {
    pub id: String,
    pub hotel_id: i64,
    pub review_id: i64,
    pub average_score: i32,
    pub country: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub review_type: Option<String>,
    pub name: Option<String>,
    pub date: DateTime<Utc>,
    pub headline: Option<String>,
    pub language: String,
    pub pros: Option<String>,
    pub cons: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub next_update_at: DateTime<Utc>,
}

impl ReviewRecord {
    pub fn new(hotel_id: i64, review_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: new_row_id(),
            hotel_id,
            review_id,
            average_score: 0,
            country: None,
            review_type: None,
            name: None,
            date: now,
            headline: None,
            language: "en".to_string(),
            pros: None,
            cons: None,
            source: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            next_update_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_review_defaults_language() {
        let review = ReviewRecord::new(317597, 900123);
        assert_eq!(review.language, "en");
        assert_eq!(review.review_id, 900123);
        assert!(!review.id.is_empty());
    }
}

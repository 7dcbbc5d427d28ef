//! Canonical entities and upstream API payloads.
//!
//! Hotels, reviews and translations form a hub-and-spoke relation keyed by
//! the external `hotel_id`; children carry only the key, never a reference
//! back to the parent row.

mod hotel;
mod review;
mod translation;
pub mod upstream;

pub use hotel::HotelRecord;
pub use review::ReviewRecord;
pub use translation::TranslationRecord;

/// Fresh primary-key id for a new row.
pub fn new_row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Status every non-deleted row is forced back to on update.
pub const STATUS_ACTIVE: &str = "active";

/// Provenance marker for rows written by this pipeline.
pub const SOURCE_PROPERTY_API: &str = "property_api";

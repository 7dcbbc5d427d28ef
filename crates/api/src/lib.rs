//! Hotel Gateway Read API
//!
//! Low-latency hotel lookups with a cache -> store -> upstream fallback
//! chain, full-text and faceted search delegated to the external index,
//! suggestion endpoints, and the operator-facing sync trigger that
//! rebuilds the index from the canonical store.

pub mod error;
pub mod handlers;
pub mod index;
pub mod rate_limit;
pub mod repository;
pub mod search;
pub mod state;
pub mod sync;

pub use error::ApiError;
pub use index::TypesenseIndex;
pub use repository::{HotelReadRepository, HotelView};
pub use search::{HotelDocument, SearchEngine, SearchParams, SearchResult, Suggestion};
pub use state::AppState;
pub use sync::{parse_since_timestamp, SyncOptions, SyncReport, SyncService};

pub type Result<T> = std::result::Result<T, ApiError>;

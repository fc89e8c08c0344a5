//! Typo-tolerant, in-memory document search engine organized into named,
//! schema-backed collections.
//!
//! Each collection ingests JSON documents, builds inverted and numeric
//! indices over them, and answers ranked queries combining multi-token text
//! matching (with prefix and typo tolerance), structured filters, facet
//! counting and multi-field sort. A narrow ordered key-value [`Store`]
//! persists documents and id mappings so the in-memory state can be
//! reconstructed across restarts.

pub mod analysis;
pub mod core;
pub mod index;
pub mod query;
pub mod schema;
pub mod search;
pub mod store;

pub use crate::core::collection::Collection;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::manager::CollectionManager;
pub use crate::core::types::SeqId;
pub use crate::query::{RankingMode, SearchRequest, SortBy};
pub use crate::schema::{Field, FieldType, Schema};
pub use crate::search::{FacetCount, FacetCounts, SearchResponse};
pub use crate::store::{MemStore, Store};

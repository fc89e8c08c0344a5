pub mod cache;
pub mod executor;
pub mod ranking;
pub mod results;

pub use results::{FacetCount, FacetCounts, SearchResponse};

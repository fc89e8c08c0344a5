pub mod filter;
pub mod request;

pub use request::{RankingMode, SearchRequest, SortBy};

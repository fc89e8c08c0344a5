/// Internal monotonic identifier for a document within a collection.
/// Assigned densely from 1 and never reused.
pub type SeqId = u32;

/// A parsed document body: the JSON object handed to `add`.
pub type Document = serde_json::Map<String, serde_json::Value>;

use serde::Serialize;

/// Value/count pair for one facet value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Counts for one facet field over the full unpaginated matched set,
/// sorted by count descending, then value ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCounts {
    pub field_name: String,
    pub counts: Vec<FacetCount>,
}

/// Stable search response shape. Each hit is the stored document, `id`
/// included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub found: u64,
    pub hits: Vec<serde_json::Value>,
    pub facet_counts: Vec<FacetCounts>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        SearchResponse {
            found: 0,
            hits: Vec::new(),
            facet_counts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_stable_field_order() {
        let response = SearchResponse {
            found: 1,
            hits: vec![serde_json::json!({"id": "7", "title": "z"})],
            facet_counts: vec![FacetCounts {
                field_name: "tags".to_string(),
                counts: vec![FacetCount {
                    value: "gold".to_string(),
                    count: 4,
                }],
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.starts_with("{\"found\":1,\"hits\":"));
        assert!(json.contains("\"field_name\":\"tags\""));
        assert!(json.contains("{\"value\":\"gold\",\"count\":4}"));
    }
}

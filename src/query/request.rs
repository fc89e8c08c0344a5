/// How candidate tokens and matched documents are scored.
///
/// `Frequency` favors tokens occurring in many documents; `MaxScore` favors
/// tokens whose documents carry high token-ranking-field values. A single
/// parameter consumed at scoring time; the pipeline does not branch on it
/// anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RankingMode {
    #[default]
    Frequency,
    MaxScore,
}

/// One sort directive. The direction is matched case-insensitively when the
/// search runs, so `"DESC"`, `"desc"` and `"dEsc"` are equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortBy {
    pub field: String,
    pub order: String,
}

impl SortBy {
    pub fn new(field: &str, order: &str) -> Self {
        SortBy {
            field: field.to_string(),
            order: order.to_string(),
        }
    }
}

/// Parameters of a single search call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchRequest {
    pub query: String,
    /// Fields to match against, highest priority first.
    pub query_fields: Vec<String>,
    /// Conjunctive filter expression; empty means no filtering.
    pub filter: String,
    /// Facet fields to count over the full matched set.
    pub facets: Vec<String>,
    pub sort_by: Vec<SortBy>,
    /// Per-token edit distance budget, clamped to 2.
    pub num_typos: u8,
    /// 1-based page; 0 and 1 both mean the first page.
    pub page: usize,
    pub per_page: usize,
    pub ranking_mode: RankingMode,
    /// Treat the last query token as a prefix.
    pub prefix: bool,
}

impl SearchRequest {
    pub fn new(query: &str, query_fields: &[&str]) -> Self {
        SearchRequest {
            query: query.to_string(),
            query_fields: query_fields.iter().map(|f| f.to_string()).collect(),
            ..SearchRequest::default()
        }
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            query: String::new(),
            query_fields: Vec::new(),
            filter: String::new(),
            facets: Vec::new(),
            sort_by: Vec::new(),
            num_typos: 2,
            page: 1,
            per_page: 10,
            ranking_mode: RankingMode::Frequency,
            prefix: false,
        }
    }
}

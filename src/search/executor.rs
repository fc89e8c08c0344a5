use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use roaring::RoaringBitmap;
use tracing::debug;

use crate::analysis::tokenize;
use crate::core::collection::CollectionInner;
use crate::core::error::{Error, Result};
use crate::core::types::SeqId;
use crate::index::posting::PostingList;
use crate::index::sorts::SortColumn;
use crate::index::trie::TermMatch;
use crate::query::filter::{self, FilterClause};
use crate::query::{RankingMode, SearchRequest};
use crate::schema::Schema;
use crate::search::ranking::{self, DocMatch};
use crate::search::results::{FacetCount, FacetCounts, SearchResponse};

/// Cost charged per query token that has no candidates under the typo
/// budget. Far above any real edit cost.
const SKIP_PENALTY: u32 = 100;

/// Candidate terms considered per query token after priority ordering.
const MAX_CANDIDATES: usize = 4;

/// Candidate combinations evaluated per field before the sweep gives up.
const COMBINATION_LIMIT: usize = 100;

/// Runs one search against a consistent snapshot of a collection's indices.
/// Holds only borrows; the caller keeps the read lock for the duration.
pub(crate) struct QueryExecutor<'a> {
    pub schema: &'a Schema,
    pub inner: &'a CollectionInner,
}

impl<'a> QueryExecutor<'a> {
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.validate_fields(request)?;
        let sorts = self.resolve_sorts(request)?;

        let allowed = match self.allowed_set(request) {
            Some(allowed) => allowed,
            None => {
                // Filters are free text; anything unparseable matches nothing
                debug!(filter = %request.filter, "filter did not parse, returning empty result");
                return Ok(SearchResponse::empty());
            }
        };

        let tokens: Vec<String> = tokenize(&request.query)
            .into_iter()
            .map(|t| t.text)
            .collect();

        // Candidate enumeration stops once this many documents are in hand
        let target = request.page.max(1).saturating_mul(request.per_page);

        let mut matches: HashMap<SeqId, DocMatch> = HashMap::new();
        if !tokens.is_empty() && !allowed.is_empty() {
            let mut active = tokens;
            loop {
                // Every field gets a look each round, even once the page is
                // full: a lower-priority field can still hold a cheaper
                // match that the ranking key puts first.
                for (priority, field) in request.query_fields.iter().enumerate() {
                    self.search_field(
                        field,
                        priority as u32,
                        &active,
                        &allowed,
                        request,
                        target,
                        &mut matches,
                    );
                }
                if matches.len() >= target || active.len() <= 1 {
                    break;
                }
                // Still short of a page: drop the leftmost token and retry
                // with the shorter query. Documents matched so far keep
                // their original (better) match.
                active.remove(0);
            }
        }

        let mut ranked: Vec<DocMatch> = matches.into_values().collect();
        ranking::rank(&mut ranked, &sorts);

        self.build_response(request, &ranked)
    }

    fn validate_fields(&self, request: &SearchRequest) -> Result<()> {
        for name in &request.query_fields {
            if self.schema.search_field(name).is_none() {
                if self.schema.is_declared(name) {
                    return Err(Error::invalid(format!(
                        "Search field `{}` should be a string or a string array.",
                        name
                    )));
                }
                return Err(Error::invalid(format!(
                    "Could not find a search field named `{}` in the schema.",
                    name
                )));
            }
        }
        for name in &request.facets {
            if self.schema.facet_field(name).is_none() {
                return Err(Error::invalid(format!(
                    "Could not find a facet field named `{}` in the schema.",
                    name
                )));
            }
        }
        Ok(())
    }

    fn resolve_sorts(&self, request: &SearchRequest) -> Result<Vec<(&'a SortColumn, bool)>> {
        let mut sorts = Vec::with_capacity(request.sort_by.len());
        for sort in &request.sort_by {
            // Only scalar sort fields have columns; arrays are filter-only
            let scalar = self.schema.scalar_sort_fields().any(|f| f.name == sort.field);
            let column = if scalar {
                self.inner.sort_columns.get(&sort.field)
            } else {
                None
            };
            let Some(column) = column else {
                return Err(Error::invalid(format!(
                    "Could not find a sort field named `{}` in the schema.",
                    sort.field
                )));
            };
            let ascending = if sort.order.eq_ignore_ascii_case("asc") {
                true
            } else if sort.order.eq_ignore_ascii_case("desc") {
                false
            } else {
                return Err(Error::invalid(format!(
                    "Order of sort field `{}` must be either ASC or DESC.",
                    sort.field
                )));
            };
            sorts.push((column, ascending));
        }
        Ok(sorts)
    }

    /// Sequence ids passing the filter, or None when the filter is malformed.
    fn allowed_set(&self, request: &SearchRequest) -> Option<RoaringBitmap> {
        if request.filter.is_empty() {
            return Some(self.inner.live.clone());
        }
        let clauses = filter::parse(&request.filter, self.schema)?;
        let mut allowed = self.inner.live.clone();
        for clause in &clauses {
            allowed &= self.eval_clause(clause);
            if allowed.is_empty() {
                break;
            }
        }
        Some(allowed)
    }

    fn eval_clause(&self, clause: &FilterClause) -> RoaringBitmap {
        match clause {
            FilterClause::NumCompare { field, op, value } => self
                .inner
                .numeric
                .get(field)
                .map(|index| index.compare(*op, *value))
                .unwrap_or_default(),
            FilterClause::NumIn { field, values } => self
                .inner
                .numeric
                .get(field)
                .map(|index| index.in_list(values))
                .unwrap_or_default(),
            FilterClause::TagEq { field, value } => self
                .inner
                .tags
                .get(field)
                .and_then(|index| index.get(value))
                .cloned()
                .unwrap_or_default(),
            FilterClause::TagIn { field, values } => {
                let mut out = RoaringBitmap::new();
                if let Some(index) = self.inner.tags.get(field) {
                    for value in values {
                        if let Some(ids) = index.get(value) {
                            out |= ids;
                        }
                    }
                }
                out
            }
        }
    }

    /// Sweeps one query field, stopping its own combination enumeration
    /// once `target` documents are collected.
    #[allow(clippy::too_many_arguments)]
    fn search_field(
        &self,
        field: &str,
        priority: u32,
        tokens: &[String],
        allowed: &RoaringBitmap,
        request: &SearchRequest,
        target: usize,
        matches: &mut HashMap<SeqId, DocMatch>,
    ) {
        let Some(trie) = self.inner.tries.get(field) else {
            return;
        };

        // Candidate index terms per token. Prefix expansion applies to the
        // last token only and is mutually exclusive with fuzzy on it.
        let mut token_candidates: Vec<Vec<TermMatch<'_>>> = Vec::new();
        let mut skipped = 0u32;
        for (i, token) in tokens.iter().enumerate() {
            let prefix_token = request.prefix && i + 1 == tokens.len();
            let mut candidates = if prefix_token {
                trie.prefix(token)
            } else {
                trie.fuzzy(token, request.num_typos)
            };
            if candidates.is_empty() {
                skipped += 1;
                continue;
            }
            let mode = request.ranking_mode;
            candidates.sort_by(|a, b| {
                a.cost
                    .cmp(&b.cost)
                    .then(self.candidate_score(b, mode).cmp(&self.candidate_score(a, mode)))
                    .then(a.term.cmp(&b.term))
            });
            candidates.truncate(MAX_CANDIDATES);
            token_candidates.push(candidates);
        }
        if token_candidates.is_empty() {
            return;
        }

        let match_count = token_candidates.len() as u32;
        let skip_cost = skipped * SKIP_PENALTY;

        for (combo_cost, indices) in combinations(&token_candidates) {
            let combo: Vec<&TermMatch> = indices
                .iter()
                .zip(&token_candidates)
                .map(|(&i, candidates)| &candidates[i])
                .collect();
            let lists: Vec<&PostingList> = combo.iter().map(|m| &m.entry.posting).collect();
            let score = self.combination_score(&combo, request.ranking_mode);

            for seq_id in PostingList::intersect(&lists, allowed) {
                if matches.contains_key(&seq_id) {
                    continue; // first match is the best match
                }
                let diff = PostingList::min_diff(&lists, seq_id);
                matches.insert(
                    seq_id,
                    DocMatch {
                        seq_id,
                        match_count,
                        total_cost: combo_cost + skip_cost,
                        diff,
                        field_priority: priority,
                        score,
                    },
                );
            }
            if matches.len() >= target {
                return;
            }
        }
    }

    fn candidate_score(&self, candidate: &TermMatch, mode: RankingMode) -> i64 {
        match mode {
            RankingMode::MaxScore if self.schema.token_ranking_field.is_some() => {
                candidate.entry.max_rank_score
            }
            _ => candidate.entry.posting.doc_freq() as i64,
        }
    }

    fn combination_score(&self, combo: &[&TermMatch], mode: RankingMode) -> i64 {
        match mode {
            RankingMode::MaxScore if self.schema.token_ranking_field.is_some() => combo
                .iter()
                .map(|m| m.entry.max_rank_score)
                .max()
                .unwrap_or(0),
            _ => combo
                .iter()
                .map(|m| m.entry.posting.doc_freq() as i64)
                .sum(),
        }
    }

    fn build_response(&self, request: &SearchRequest, ranked: &[DocMatch]) -> Result<SearchResponse> {
        let found = ranked.len() as u64;
        let page = request.page.max(1);
        let start = (page - 1).saturating_mul(request.per_page);

        let mut hits = Vec::new();
        for doc_match in ranked.iter().skip(start).take(request.per_page) {
            let doc = self
                .inner
                .docs
                .get(&doc_match.seq_id)
                .cloned()
                .ok_or_else(|| {
                    Error::internal(format!(
                        "Sequence id {} has no stored document.",
                        doc_match.seq_id
                    ))
                })?;
            hits.push(doc);
        }

        // Facets count over the full matched set, not the page window
        let matched: RoaringBitmap = ranked.iter().map(|m| m.seq_id).collect();
        let mut facet_counts = Vec::with_capacity(request.facets.len());
        for name in &request.facets {
            let mut counts: Vec<FacetCount> = match self.inner.tags.get(name) {
                Some(index) => index
                    .iter()
                    .filter_map(|(value, ids)| {
                        let count = ids.intersection_len(&matched);
                        (count > 0).then(|| FacetCount {
                            value: value.clone(),
                            count,
                        })
                    })
                    .collect(),
                None => Vec::new(),
            };
            counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.value.cmp(&b.value)));
            facet_counts.push(FacetCounts {
                field_name: name.clone(),
                counts,
            });
        }

        debug!(query = %request.query, found, "search complete");
        Ok(SearchResponse {
            found,
            hits,
            facet_counts,
        })
    }
}

/// Index tuples into the per-token candidate lists, cheapest summed edit
/// cost first, ties resolved towards earlier candidates of earlier tokens.
fn combinations(token_candidates: &[Vec<TermMatch>]) -> Vec<(u32, Vec<usize>)> {
    let cost_of = |indices: &[usize]| -> u32 {
        indices
            .iter()
            .zip(token_candidates)
            .map(|(&i, candidates)| candidates[i].cost as u32)
            .sum()
    };

    let mut heap = BinaryHeap::new();
    let mut seen = HashSet::new();
    let start = vec![0usize; token_candidates.len()];
    heap.push(Reverse((cost_of(&start), start.clone())));
    seen.insert(start);

    let mut out = Vec::new();
    while let Some(Reverse((cost, indices))) = heap.pop() {
        out.push((cost, indices.clone()));
        if out.len() >= COMBINATION_LIMIT {
            break;
        }
        for slot in 0..indices.len() {
            if indices[slot] + 1 < token_candidates[slot].len() {
                let mut next = indices.clone();
                next[slot] += 1;
                if seen.insert(next.clone()) {
                    heap.push(Reverse((cost_of(&next), next)));
                }
            }
        }
    }
    out
}

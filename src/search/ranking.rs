use std::cmp::Ordering;

use crate::core::types::SeqId;
use crate::index::sorts::SortColumn;

/// Match signals recorded for one document during the candidate sweep.
#[derive(Debug, Clone, Copy)]
pub struct DocMatch {
    pub seq_id: SeqId,
    /// Non-skipped query tokens present in the document.
    pub match_count: u32,
    /// Summed candidate edit costs plus skip penalties.
    pub total_cost: u32,
    /// Positional phrase penalty over the non-skipped tokens.
    pub diff: u32,
    /// Index of the query field that produced the match (lower wins).
    pub field_priority: u32,
    /// Frequency or token-ranking score of the matched candidates.
    pub score: i64,
}

/// Orders matches by the composite ranking key:
/// match count desc, typo cost asc, phrase diff asc, field priority asc,
/// score desc, then the declared sorts, then sequence id desc.
///
/// Every comparison is on totally ordered integers or a single typed
/// column, so the key is a total order and rankings are deterministic.
pub fn rank(matches: &mut [DocMatch], sorts: &[(&SortColumn, bool)]) {
    matches.sort_unstable_by(|a, b| {
        b.match_count
            .cmp(&a.match_count)
            .then(a.total_cost.cmp(&b.total_cost))
            .then(a.diff.cmp(&b.diff))
            .then(a.field_priority.cmp(&b.field_priority))
            .then(b.score.cmp(&a.score))
            .then_with(|| {
                for (column, ascending) in sorts {
                    let ord = column.compare(a.seq_id, b.seq_id);
                    let ord = if *ascending { ord } else { ord.reverse() };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                b.seq_id.cmp(&a.seq_id)
            })
    });
}

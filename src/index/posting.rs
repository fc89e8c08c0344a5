use roaring::RoaringBitmap;

use crate::core::types::SeqId;

/// A single document entry within a posting list.
#[derive(Debug, Clone)]
pub struct PostingEntry {
    pub seq_id: SeqId,
    pub positions: Vec<u32>, // Strictly increasing token positions
}

/// Per-term ordered sequence of (sequence id, positions).
/// Note: kept sorted by seq_id so intersections are linear merges.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    entries: Vec<PostingEntry>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of documents holding the term.
    pub fn doc_freq(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn insert(&mut self, seq_id: SeqId, positions: Vec<u32>) {
        let entry = PostingEntry { seq_id, positions };
        match self.entries.binary_search_by_key(&seq_id, |e| e.seq_id) {
            Ok(pos) => self.entries[pos] = entry,
            Err(pos) => self.entries.insert(pos, entry),
        }
    }

    pub fn remove(&mut self, seq_id: SeqId) -> bool {
        match self.entries.binary_search_by_key(&seq_id, |e| e.seq_id) {
            Ok(pos) => {
                self.entries.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn get(&self, seq_id: SeqId) -> Option<&PostingEntry> {
        self.entries
            .binary_search_by_key(&seq_id, |e| e.seq_id)
            .ok()
            .map(|pos| &self.entries[pos])
    }

    pub fn contains(&self, seq_id: SeqId) -> bool {
        self.get(seq_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PostingEntry> {
        self.entries.iter()
    }

    /// Sequence ids present in every list and in `allowed`, ascending.
    pub fn intersect(lists: &[&PostingList], allowed: &RoaringBitmap) -> Vec<SeqId> {
        if lists.is_empty() {
            return Vec::new();
        }
        // Drive the merge from the shortest list
        let shortest = match lists.iter().min_by_key(|l| l.len()) {
            Some(list) => *list,
            None => return Vec::new(),
        };
        shortest
            .iter()
            .map(|entry| entry.seq_id)
            .filter(|&seq_id| allowed.contains(seq_id))
            .filter(|&seq_id| lists.iter().all(|list| list.contains(seq_id)))
            .collect()
    }

    /// Positional phrase penalty for a document present in every list.
    ///
    /// Picks one occurrence per term minimizing the window spanning all of
    /// them; the penalty is that window's span minus (k - 1), so a contiguous
    /// in-order phrase scores 0 and proximate occurrences score low. A single
    /// list always scores 0.
    pub fn min_diff(lists: &[&PostingList], seq_id: SeqId) -> u32 {
        if lists.len() < 2 {
            return 0;
        }
        let mut position_lists: Vec<&[u32]> = Vec::with_capacity(lists.len());
        for list in lists {
            match list.get(seq_id) {
                Some(entry) if !entry.positions.is_empty() => {
                    position_lists.push(&entry.positions)
                }
                _ => return u32::MAX, // caller guarantees membership
            }
        }

        let k = position_lists.len();
        let mut cursors = vec![0usize; k];
        let mut best_span = u32::MAX;
        loop {
            let mut min_pos = u32::MAX;
            let mut max_pos = 0u32;
            let mut min_list = 0usize;
            for (i, positions) in position_lists.iter().enumerate() {
                let pos = positions[cursors[i]];
                if pos < min_pos {
                    min_pos = pos;
                    min_list = i;
                }
                if pos > max_pos {
                    max_pos = pos;
                }
            }
            best_span = best_span.min(max_pos - min_pos);
            cursors[min_list] += 1;
            if cursors[min_list] == position_lists[min_list].len() {
                break;
            }
        }

        best_span.saturating_sub(k as u32 - 1)
    }
}

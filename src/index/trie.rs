use std::collections::BTreeMap;

use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA, SINK_STATE};

use crate::core::types::SeqId;
use crate::index::posting::PostingList;

/// Payload stored at a terminal trie node.
#[derive(Debug, Default)]
pub struct TermEntry {
    pub posting: PostingList,
    /// Highest token-ranking-field value among documents holding this term.
    /// Stays 0 when the collection declares no token ranking field.
    pub max_rank_score: i64,
}

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<u8, TrieNode>, // BTreeMap keeps traversal lexicographic
    entry: Option<TermEntry>,
}

/// A dictionary term produced by a lookup.
#[derive(Debug)]
pub struct TermMatch<'a> {
    pub term: String,
    pub cost: u8,
    pub entry: &'a TermEntry,
}

/// Term dictionary: a byte trie supporting exact lookup, prefix enumeration
/// and bounded edit-distance enumeration.
///
/// Fuzzy lookup walks the trie while feeding each byte into a Levenshtein
/// DFA; subtrees whose state hits the automaton sink can match nothing and
/// are pruned, and terminal nodes read their exact cost off the final state.
pub struct TermTrie {
    root: TrieNode,
    term_count: usize,
    dfa_builders: Vec<LevenshteinAutomatonBuilder>, // index = max edit distance
}

impl TermTrie {
    pub fn new() -> Self {
        TermTrie {
            root: TrieNode::default(),
            term_count: 0,
            dfa_builders: (0..=2)
                .map(|distance| LevenshteinAutomatonBuilder::new(distance, true))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.term_count
    }

    pub fn is_empty(&self) -> bool {
        self.term_count == 0
    }

    pub fn insert(&mut self, term: &str, seq_id: SeqId, positions: Vec<u32>, rank_score: i64) {
        let mut node = &mut self.root;
        for &byte in term.as_bytes() {
            node = node.children.entry(byte).or_default();
        }
        if node.entry.is_none() {
            self.term_count += 1;
        }
        let entry = node.entry.get_or_insert_with(TermEntry::default);
        entry.posting.insert(seq_id, positions);
        entry.max_rank_score = entry.max_rank_score.max(rank_score);
    }

    /// Removes one document from a term's posting, pruning the term when its
    /// posting empties and refreshing `max_rank_score` from the survivors.
    pub fn remove_doc(&mut self, term: &str, seq_id: SeqId, rank_of: &dyn Fn(SeqId) -> i64) {
        let removed = Self::remove_rec(&mut self.root, term.as_bytes(), seq_id, rank_of);
        if removed {
            self.term_count -= 1;
        }
    }

    // Returns true when the term itself was erased.
    fn remove_rec(
        node: &mut TrieNode,
        suffix: &[u8],
        seq_id: SeqId,
        rank_of: &dyn Fn(SeqId) -> i64,
    ) -> bool {
        match suffix.split_first() {
            None => {
                let Some(entry) = node.entry.as_mut() else {
                    return false;
                };
                if !entry.posting.remove(seq_id) {
                    return false;
                }
                if entry.posting.is_empty() {
                    node.entry = None;
                    return true;
                }
                entry.max_rank_score = entry
                    .posting
                    .iter()
                    .map(|e| rank_of(e.seq_id))
                    .max()
                    .unwrap_or(0);
                false
            }
            Some((&byte, rest)) => {
                let Some(child) = node.children.get_mut(&byte) else {
                    return false;
                };
                let erased = Self::remove_rec(child, rest, seq_id, rank_of);
                if child.entry.is_none() && child.children.is_empty() {
                    node.children.remove(&byte);
                }
                erased
            }
        }
    }

    pub fn exact(&self, term: &str) -> Option<&TermEntry> {
        let mut node = &self.root;
        for &byte in term.as_bytes() {
            node = node.children.get(&byte)?;
        }
        node.entry.as_ref()
    }

    /// Every term starting with `prefix`, in lexicographic order, cost 0.
    pub fn prefix(&self, prefix: &str) -> Vec<TermMatch<'_>> {
        let mut node = &self.root;
        for &byte in prefix.as_bytes() {
            match node.children.get(&byte) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }
        let mut out = Vec::new();
        let mut key = prefix.as_bytes().to_vec();
        Self::collect_subtree(node, &mut key, &mut out);
        out
    }

    fn collect_subtree<'a>(node: &'a TrieNode, key: &mut Vec<u8>, out: &mut Vec<TermMatch<'a>>) {
        if let Some(entry) = &node.entry {
            out.push(TermMatch {
                term: String::from_utf8_lossy(key).into_owned(),
                cost: 0,
                entry,
            });
        }
        for (&byte, child) in &node.children {
            key.push(byte);
            Self::collect_subtree(child, key, out);
            key.pop();
        }
    }

    /// Every term within `max_cost` edits of `term`, with its actual cost.
    /// Stable order: cost ascending, document frequency descending, term
    /// lexicographic ascending.
    pub fn fuzzy(&self, term: &str, max_cost: u8) -> Vec<TermMatch<'_>> {
        let max_cost = max_cost.min(2);
        let dfa = self.dfa_builders[max_cost as usize].build_dfa(term);
        let mut out = Vec::new();
        let mut key = Vec::new();
        Self::fuzzy_walk(&self.root, &dfa, dfa.initial_state(), &mut key, &mut out);
        out.sort_by(|a, b| {
            a.cost
                .cmp(&b.cost)
                .then(b.entry.posting.doc_freq().cmp(&a.entry.posting.doc_freq()))
                .then(a.term.cmp(&b.term))
        });
        out
    }

    fn fuzzy_walk<'a>(
        node: &'a TrieNode,
        dfa: &DFA,
        state: u32,
        key: &mut Vec<u8>,
        out: &mut Vec<TermMatch<'a>>,
    ) {
        if let Some(entry) = &node.entry {
            if let Distance::Exact(cost) = dfa.distance(state) {
                out.push(TermMatch {
                    term: String::from_utf8_lossy(key).into_owned(),
                    cost,
                    entry,
                });
            }
        }
        for (&byte, child) in &node.children {
            let next = dfa.transition(state, byte);
            if next == SINK_STATE {
                continue;
            }
            key.push(byte);
            Self::fuzzy_walk(child, dfa, next, key, out);
            key.pop();
        }
    }
}

impl Default for TermTrie {
    fn default() -> Self {
        TermTrie::new()
    }
}

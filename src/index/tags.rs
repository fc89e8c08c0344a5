use std::collections::HashMap;

use roaring::RoaringBitmap;

use crate::core::types::SeqId;

/// Exact stored value -> documents holding it.
///
/// Backs `field: value` filters and facet counting. Lookups are byte-exact
/// against the stored form; no tokenization or case folding happens here.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    map: HashMap<String, RoaringBitmap>,
}

impl TagIndex {
    pub fn new() -> Self {
        TagIndex {
            map: HashMap::new(),
        }
    }

    pub fn insert(&mut self, value: &str, seq_id: SeqId) {
        self.map.entry(value.to_string()).or_default().insert(seq_id);
    }

    pub fn remove(&mut self, value: &str, seq_id: SeqId) {
        if let Some(ids) = self.map.get_mut(value) {
            ids.remove(seq_id);
            if ids.is_empty() {
                self.map.remove(value);
            }
        }
    }

    pub fn get(&self, value: &str) -> Option<&RoaringBitmap> {
        self.map.get(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RoaringBitmap)> {
        self.map.iter()
    }
}

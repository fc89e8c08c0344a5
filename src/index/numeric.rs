use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

use roaring::RoaringBitmap;

use crate::core::types::SeqId;
use crate::schema::FieldType;

/// Total-order wrapper so f64 can key a BTreeMap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatKey(pub f64);

impl Eq for FloatKey {}

impl PartialOrd for FloatKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Comparator accepted by numeric range filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

/// A numeric literal, typed to match the declared field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Int(i64),
    Float(f64),
}

impl NumericValue {
    /// Extracts a value of the field's element type from document JSON.
    /// Ingestion validation guarantees this succeeds for accepted documents.
    pub fn from_json(field_type: FieldType, value: &serde_json::Value) -> Option<NumericValue> {
        if field_type.is_float() {
            value.as_f64().map(NumericValue::Float)
        } else {
            value.as_i64().map(NumericValue::Int)
        }
    }
}

/// Ordered map from a numeric field's value to the documents holding it.
/// Array fields insert one membership per element.
#[derive(Debug, Clone)]
pub enum NumericIndex {
    Int(BTreeMap<i64, RoaringBitmap>),
    Float(BTreeMap<FloatKey, RoaringBitmap>),
}

impl NumericIndex {
    pub fn for_type(field_type: FieldType) -> Self {
        if field_type.is_float() {
            NumericIndex::Float(BTreeMap::new())
        } else {
            NumericIndex::Int(BTreeMap::new())
        }
    }

    pub fn insert(&mut self, value: NumericValue, seq_id: SeqId) {
        match (self, value) {
            (NumericIndex::Int(map), NumericValue::Int(v)) => {
                map.entry(v).or_default().insert(seq_id);
            }
            (NumericIndex::Float(map), NumericValue::Float(v)) => {
                map.entry(FloatKey(v)).or_default().insert(seq_id);
            }
            _ => debug_assert!(false, "numeric value type mismatches the index"),
        }
    }

    pub fn remove(&mut self, value: NumericValue, seq_id: SeqId) {
        match (self, value) {
            (NumericIndex::Int(map), NumericValue::Int(v)) => {
                if let Some(ids) = map.get_mut(&v) {
                    ids.remove(seq_id);
                    if ids.is_empty() {
                        map.remove(&v);
                    }
                }
            }
            (NumericIndex::Float(map), NumericValue::Float(v)) => {
                if let Some(ids) = map.get_mut(&FloatKey(v)) {
                    ids.remove(seq_id);
                    if ids.is_empty() {
                        map.remove(&FloatKey(v));
                    }
                }
            }
            _ => debug_assert!(false, "numeric value type mismatches the index"),
        }
    }

    /// Documents satisfying `value <op> bound`, as a union of range scans.
    pub fn compare(&self, op: CompareOp, bound: NumericValue) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        match (self, bound) {
            (NumericIndex::Int(map), NumericValue::Int(v)) => {
                let range: Vec<&RoaringBitmap> = match op {
                    CompareOp::Lt => map.range((Unbounded, Excluded(v))).map(|(_, b)| b).collect(),
                    CompareOp::Lte => map.range((Unbounded, Included(v))).map(|(_, b)| b).collect(),
                    CompareOp::Gt => map.range((Excluded(v), Unbounded)).map(|(_, b)| b).collect(),
                    CompareOp::Gte => map.range((Included(v), Unbounded)).map(|(_, b)| b).collect(),
                    CompareOp::Eq => map.get(&v).into_iter().collect(),
                };
                for ids in range {
                    out |= ids;
                }
            }
            (NumericIndex::Float(map), NumericValue::Float(v)) => {
                let key = FloatKey(v);
                let range: Vec<&RoaringBitmap> = match op {
                    CompareOp::Lt => map.range((Unbounded, Excluded(key))).map(|(_, b)| b).collect(),
                    CompareOp::Lte => map.range((Unbounded, Included(key))).map(|(_, b)| b).collect(),
                    CompareOp::Gt => map.range((Excluded(key), Unbounded)).map(|(_, b)| b).collect(),
                    CompareOp::Gte => map.range((Included(key), Unbounded)).map(|(_, b)| b).collect(),
                    CompareOp::Eq => map.get(&key).into_iter().collect(),
                };
                for ids in range {
                    out |= ids;
                }
            }
            _ => {}
        }
        out
    }

    /// Union of equality sets: the `field: [v1, v2, ...]` operator.
    pub fn in_list(&self, values: &[NumericValue]) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for &value in values {
            out |= self.compare(CompareOp::Eq, value);
        }
        out
    }
}

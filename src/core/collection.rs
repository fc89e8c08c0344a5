use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use roaring::RoaringBitmap;
use serde_json::Value;
use tracing::debug;

use crate::analysis::tokenize;
use crate::core::error::{Error, Result};
use crate::core::types::{Document, SeqId};
use crate::index::numeric::{NumericIndex, NumericValue};
use crate::index::sorts::SortColumn;
use crate::index::tags::TagIndex;
use crate::index::trie::TermTrie;
use crate::query::SearchRequest;
use crate::schema::{FieldType, Schema};
use crate::search::cache::SearchCache;
use crate::search::executor::QueryExecutor;
use crate::search::results::SearchResponse;
use crate::store::{self, Store};

/// Token positions of successive array elements are offset by this gap so
/// phrase proximity can never be satisfied across element boundaries.
const ELEMENT_GAP: u32 = 100_000;

const SEARCH_CACHE_CAPACITY: usize = 128;

/// One named collection: schema-validated ingest, typo-tolerant search,
/// and the document registry, all over a single-writer multi-reader lock.
pub struct Collection {
    name: String,
    collection_id: u32,
    created_at: DateTime<Utc>,
    schema: Schema,
    store: Arc<dyn Store>,
    inner: RwLock<CollectionInner>,
    cache: SearchCache,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("collection_id", &self.collection_id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// All mutable state. Readers hold the lock for a whole search, so a search
/// observes one consistent snapshot of every index and the registry.
pub(crate) struct CollectionInner {
    pub(crate) next_seq_id: SeqId,
    /// One term dictionary per search field.
    pub(crate) tries: HashMap<String, TermTrie>,
    /// One ordered value map per sort field (arrays included).
    pub(crate) numeric: HashMap<String, NumericIndex>,
    /// Exact-value indices for facet fields and STRING_ARRAY search fields.
    pub(crate) tags: HashMap<String, TagIndex>,
    /// Dense value columns for scalar sort fields.
    pub(crate) sort_columns: HashMap<String, SortColumn>,
    pub(crate) live: RoaringBitmap,
    pub(crate) seq_by_id: HashMap<String, SeqId>,
    pub(crate) docs: HashMap<SeqId, Value>,
}

impl CollectionInner {
    fn for_schema(schema: &Schema) -> Self {
        let mut tries = HashMap::new();
        for field in &schema.search_fields {
            tries.insert(field.name.clone(), TermTrie::new());
        }
        let mut numeric = HashMap::new();
        let mut sort_columns = HashMap::new();
        for field in &schema.sort_fields {
            numeric.insert(field.name.clone(), NumericIndex::for_type(field.field_type));
            if !field.field_type.is_array() {
                sort_columns.insert(field.name.clone(), SortColumn::for_type(field.field_type));
            }
        }
        let mut tags = HashMap::new();
        for field in schema.tag_fields() {
            tags.insert(field.name.clone(), TagIndex::new());
        }
        CollectionInner {
            next_seq_id: 1,
            tries,
            numeric,
            tags,
            sort_columns,
            live: RoaringBitmap::new(),
            seq_by_id: HashMap::new(),
            docs: HashMap::new(),
        }
    }

    /// Tokens of one search field's value, positions already offset per
    /// array element.
    fn field_terms(field_type: FieldType, value: &Value) -> HashMap<String, Vec<u32>> {
        let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
        match field_type {
            FieldType::String => {
                if let Some(text) = value.as_str() {
                    for token in tokenize(text) {
                        term_positions.entry(token.text).or_default().push(token.position);
                    }
                }
            }
            FieldType::StringArray => {
                if let Some(items) = value.as_array() {
                    for (element, item) in items.iter().enumerate() {
                        if let Some(text) = item.as_str() {
                            let base = element as u32 * ELEMENT_GAP;
                            for token in tokenize(text) {
                                term_positions
                                    .entry(token.text)
                                    .or_default()
                                    .push(base + token.position);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        term_positions
    }

    /// Applies every index insertion for an already-validated document.
    fn index_document(&mut self, seq_id: SeqId, doc: &Document, schema: &Schema) {
        let rank_score = schema
            .token_ranking_field
            .as_ref()
            .and_then(|name| doc.get(name))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        for field in &schema.search_fields {
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            if let Some(trie) = self.tries.get_mut(&field.name) {
                for (term, positions) in Self::field_terms(field.field_type, value) {
                    trie.insert(&term, seq_id, positions, rank_score);
                }
            }
        }

        for field in &schema.sort_fields {
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            let Some(index) = self.numeric.get_mut(&field.name) else {
                continue;
            };
            if field.field_type.is_array() {
                if let Some(items) = value.as_array() {
                    for item in items {
                        if let Some(v) = NumericValue::from_json(field.field_type, item) {
                            index.insert(v, seq_id);
                        }
                    }
                }
            } else if let Some(v) = NumericValue::from_json(field.field_type, value) {
                index.insert(v, seq_id);
                if let Some(column) = self.sort_columns.get_mut(&field.name) {
                    column.set(seq_id, v);
                }
            }
        }

        for field in schema.tag_fields() {
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            let Some(index) = self.tags.get_mut(&field.name) else {
                continue;
            };
            match value {
                Value::String(s) => index.insert(s, seq_id),
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = item.as_str() {
                            index.insert(s, seq_id);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Reverses every index insertion performed by `index_document`.
    fn remove_document(&mut self, seq_id: SeqId, doc: &Document, schema: &Schema) {
        let CollectionInner {
            tries,
            numeric,
            tags,
            sort_columns,
            ..
        } = self;

        let rank_column = schema
            .token_ranking_field
            .as_ref()
            .and_then(|name| sort_columns.get(name));
        let rank_of = |seq_id: SeqId| rank_column.map(|c| c.int_at(seq_id)).unwrap_or(0);

        for field in &schema.search_fields {
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            if let Some(trie) = tries.get_mut(&field.name) {
                for term in Self::field_terms(field.field_type, value).keys() {
                    trie.remove_doc(term, seq_id, &rank_of);
                }
            }
        }

        for field in &schema.sort_fields {
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            let Some(index) = numeric.get_mut(&field.name) else {
                continue;
            };
            if field.field_type.is_array() {
                if let Some(items) = value.as_array() {
                    for item in items {
                        if let Some(v) = NumericValue::from_json(field.field_type, item) {
                            index.remove(v, seq_id);
                        }
                    }
                }
            } else if let Some(v) = NumericValue::from_json(field.field_type, value) {
                index.remove(v, seq_id);
            }
        }

        for field in schema.tag_fields() {
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            let Some(index) = tags.get_mut(&field.name) else {
                continue;
            };
            match value {
                Value::String(s) => index.remove(s, seq_id),
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = item.as_str() {
                            index.remove(s, seq_id);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

impl Collection {
    pub(crate) fn new(
        name: String,
        collection_id: u32,
        schema: Schema,
        created_at: DateTime<Utc>,
        store: Arc<dyn Store>,
    ) -> Self {
        let inner = CollectionInner::for_schema(&schema);
        Collection {
            name,
            collection_id,
            created_at,
            schema,
            store,
            inner: RwLock::new(inner),
            cache: SearchCache::new(SEARCH_CACHE_CAPACITY),
        }
    }

    /// Rebuilds a collection from its persisted documents after a restart.
    pub(crate) fn restore(
        name: String,
        collection_id: u32,
        schema: Schema,
        created_at: DateTime<Utc>,
        store: Arc<dyn Store>,
        documents: Vec<(SeqId, Value)>,
    ) -> Result<Self> {
        let collection = Self::new(name, collection_id, schema, created_at, store);
        {
            let mut inner = collection.inner.write();
            for (seq_id, doc) in documents {
                let external_id = doc
                    .as_object()
                    .and_then(|body| body.get("id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        Error::internal(format!(
                            "Stored document {} of collection `{}` has no id.",
                            seq_id, collection.name
                        ))
                    })?;
                if let Some(body) = doc.as_object() {
                    inner.index_document(seq_id, body, &collection.schema);
                }
                inner.live.insert(seq_id);
                inner.seq_by_id.insert(external_id, seq_id);
                inner.docs.insert(seq_id, doc);
                inner.next_seq_id = inner.next_seq_id.max(seq_id + 1);
            }
        }
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_id(&self) -> u32 {
        self.collection_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_documents(&self) -> u64 {
        self.inner.read().live.len()
    }

    /// Validates and indexes one JSON document, returning its external id.
    pub fn add(&self, json_line: &str) -> Result<String> {
        let value: Value = serde_json::from_str(json_line).map_err(|_| Error::invalid("Bad JSON."))?;
        match value {
            Value::Object(doc) => self.add_document(doc),
            _ => Err(Error::invalid("Bad JSON.")),
        }
    }

    /// Bulk ingest: lines are parsed in parallel, then indexed serially in
    /// order under the write lock. Returns one result per line.
    pub fn add_batch(&self, json_lines: &[String]) -> Vec<Result<String>> {
        let parsed: Vec<Result<Document>> = json_lines
            .par_iter()
            .map(|line| {
                let value: Value =
                    serde_json::from_str(line).map_err(|_| Error::invalid("Bad JSON."))?;
                match value {
                    Value::Object(doc) => Ok(doc),
                    _ => Err(Error::invalid("Bad JSON.")),
                }
            })
            .collect();
        parsed
            .into_iter()
            .map(|doc| doc.and_then(|doc| self.add_document(doc)))
            .collect()
    }

    fn add_document(&self, mut doc: Document) -> Result<String> {
        let mut inner = self.inner.write();
        let seq_id = inner.next_seq_id;

        let external_id = match doc.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(Error::invalid("Document's `id` field should be a string.")),
            None => {
                // Generated ids are the zero-based ordinal of the add
                let generated = (seq_id - 1).to_string();
                doc.insert("id".to_string(), Value::String(generated.clone()));
                generated
            }
        };
        if inner.seq_by_id.contains_key(&external_id) {
            return Err(Error::conflict(format!(
                "A document with id `{}` already exists.",
                external_id
            )));
        }
        self.schema.validate_document(&doc)?;

        // Persist before indexing; the store is the source of truth the
        // index is rebuilt from. A failed second write undoes the first so
        // a rejected ingest leaves no keys behind.
        self.store
            .put(&store::doc_key(&self.name, seq_id), serde_json::to_vec(&doc)?)?;
        if let Err(err) = self.store.put(
            &store::seq_id_key(&self.name, &external_id),
            seq_id.to_string().into_bytes(),
        ) {
            let _ = self.store.delete(&store::doc_key(&self.name, seq_id));
            return Err(err);
        }

        inner.index_document(seq_id, &doc, &self.schema);
        inner.live.insert(seq_id);
        inner.seq_by_id.insert(external_id.clone(), seq_id);
        inner.docs.insert(seq_id, Value::Object(doc));
        inner.next_seq_id = seq_id + 1;
        drop(inner);

        self.cache.clear();
        debug!(collection = %self.name, seq_id, id = %external_id, "document indexed");
        Ok(external_id)
    }

    /// Removes a document and every index entry pointing at it. Unknown ids
    /// are a successful no-op.
    pub fn remove(&self, external_id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let Some(&seq_id) = inner.seq_by_id.get(external_id) else {
            return Ok(());
        };
        let doc = inner.docs.get(&seq_id).cloned().ok_or_else(|| {
            Error::internal(format!("Sequence id {} has no stored document.", seq_id))
        })?;
        let body = doc.as_object().ok_or_else(|| {
            Error::internal(format!("Stored document {} is not an object.", seq_id))
        })?;

        // Indices first, then the registry, then the persisted keys; the id
        // mapping goes last so observers never see a dangling reference.
        inner.remove_document(seq_id, body, &self.schema);
        inner.live.remove(seq_id);
        inner.docs.remove(&seq_id);
        inner.seq_by_id.remove(external_id);
        self.store.delete(&store::doc_key(&self.name, seq_id))?;
        self.store.delete(&store::seq_id_key(&self.name, external_id))?;
        drop(inner);

        self.cache.clear();
        debug!(collection = %self.name, seq_id, id = %external_id, "document removed");
        Ok(())
    }

    /// The stored document, `id` included.
    pub fn get(&self, external_id: &str) -> Result<Value> {
        let inner = self.inner.read();
        inner
            .seq_by_id
            .get(external_id)
            .and_then(|seq_id| inner.docs.get(seq_id))
            .cloned()
            .ok_or_else(|| {
                Error::not_found(format!("Could not find a document with id: {}", external_id))
            })
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if let Some(cached) = self.cache.get(request) {
            return Ok(cached);
        }
        let inner = self.inner.read();
        let executor = QueryExecutor {
            schema: &self.schema,
            inner: &inner,
        };
        let response = executor.search(request)?;
        drop(inner);
        self.cache.put(request.clone(), response.clone());
        Ok(response)
    }
}

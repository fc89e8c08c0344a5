use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::core::collection::Collection;
use crate::core::error::{Error, Result};
use crate::core::types::SeqId;
use crate::schema::{Field, Schema};
use crate::store::{self, Store};

/// Persisted `$C/<name>` record: everything needed to rebuild a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionRecord {
    name: String,
    collection_id: u32,
    created_at: DateTime<Utc>,
    search_fields: Vec<Field>,
    facet_fields: Vec<Field>,
    sort_fields: Vec<Field>,
    token_ranking_field: Option<String>,
}

/// Registry of collections. Guarded by its own lock only around
/// create/drop/lookup; collections serialize their own mutations.
pub struct CollectionManager {
    store: Arc<dyn Store>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    next_collection_id: Mutex<u32>,
    auth_key: String,
}

impl CollectionManager {
    /// Bootstraps manager metadata and replays every persisted collection's
    /// documents to rebuild the in-memory indices.
    pub fn init(store: Arc<dyn Store>) -> Result<Self> {
        let auth_key = match store.get(store::AUTH_KEY_KEY)? {
            Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            None => {
                let generated = Uuid::new_v4().simple().to_string();
                store.put(store::AUTH_KEY_KEY, generated.clone().into_bytes())?;
                generated
            }
        };

        let next_collection_id = match store.get(store::NEXT_COLLECTION_ID_KEY)? {
            Some(bytes) => String::from_utf8_lossy(&bytes).parse().map_err(|_| {
                Error::internal("Collection manager metadata is corrupted.")
            })?,
            None => {
                store.put(store::NEXT_COLLECTION_ID_KEY, b"0".to_vec())?;
                0
            }
        };

        let mut collections = HashMap::new();
        for (_, payload) in store.scan("$C/")? {
            let record: CollectionRecord = serde_json::from_slice(&payload)?;
            let schema = Schema::new(
                record.search_fields,
                record.facet_fields,
                record.sort_fields,
                record.token_ranking_field.as_deref(),
            )?;

            let mut documents = Vec::new();
            for (key, doc_payload) in store.scan(&store::doc_key_prefix(&record.name))? {
                let seq_id: SeqId = store::seq_id_from_doc_key(&key).ok_or_else(|| {
                    Error::internal(format!("Malformed document key `{}`.", key))
                })?;
                documents.push((seq_id, serde_json::from_slice(&doc_payload)?));
            }

            let collection = Collection::restore(
                record.name.clone(),
                record.collection_id,
                schema,
                record.created_at,
                store.clone(),
                documents,
            )?;
            collections.insert(record.name, Arc::new(collection));
        }

        debug!(collections = collections.len(), "collection manager initialized");
        Ok(CollectionManager {
            store,
            collections: RwLock::new(collections),
            next_collection_id: Mutex::new(next_collection_id),
            auth_key,
        })
    }

    /// API key generated on first bootstrap and persisted with the manager
    /// metadata.
    pub fn auth_key(&self) -> &str {
        &self.auth_key
    }

    pub fn create_collection(
        &self,
        name: &str,
        search_fields: Vec<Field>,
        facet_fields: Vec<Field>,
        sort_fields: Vec<Field>,
        token_ranking_field: Option<&str>,
    ) -> Result<Arc<Collection>> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Error::conflict(format!(
                "A collection with name `{}` already exists.",
                name
            )));
        }
        let schema = Schema::new(search_fields, facet_fields, sort_fields, token_ranking_field)?;

        let collection_id = {
            let mut next = self.next_collection_id.lock();
            let id = *next;
            *next += 1;
            self.store
                .put(store::NEXT_COLLECTION_ID_KEY, next.to_string().into_bytes())?;
            id
        };

        let created_at = Utc::now();
        let record = CollectionRecord {
            name: name.to_string(),
            collection_id,
            created_at,
            search_fields: schema.search_fields.clone(),
            facet_fields: schema.facet_fields.clone(),
            sort_fields: schema.sort_fields.clone(),
            token_ranking_field: schema.token_ranking_field.clone(),
        };
        self.store.put(
            &store::collection_meta_key(name),
            serde_json::to_vec(&record)?,
        )?;

        let collection = Arc::new(Collection::new(
            name.to_string(),
            collection_id,
            schema,
            created_at,
            self.store.clone(),
        ));
        collections.insert(name.to_string(), collection.clone());
        debug!(collection = name, collection_id, "collection created");
        Ok(collection)
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Drops a collection and every key persisted for it.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.remove(name).is_none() {
            return Err(Error::not_found(format!(
                "No collection with name `{}` found.",
                name
            )));
        }
        for (key, _) in self.store.scan(&store::doc_key_prefix(name))? {
            self.store.delete(&key)?;
        }
        for (key, _) in self.store.scan(&store::seq_id_key_prefix(name))? {
            self.store.delete(&key)?;
        }
        self.store.delete(&store::collection_meta_key(name))?;
        debug!(collection = name, "collection dropped");
        Ok(())
    }
}

pub mod memory;

pub use memory::MemStore;

use crate::core::error::Result;
use crate::core::types::SeqId;

/// Ordered key-value interface backing documents and identifier mappings.
///
/// The engine owns no durability logic of its own: everything it persists
/// goes through this trait, and everything it needs after a restart is
/// reconstructed from a prefix scan. Implementations must be safe for
/// concurrent `get`/`scan` alongside a single writer's `put`/`delete`.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
    /// All entries whose key starts with `prefix`, in key order.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
}

// Key layout:
//   $CM/...            collection manager metadata
//   $C/<name>          per-collection schema record
//   $D/<name>/<seq>    stored document JSON
//   $I/<name>/<id>     external id -> sequence id

pub const NEXT_COLLECTION_ID_KEY: &str = "$CM/next_collection_id";
pub const AUTH_KEY_KEY: &str = "$CM/auth_key";

pub fn collection_meta_key(name: &str) -> String {
    format!("$C/{}", name)
}

pub fn doc_key(name: &str, seq_id: SeqId) -> String {
    // Zero-padded so a prefix scan walks documents in sequence order
    format!("$D/{}/{:010}", name, seq_id)
}

pub fn doc_key_prefix(name: &str) -> String {
    format!("$D/{}/", name)
}

pub fn seq_id_key(name: &str, external_id: &str) -> String {
    format!("$I/{}/{}", name, external_id)
}

pub fn seq_id_key_prefix(name: &str) -> String {
    format!("$I/{}/", name)
}

/// Sequence id encoded in a `$D/<name>/<seq>` key, if well formed.
pub fn seq_id_from_doc_key(key: &str) -> Option<SeqId> {
    key.rsplit('/').next()?.parse().ok()
}

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use crate::query::SearchRequest;
use crate::search::results::SearchResponse;

/// Per-collection LRU of full search responses, keyed by the whole request.
/// Mutations clear it, so cached entries always reflect the live index.
pub struct SearchCache {
    cache: Mutex<LruCache<SearchRequest, SearchResponse>>,
}

impl SearchCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        SearchCache {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, request: &SearchRequest) -> Option<SearchResponse> {
        self.cache.lock().get(request).cloned()
    }

    pub fn put(&self, request: SearchRequest, response: SearchResponse) {
        self.cache.lock().put(request, response);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

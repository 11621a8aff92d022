use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::storage::{self, Storage, CSRF_KEY};

pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// CSRF token cache, mirrored into storage under `csrf_token`.
#[derive(Clone)]
pub struct CsrfCache {
    storage: Arc<dyn Storage>,
    cached: Arc<RwLock<Option<String>>>,
}

impl CsrfCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub fn get(&self) -> Option<String> {
        if let Some(token) = self.cached.read().clone() {
            return Some(token);
        }

        let stored = storage::get_or_absent(self.storage.as_ref(), CSRF_KEY).filter(|t| !t.is_empty());
        if let Some(token) = &stored {
            *self.cached.write() = Some(token.clone());
        }
        stored
    }

    pub fn store(&self, token: &str) {
        storage::set_or_warn(self.storage.as_ref(), CSRF_KEY, token);
        *self.cached.write() = Some(token.to_string());
    }

    pub fn clear(&self) {
        storage::remove_or_warn(self.storage.as_ref(), CSRF_KEY);
        *self.cached.write() = None;
    }
}

/// Token from a CSRF endpoint answer: `csrf_token` or `token` in the body,
/// else the `x-csrf-token` response header.
pub fn extract_token(body: &str, header: Option<&str>) -> Option<String> {
    let from_body = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["csrf_token", "token"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });

    from_body
        .or_else(|| header.map(str::to_string))
        .filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_extract_token_sources() {
        assert_eq!(extract_token(r#"{"csrf_token":"a"}"#, None).as_deref(), Some("a"));
        assert_eq!(extract_token(r#"{"token":"b"}"#, Some("h")).as_deref(), Some("b"));
        assert_eq!(extract_token("", Some("h")).as_deref(), Some("h"));
        assert_eq!(extract_token("{}", None), None);
    }

    #[test]
    fn test_cache_reads_through_storage() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CSRF_KEY, "persisted").unwrap();

        let cache = CsrfCache::new(storage.clone());
        assert_eq!(cache.get().as_deref(), Some("persisted"));

        cache.store("fresh");
        assert_eq!(storage.get(CSRF_KEY).unwrap().as_deref(), Some("fresh"));

        cache.clear();
        assert!(cache.get().is_none());
        assert!(storage.get(CSRF_KEY).unwrap().is_none());
    }
}

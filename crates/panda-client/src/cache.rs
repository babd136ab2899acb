//! GET response memoization owned by a client instance.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value as JsonValue;

/// Request identity: path plus sorted query parameters (authentication
/// parameters excluded).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(path: &str, params: &[(String, String)]) -> Self {
        let mut params = params.to_vec();
        params.sort();
        Self {
            path: path.to_string(),
            params,
        }
    }
}

/// Decoded JSON responses by request.
#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<CacheKey, JsonValue>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, JsonValue>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<JsonValue> {
        self.entries().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, value: JsonValue) {
        self.entries().insert(key, value);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_ignores_parameter_order() {
        let a = CacheKey::new(
            "/encodings.json",
            &[
                ("video_id".to_string(), "v1".to_string()),
                ("status".to_string(), "success".to_string()),
            ],
        );
        let b = CacheKey::new(
            "/encodings.json",
            &[
                ("status".to_string(), "success".to_string()),
                ("video_id".to_string(), "v1".to_string()),
            ],
        );
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::new("/encodings.json", &[]));
    }

    #[test]
    fn insert_get_clear() {
        let cache = RequestCache::new();
        let key = CacheKey::new("/profiles.json", &[]);
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), json!([{"id": "p1", "name": "h264"}]));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key).is_some());
        cache.clear();
        assert!(cache.is_empty());
    }
}

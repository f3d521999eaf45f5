use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::RwLock;

/// A change produced by a write to a [`Cache`].
///
/// Writers hand these to the publisher instead of the cache emitting events.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<V> {
    Inserted { key: String, value: V },
    Updated { key: String, value: V },
    Deleted { key: String },
}

impl<V> Change<V> {
    pub fn key(&self) -> &str {
        match self {
            Change::Inserted { key, .. } | Change::Updated { key, .. } | Change::Deleted { key } => {
                key
            }
        }
    }

    pub fn value(&self) -> Option<&V> {
        match self {
            Change::Inserted { value, .. } | Change::Updated { value, .. } => Some(value),
            Change::Deleted { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache lock poisoned: {0}")]
    Poisoned(String),
}

/// In-memory key-value store keyed by device id.
///
/// Keys are kept ordered so listings are stable.
#[derive(Debug)]
pub struct Cache<V> {
    entries: RwLock<BTreeMap<String, V>>,
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<V: Clone> Cache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CacheError::Poisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    /// Store `value`, reporting whether the key was new.
    pub fn set(&self, key: impl Into<String>, value: V) -> Result<Change<V>, CacheError> {
        let key = key.into();
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::Poisoned(e.to_string()))?;

        let previous = entries.insert(key.clone(), value.clone());
        Ok(match previous {
            None => Change::Inserted { key, value },
            Some(_) => Change::Updated { key, value },
        })
    }

    /// Fetch several keys at once. Missing keys are left out of the result.
    pub fn mget(&self, keys: &[String]) -> Result<HashMap<String, V>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CacheError::Poisoned(e.to_string()))?;

        Ok(keys
            .iter()
            .filter_map(|k| entries.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CacheError::Poisoned(e.to_string()))?;
        Ok(entries.keys().cloned().collect())
    }

    /// Remove `key`. Returns `None` when there was nothing to remove.
    pub fn delete(&self, key: &str) -> Result<Option<Change<V>>, CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError::Poisoned(e.to_string()))?;

        Ok(entries.remove(key).map(|_| Change::Deleted {
            key: key.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_insert_then_update() {
        let cache = Cache::new();

        let first = cache.set("a", 1).unwrap();
        assert_eq!(
            first,
            Change::Inserted {
                key: "a".to_string(),
                value: 1
            }
        );

        let second = cache.set("a", 2).unwrap();
        assert_eq!(
            second,
            Change::Updated {
                key: "a".to_string(),
                value: 2
            }
        );
        assert_eq!(cache.get("a").unwrap(), Some(2));
    }

    #[test]
    fn test_mget_skips_missing_keys() {
        let cache = Cache::new();
        cache.set("a", "x").unwrap();
        cache.set("c", "z").unwrap();

        let found = cache
            .mget(&["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.get("a"), Some(&"x"));
        assert!(!found.contains_key("b"));
    }

    #[test]
    fn test_keys_are_ordered() {
        let cache = Cache::new();
        cache.set("b", ()).unwrap();
        cache.set("a", ()).unwrap();
        assert_eq!(cache.keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_delete() {
        let cache = Cache::new();
        cache.set("a", 1).unwrap();

        let change = cache.delete("a").unwrap().unwrap();
        assert_eq!(change.key(), "a");
        assert_eq!(change.value(), None);
        assert_eq!(cache.get("a").unwrap(), None);

        assert!(cache.delete("a").unwrap().is_none());
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let cache = std::sync::Arc::new(Cache::new());
        cache.set("a", 1).unwrap();

        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(cache.get("a"), Err(CacheError::Poisoned(_))));
        assert!(matches!(cache.set("a", 2), Err(CacheError::Poisoned(_))));
    }
}

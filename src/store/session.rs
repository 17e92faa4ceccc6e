//! Session storage
//!
//! Ephemeral key-value area shared by every control-surface context for the
//! lifetime of the browsing session. Values are JSON; nothing touches disk.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    updated_at: DateTime<Utc>,
}

/// Cloneable handle to the session key-value area
#[derive(Debug, Clone, Default)]
pub struct SessionStorage {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).map(|e| e.value.clone())
    }

    /// Values for every present key among `keys`
    pub async fn get_many(&self, keys: &[String]) -> HashMap<String, Value> {
        let entries = self.entries.read().await;
        keys.iter()
            .filter_map(|k| entries.get(k).map(|e| (k.clone(), e.value.clone())))
            .collect()
    }

    pub async fn set(&self, key: &str, value: Value) {
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value,
                updated_at: Utc::now(),
            },
        );
    }

    /// Write several keys at once
    pub async fn set_many(&self, values: Vec<(String, Value)>) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        for (key, value) in values {
            entries.insert(
                key,
                Entry {
                    value,
                    updated_at: now,
                },
            );
        }
    }

    /// Read-modify-write of one key under the write lock
    ///
    /// `f` sees the current value (if any) and returns the replacement.
    /// Concurrent updates of the same key serialize; other keys are untouched.
    pub async fn update<F>(&self, key: &str, f: F) -> Result<Value>
    where
        F: FnOnce(Option<&Value>) -> Result<Value>,
    {
        let mut entries = self.entries.write().await;
        let value = f(entries.get(key).map(|e| &e.value))?;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.clone(),
                updated_at: Utc::now(),
            },
        );
        Ok(value)
    }

    pub async fn remove(&self, keys: &[String]) {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
    }

    pub async fn updated_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.read().await.get(key).map(|e| e.updated_at)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// End of session
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let storage = SessionStorage::new();
        storage.set("a", json!(1)).await;
        storage.set_many(vec![("b".to_string(), json!(true))]).await;

        assert_eq!(storage.get("a").await, Some(json!(1)));
        assert_eq!(storage.keys().await, vec!["a", "b"]);
        assert!(storage.updated_at("b").await.is_some());

        storage.remove(&["a".to_string()]).await;
        assert_eq!(storage.get("a").await, None);
        assert_eq!(storage.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let storage = SessionStorage::new();
        let mut handles = Vec::new();
        for _ in 0..50 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage
                    .update("counter", |current| {
                        let n = current.and_then(Value::as_u64).unwrap_or(0);
                        Ok(json!(n + 1))
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(storage.get("counter").await, Some(json!(50)));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_old_value() {
        let storage = SessionStorage::new();
        storage.set("k", json!("old")).await;
        let result = storage
            .update("k", |_| {
                Err(crate::error::EqError::InvalidConfig {
                    reason: "nope".to_string(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(storage.get("k").await, Some(json!("old")));
    }
}

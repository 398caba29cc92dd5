//! Key-value bindings: in-memory store and typed JSON view.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use edge_core::{BindingError, KvStore};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

/// In-memory key-value store for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Arc`, ready to hand to a host env.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, BindingError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<(), BindingError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BindingError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BindingError> {
        Ok(self
            .entries
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Type-safe view over a [`KvStore`] with JSON serialization.
///
/// ```rust,ignore
/// let kv = TypedKv::new(ctx.kv("SESSIONS")?.as_ref());
/// let cart: Option<Cart> = kv.get("cart:user123").await?;
/// ```
pub struct TypedKv<'a> {
    store: &'a dyn KvStore,
}

impl<'a> TypedKv<'a> {
    /// Wrap a store.
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    /// Get a value. Returns `None` if the key doesn't exist.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BindingError> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a value.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), BindingError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(key, Bytes::from(bytes)).await
    }

    /// Delete a value.
    pub async fn delete(&self, key: &str) -> Result<bool, BindingError> {
        self.store.delete(key).await
    }

    /// Check if a key exists.
    pub async fn exists(&self, key: &str) -> Result<bool, BindingError> {
        Ok(self.store.get(key).await?.is_some())
    }
}

/// Helper to build namespaced keys.
///
/// ```rust,ignore
/// let key = kv_key!("visits", path);
/// // Returns "visits:/about"
/// ```
#[macro_export]
macro_rules! kv_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Visit {
        path: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_typed_roundtrip_and_delete() {
        let store = MemoryKv::new();
        let kv = TypedKv::new(&store);

        let visit = Visit {
            path: "/about".into(),
            count: 3,
        };
        kv.put("visits:/about", &visit).await.unwrap();
        assert_eq!(kv.get::<Visit>("visits:/about").await.unwrap(), Some(visit));
        assert!(kv.delete("visits:/about").await.unwrap());
        assert!(!kv.exists("visits:/about").await.unwrap());
    }

    #[tokio::test]
    async fn test_typed_get_reports_bad_json() {
        let store = MemoryKv::new();
        store.put("k", Bytes::from_static(b"not json")).await.unwrap();
        let result = TypedKv::new(&store).get::<Visit>("k").await;
        assert!(matches!(result, Err(BindingError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = MemoryKv::new();
        for key in ["a:1", "a:2", "b:1"] {
            store.put(key, Bytes::new()).await.unwrap();
        }
        assert_eq!(store.list("a:").await.unwrap(), vec!["a:1", "a:2"]);
        assert_eq!(store.len().await, 3);
    }

    #[test]
    fn test_kv_key_macro() {
        let user = 42;
        assert_eq!(kv_key!("cart", user), "cart:42");
        assert_eq!(kv_key!("visits", "/about", 2024), "visits:/about:2024");
    }
}

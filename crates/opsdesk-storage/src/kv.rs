//! Raw key-value store trait and the in-memory implementation.
//!
//! The [`KvStore`] trait provides byte-level operations with namespaced
//! keys. The profile store uses `profiles:*` namespaces and the audit store
//! uses `audit:*`; neither can see the other's keys.
//!
//! Use [`ScopedKvStore`] to pre-bind a namespace. It also provides typed
//! [`get_json`](ScopedKvStore::get_json) / [`set_json`](ScopedKvStore::set_json)
//! helpers.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Namespaces must be non-empty and free of null bytes.
pub(crate) fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Keys must be non-empty and free of null bytes.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A key-value entry with its namespace and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// The namespace this entry belongs to.
    pub namespace: String,
    /// The key within the namespace.
    pub key: String,
    /// The raw value bytes.
    pub value: Vec<u8>,
}

/// Ordered namespace → key → value map shared by the in-process backends.
#[derive(Debug, Default, Clone)]
pub(crate) struct Namespaces(pub(crate) BTreeMap<String, BTreeMap<String, Vec<u8>>>);

impl Namespaces {
    pub(crate) fn get(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.0.get(namespace).and_then(|ns| ns.get(key)).cloned()
    }

    pub(crate) fn set(&mut self, namespace: &str, key: &str, value: Vec<u8>) {
        self.0
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
    }

    pub(crate) fn insert_new(
        &mut self,
        namespace: &str,
        key: &str,
        value: Vec<u8>,
    ) -> StorageResult<()> {
        let ns = self.0.entry(namespace.to_owned()).or_default();
        if ns.contains_key(key) {
            return Err(StorageError::AlreadyExists {
                namespace: namespace.to_owned(),
                key: key.to_owned(),
            });
        }
        ns.insert(key.to_owned(), value);
        Ok(())
    }

    pub(crate) fn keys(&self, namespace: &str) -> Vec<String> {
        self.0
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn scan(&self, namespace: &str) -> Vec<KvEntry> {
        self.0
            .get(namespace)
            .map(|ns| {
                ns.iter()
                    .map(|(key, value)| KvEntry {
                        namespace: namespace.to_owned(),
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Raw key-value store trait.
///
/// Provides namespaced byte-level storage. All operations are scoped
/// to a namespace for isolation.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by namespace and key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value for a namespace and key, overwriting any existing value.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Write a value only if the key is absent.
    ///
    /// Returns [`StorageError::AlreadyExists`] otherwise; the stored value is
    /// left untouched.
    async fn insert_new(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// List all keys in a namespace, in ascending order.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Read every entry in a namespace, in ascending key order.
    async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory key-value store for tests and ephemeral data.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: RwLock<Namespaces>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Namespaces> {
        self.data.read().unwrap_or_else(|e| {
            tracing::warn!("MemoryKvStore read lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Namespaces> {
        self.data.write().unwrap_or_else(|e| {
            tracing::warn!("MemoryKvStore lock poisoned, recovering");
            e.into_inner()
        })
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self.read().get(namespace, key))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.write().set(namespace, key, value);
        Ok(())
    }

    async fn insert_new(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.write().insert_new(namespace, key, value)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        Ok(self.read().keys(namespace))
    }

    async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>> {
        validate_namespace(namespace)?;
        Ok(self.read().scan(namespace))
    }
}

// ---------------------------------------------------------------------------
// Scoped store (namespace pre-bound)
// ---------------------------------------------------------------------------

/// A namespace-scoped view into a [`KvStore`].
///
/// ```rust,ignore
/// use opsdesk_storage::{MemoryKvStore, ScopedKvStore};
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryKvStore::new());
/// let profiles = ScopedKvStore::new(store, "profiles:by_user")?;
/// profiles.set_json("user-1", &profile).await?;
/// ```
#[derive(Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl std::fmt::Debug for ScopedKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedKvStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ScopedKvStore {
    /// Create a scoped view into the given store for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is empty
    /// or contains null bytes.
    pub fn new(store: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self {
            inner: store,
            namespace,
        })
    }

    /// The namespace this store is scoped to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// List all keys in this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store operation fails.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }

    /// Deserialize a JSON value from the store.
    ///
    /// Returns `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if deserialization fails.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let bytes = self.inner.get(&self.namespace, key).await?;
        bytes
            .map(|b| {
                serde_json::from_slice(&b).map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    /// Serialize a value as JSON and store it, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if serialization fails.
    pub async fn set_json<T: serde::Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.inner.set(&self.namespace, key, bytes).await
    }

    /// Serialize a value as JSON and store it under a key that must not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::AlreadyExists`] if the key is taken.
    pub async fn insert_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.inner.insert_new(&self.namespace, key, bytes).await
    }

    /// Deserialize every value in the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] on the first value that fails
    /// to decode.
    pub async fn scan_json<T: serde::de::DeserializeOwned>(&self) -> StorageResult<Vec<T>> {
        self.inner
            .scan(&self.namespace)
            .await?
            .into_iter()
            .map(|entry| {
                serde_json::from_slice(&entry.value)
                    .map_err(|e| StorageError::Serialization(format!("{}: {e}", entry.key)))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

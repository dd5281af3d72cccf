//! Single-file JSON key-value store.
//!
//! The whole keyspace is held in memory and rewritten to disk on every
//! mutation (write to `<path>.tmp`, then rename). Suitable for the CLI's
//! operator data file, where volumes are small and crash consistency matters
//! more than throughput.
//!
//! On-disk layout:
//!
//! ```json
//! { "version": 1, "namespaces": { "audit:entries": { "<key>": "<base64>" } } }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvEntry, KvStore, Namespaces, validate_key, validate_namespace};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct FileDocument {
    version: u32,
    #[serde(default)]
    namespaces: BTreeMap<String, BTreeMap<String, String>>,
}

/// Persistent key-value store backed by one JSON file.
pub struct FileKvStore {
    path: PathBuf,
    data: Mutex<Namespaces>,
}

impl std::fmt::Debug for FileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileKvStore {
    /// Open the store at `path`, creating an empty keyspace if the file does
    /// not exist yet. The file itself is only created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be read, or
    /// [`StorageError::Serialization`] if its contents are not a valid store
    /// document.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read(&path) {
            Ok(bytes) => decode_document(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "store file not found, starting empty");
                Namespaces::default()
            },
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.display().to_string(),
                    source,
                });
            },
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the keyspace, persist the copy, then swap
    /// it in. A failed write leaves both disk and memory unchanged.
    async fn commit<F>(&self, mutate: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Namespaces) -> StorageResult<()> + Send,
    {
        let mut guard = self.data.lock().await;
        let mut next = guard.clone();
        mutate(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }

    async fn persist(&self, data: &Namespaces) -> StorageResult<()> {
        let bytes = encode_document(data)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

fn decode_document(bytes: &[u8]) -> StorageResult<Namespaces> {
    let doc: FileDocument =
        serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))?;
    if doc.version != FORMAT_VERSION {
        return Err(StorageError::Serialization(format!(
            "unsupported store format version {} (expected {FORMAT_VERSION})",
            doc.version
        )));
    }

    let mut out = BTreeMap::new();
    for (namespace, entries) in doc.namespaces {
        let mut decoded = BTreeMap::new();
        for (key, value) in entries {
            let raw = STANDARD
                .decode(value.as_bytes())
                .map_err(|e| StorageError::Serialization(format!("{namespace}/{key}: {e}")))?;
            decoded.insert(key, raw);
        }
        out.insert(namespace, decoded);
    }
    Ok(Namespaces(out))
}

fn encode_document(data: &Namespaces) -> StorageResult<Vec<u8>> {
    let namespaces = data
        .0
        .iter()
        .map(|(namespace, entries)| {
            let encoded = entries
                .iter()
                .map(|(key, value)| (key.clone(), STANDARD.encode(value)))
                .collect();
            (namespace.clone(), encoded)
        })
        .collect();

    let doc = FileDocument {
        version: FORMAT_VERSION,
        namespaces,
    };
    serde_json::to_vec_pretty(&doc).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self.data.lock().await.get(namespace, key))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.commit(|data| {
            data.set(namespace, key, value);
            Ok(())
        })
        .await
    }

    async fn insert_new(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.commit(|data| data.insert_new(namespace, key, value))
            .await
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        Ok(self.data.lock().await.keys(namespace))
    }

    async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>> {
        validate_namespace(namespace)?;
        Ok(self.data.lock().await.scan(namespace))
    }
}

//! The persisted key/value document.

use crate::atomic::write_atomic;
use crate::builder::StoreBuilder;
use crate::error::{StorageError, StorageErrorExt};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// The in-memory document. Insertion order is preserved on disk.
pub type Document = Map<String, Value>;

#[derive(Debug)]
pub(crate) struct StoreInner {
    pub(crate) path: Option<PathBuf>,
    pub(crate) doc: RwLock<Document>,
    /// Serializes persistence so the file always reflects mutations in call order.
    pub(crate) write_gate: tokio::sync::Mutex<()>,
}

/// A JSON object of top-level keys, held in memory and mirrored to one file.
///
/// Reads are served from memory. Every mutation is applied in memory and then
/// persisted with [`crate::write_atomic`] before the call returns, so a caller always
/// reads its own writes and the file is never left half-written.
///
/// Cheap to clone; clones share the same document.
///
/// ```rust
/// use serde_json::json;
/// use shub_storage::{Store, StorageError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), StorageError> {
/// # let tmp = tempfile::tempdir().unwrap();
/// let store = Store::builder().root(tmp.path()).file_name("settings.json").open().await?;
/// store.set("app.theme", json!({"mode": "dark"})).await?;
/// assert_eq!(store.get("app.theme"), Some(json!({"mode": "dark"})));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    #[must_use = "The store is not opened until you call .open()"]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// A store that is never written to disk.
    #[must_use]
    pub fn memory() -> Self {
        Self::from_parts(None, Document::new())
    }

    pub(crate) fn from_parts(path: Option<PathBuf>, doc: Document) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path,
                doc: RwLock::new(doc),
                write_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Backing file, `None` for a memory store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.doc.read().get(key).cloned()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.inner.doc.read().contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.doc.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.doc.read().len()
    }

    pub async fn set(&self, key: impl Into<String>, value: Value) -> Result<(), StorageError> {
        let key = key.into();
        self.update(move |doc| {
            doc.insert(key, value);
        })
        .await
    }

    /// Returns whether the key existed.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.update(|doc| doc.shift_remove(key).is_some()).await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.update(Document::clear).await
    }

    /// Keeps only the entries for which `keep` returns `true`; returns how many were removed.
    pub async fn retain<F>(&self, mut keep: F) -> Result<usize, StorageError>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        self.update(|doc| {
            let before = doc.len();
            doc.retain(|k, v| keep(k, v));
            before - doc.len()
        })
        .await
    }

    /// Applies several changes as one mutation and one write.
    ///
    /// When persisting fails the in-memory change stays applied and the error is
    /// returned; the next successful write brings the file back in line.
    pub async fn update<R>(&self, mutate: impl FnOnce(&mut Document) -> R) -> Result<R, StorageError> {
        let _gate = self.inner.write_gate.lock().await;

        let (result, bytes) = {
            let mut doc = self.inner.doc.write();
            let result = mutate(&mut doc);
            let bytes = match &self.inner.path {
                Some(_) => Some(serde_json::to_vec_pretty(&*doc).context("Encoding store document")?),
                None => None,
            };
            (result, bytes)
        };

        if let (Some(path), Some(bytes)) = (&self.inner.path, bytes) {
            write_atomic(path, &bytes).await.inspect_err(|e| {
                warn!(path = %path.display(), error = %e, "Store persistence failed");
            })?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_basic_ops() {
        let store = Store::memory();
        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!({"x": true})).await.unwrap();

        assert_eq!(store.get("a"), Some(json!(1)));
        assert!(store.has("b"));
        assert_eq!(store.keys(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn test_retain_reports_removed_count() {
        let store = Store::memory();
        for key in ["__secure__:a", "__secure__:b", "plain"] {
            store.set(key, json!(null)).await.unwrap();
        }

        let removed = store.retain(|k, _| !k.starts_with("__secure__:")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.keys(), vec!["plain".to_owned()]);
    }

    #[tokio::test]
    async fn test_update_batches_changes() {
        let store = Store::memory();
        let n = store
            .update(|doc| {
                doc.insert("x".into(), json!(1));
                doc.insert("y".into(), json!(2));
                doc.len()
            })
            .await
            .unwrap();
        assert_eq!(n, 2);

        store.clear().await.unwrap();
        assert_eq!(store.len(), 0);
    }
}

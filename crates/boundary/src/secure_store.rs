//! # Secure Storage Engine
//!
//! Encrypted values live in the generic [`Store`] next to plain entries, each under
//! `__secure__:<key>` as a [`SecureEnvelope`]. The namespaced key is the envelope's
//! associated data, so moving an envelope to another key breaks authentication.
//!
//! Values written before encryption was introduced sit under the bare key. The first
//! read migrates them into an envelope and removes the plaintext.

use crate::error::BoundaryError;
use serde_json::Value;
use shub_storage::Store;
use shub_vault::{KeyManager, Keystore, SecureEnvelope};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const SECURE_PREFIX: &str = "__secure__:";

#[must_use]
pub fn namespaced(key: &str) -> String {
    format!("{SECURE_PREFIX}{key}")
}

#[derive(Debug)]
pub struct SecureStore<K> {
    store: Store,
    keys: Arc<KeyManager<K>>,
}

impl<K> Clone for SecureStore<K> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), keys: Arc::clone(&self.keys) }
    }
}

impl<K: Keystore> SecureStore<K> {
    #[must_use]
    pub const fn new(store: Store, keys: Arc<KeyManager<K>>) -> Self {
        Self { store, keys }
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn keys(&self) -> &Arc<KeyManager<K>> {
        &self.keys
    }

    /// Encrypts `value` under `key`, replacing any previous envelope and dropping a
    /// legacy plaintext entry in the same write.
    ///
    /// # Errors
    ///
    /// * [`BoundaryError::Keystore`] when the master key cannot be obtained.
    /// * [`BoundaryError::Serialization`] or [`BoundaryError::Internal`] when sealing fails.
    /// * [`BoundaryError::Storage`] when the store cannot be persisted.
    pub async fn set(&self, key: &str, value: &Value) -> Result<(), BoundaryError> {
        let name = namespaced(key);
        let master = self.keys.master_key().await?;
        let envelope = SecureEnvelope::seal_json(&master, value, name.as_bytes())?.to_value()?;
        drop(master);

        let legacy = key.to_owned();
        self.store
            .update(move |doc| {
                doc.insert(name, envelope);
                doc.shift_remove(&legacy);
            })
            .await?;
        debug!(key, "Secure value written");
        Ok(())
    }

    /// Reads and decrypts `key`.
    ///
    /// Without an envelope, a legacy plaintext value under the bare key is migrated
    /// and returned; otherwise the result is `None`.
    ///
    /// # Errors
    ///
    /// * [`BoundaryError::Decryption`] for a tampered or malformed envelope, or one
    ///   sealed for a different key.
    /// * [`BoundaryError::Keystore`] when the master key cannot be obtained.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, BoundaryError> {
        let name = namespaced(key);
        if let Some(envelope) = self.store.get(&name).as_ref().and_then(SecureEnvelope::from_value) {
            let master = self.keys.master_key().await?;
            return envelope.open_json(&master, name.as_bytes()).map(Some).map_err(|e| {
                error!(key, error = %e, "Secure value could not be decrypted");
                e.into()
            });
        }
        self.migrate_legacy(key).await
    }

    async fn migrate_legacy(&self, key: &str) -> Result<Option<Value>, BoundaryError> {
        let Some(legacy) = self.store.get(key) else {
            return Ok(None);
        };
        self.set(key, &legacy).await?;
        info!(key, "Migrated legacy value into the secure store");
        Ok(Some(legacy))
    }

    /// Removes the envelope and any stray plaintext under the bare key.
    ///
    /// # Errors
    /// [`BoundaryError::Storage`] when the store cannot be persisted.
    pub async fn delete(&self, key: &str) -> Result<(), BoundaryError> {
        let name = namespaced(key);
        let legacy = key.to_owned();
        self.store
            .update(move |doc| {
                doc.shift_remove(&name);
                doc.shift_remove(&legacy);
            })
            .await?;
        Ok(())
    }

    /// Removes every envelope; plain entries are untouched. Returns how many went.
    ///
    /// # Errors
    /// [`BoundaryError::Storage`] when the store cannot be persisted.
    pub async fn clear(&self) -> Result<usize, BoundaryError> {
        self.clear_retaining(&[]).await
    }

    /// Like [`SecureStore::clear`], sparing the envelopes of `keep`.
    ///
    /// # Errors
    /// [`BoundaryError::Storage`] when the store cannot be persisted.
    pub async fn clear_retaining(&self, keep: &[&str]) -> Result<usize, BoundaryError> {
        let spared: Vec<String> = keep.iter().map(|k| namespaced(k)).collect();
        let removed = self
            .store
            .retain(|name, _| !name.starts_with(SECURE_PREFIX) || spared.iter().any(|s| s == name))
            .await?;
        info!(removed, "Secure values cleared");
        Ok(removed)
    }
}

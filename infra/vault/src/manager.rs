use crate::error::VaultError;
use crate::key::MasterKey;
use crate::keystore::Keystore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Keystore service name the master key is filed under.
pub const DEFAULT_KEY_SERVICE: &str = "DesktopManagementSystem";
/// Keystore account name the master key is filed under.
pub const DEFAULT_KEY_ACCOUNT: &str = "secure-store-master-key";

/// Lazily loads, caches and releases the master key.
///
/// The first caller fetches the key from the keystore, generating and storing one if
/// none exists. Concurrent cold callers wait on the same fetch, so a key is never
/// generated twice. [`KeyManager::release`] drops the cached handle; the next
/// [`KeyManager::master_key`] re-reads the existing key from the keystore.
#[derive(Debug)]
pub struct KeyManager<K> {
    keystore: Arc<K>,
    service: String,
    account: String,
    cached: Mutex<Option<Arc<MasterKey>>>,
    fetch: tokio::sync::Mutex<()>,
}

impl<K: Keystore> KeyManager<K> {
    #[must_use]
    pub fn new(keystore: Arc<K>) -> Self {
        Self::with_identity(keystore, DEFAULT_KEY_SERVICE, DEFAULT_KEY_ACCOUNT)
    }

    #[must_use]
    pub fn with_identity(
        keystore: Arc<K>,
        service: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            keystore,
            service: service.into(),
            account: account.into(),
            cached: Mutex::new(None),
            fetch: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub const fn keystore(&self) -> &Arc<K> {
        &self.keystore
    }

    /// `true` while a key is held in memory.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached.lock().is_some()
    }

    /// Returns the cached key, fetching or creating it on a cold cache.
    ///
    /// # Errors
    ///
    /// [`VaultError::Keystore`] when the keystore cannot be read or written, or holds a
    /// secret that is not a 256-bit base64 key.
    pub async fn master_key(&self) -> Result<Arc<MasterKey>, VaultError> {
        if let Some(key) = self.cached() {
            return Ok(key);
        }

        let _fetch = self.fetch.lock().await;
        // Another caller may have finished the fetch while we queued.
        if let Some(key) = self.cached() {
            return Ok(key);
        }

        let key = Arc::new(self.load_or_create().await?);
        *self.cached.lock() = Some(Arc::clone(&key));
        Ok(key)
    }

    fn cached(&self) -> Option<Arc<MasterKey>> {
        self.cached.lock().clone()
    }

    async fn load_or_create(&self) -> Result<MasterKey, VaultError> {
        let stored = self
            .keystore
            .get(&self.service, &self.account)
            .await
            .inspect_err(|e| warn!(error = %e, service = %self.service, "Master key lookup failed"))?;

        if let Some(secret) = stored {
            debug!(service = %self.service, "Master key loaded from keystore");
            return MasterKey::from_base64(&secret);
        }

        let key = MasterKey::generate()?;
        self.keystore.set(&self.service, &self.account, &key.to_base64()).await?;
        info!(service = %self.service, account = %self.account, "Master key generated and stored");
        Ok(key)
    }

    /// Drops the cached key. Returns `false` when nothing was cached.
    ///
    /// The bytes are zeroed as soon as no in-flight operation holds the key.
    pub fn release(&self) -> bool {
        let released = self.cached.lock().take();
        match released {
            Some(_) => {
                info!("Cached master key released from memory");
                true
            }
            None => false,
        }
    }
}

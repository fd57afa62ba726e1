//! Where the master key lives between runs.
//!
//! [`Keystore`] mirrors the shape of an OS credential store: secrets addressed by a
//! `(service, account)` pair. [`FileKeystore`] keeps each secret in an owner-only file,
//! [`MemoryKeystore`] is for tests and ephemeral sessions.

use crate::error::VaultError;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use zeroize::Zeroizing;

/// Credential storage for the master key.
pub trait Keystore: Send + Sync + 'static {
    /// `Ok(None)` when no secret exists for the pair.
    fn get(
        &self,
        service: &str,
        account: &str,
    ) -> impl Future<Output = Result<Option<Zeroizing<String>>, VaultError>> + Send;

    fn set(
        &self,
        service: &str,
        account: &str,
        secret: &str,
    ) -> impl Future<Output = Result<(), VaultError>> + Send;
}

/// Process-local keystore.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeystore {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    secrets: Mutex<FxHashMap<(String, String), Zeroizing<String>>>,
    unavailable: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryKeystore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A keystore whose every call fails, like a locked or missing OS credential service.
    #[must_use]
    pub fn unavailable() -> Self {
        let store = Self::default();
        store.set_available(false);
        store
    }

    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.inner.reads.load(Ordering::SeqCst)
    }

    /// Number of `set` calls served so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), VaultError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(VaultError::keystore("credential service unavailable"));
        }
        Ok(())
    }
}

impl Keystore for MemoryKeystore {
    async fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<Zeroizing<String>>, VaultError> {
        self.check()?;
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        // Suspends like a credential-service round trip.
        tokio::task::yield_now().await;
        let secrets = self.inner.secrets.lock();
        Ok(secrets.get(&(service.to_owned(), account.to_owned())).cloned())
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), VaultError> {
        self.check()?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.inner
            .secrets
            .lock()
            .insert((service.to_owned(), account.to_owned()), Zeroizing::new(secret.to_owned()));
        Ok(())
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One owner-readable file per secret under a directory.
#[derive(Debug, Clone)]
pub struct FileKeystore {
    dir: Arc<PathBuf>,
}

impl FileKeystore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Arc::new(dir.into()) }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn secret_path(&self, service: &str, account: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.secret", file_component(service), file_component(account)))
    }
}

fn file_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn keystore_io(err: std::io::Error, action: &'static str) -> VaultError {
    VaultError::Keystore { message: err.to_string().into(), context: Some(action.into()) }
}

impl Keystore for FileKeystore {
    async fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<Zeroizing<String>>, VaultError> {
        let path = self.secret_path(service, account);
        match tokio::fs::read_to_string(&path).await {
            Ok(secret) => {
                let secret = Zeroizing::new(secret);
                if secret.trim().is_empty() {
                    return Ok(None);
                }
                Ok(Some(secret))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(keystore_io(e, "Reading keystore secret")),
        }
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), VaultError> {
        tokio::fs::create_dir_all(self.dir.as_path())
            .await
            .map_err(|e| keystore_io(e, "Creating keystore directory"))?;

        let path = self.secret_path(service, account);
        let tmp = self.dir.join(format!(
            ".{}.{}.tmp",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("secret"),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let write = async {
            let mut file = options.open(&tmp).await?;
            file.write_all(secret.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        };
        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(keystore_io(e, "Writing keystore secret"));
        }

        debug!(path = %path.display(), "Keystore secret written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_keystore_roundtrip() {
        let store = MemoryKeystore::new();
        assert!(store.get("svc", "acct").await.unwrap().is_none());
        store.set("svc", "acct", "secret").await.unwrap();
        assert_eq!(store.get("svc", "acct").await.unwrap().as_deref().map(String::as_str), Some("secret"));
        assert_eq!(store.reads(), 2);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_keystore_fails_both_ways() {
        let store = MemoryKeystore::unavailable();
        assert_eq!(store.get("svc", "acct").await.unwrap_err().kind(), "Keystore");
        assert_eq!(store.set("svc", "acct", "x").await.unwrap_err().kind(), "Keystore");
    }

    #[tokio::test]
    async fn test_file_keystore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeystore::new(dir.path().join("keys"));
        assert!(store.get("Desktop Service", "acct").await.unwrap().is_none());

        store.set("Desktop Service", "acct", "c2VjcmV0").await.unwrap();
        let secret = store.get("Desktop Service", "acct").await.unwrap().unwrap();
        assert_eq!(secret.as_str(), "c2VjcmV0");

        let path = store.secret_path("Desktop Service", "acct");
        assert_eq!(path.file_name().unwrap(), "Desktop_Service.acct.secret");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_keystore_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeystore::new(dir.path());
        store.set("svc", "acct", "secret").await.unwrap();

        let mode = std::fs::metadata(store.secret_path("svc", "acct")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

//! # Boundary Dispatcher
//!
//! [`Boundary`] is the single context of the privileged side. It owns the key cache,
//! the CSP nonce, the pending lifecycle requests and the audit queue, and it is the
//! only way renderer calls reach a handler:
//!
//! ```text
//! renderer ──► invoke(channel, args) ──► validate ──► Request ──► handler ──► Value
//!                                           │
//!                                           └─ rejected ──► audit (ipc / payload-rejected)
//! ```

use crate::audit::{AUDIT_LOG_KEY, AuditDetails, AuditEvent, AuditTrail, AuditWriter};
use crate::config::BoundaryConfig;
use crate::csp::{
    CspOptions, NonceCell, ResourceType, ResponseHeaders, build_content_security_policy,
    inject_policy, is_main_document,
};
use crate::desktop;
use crate::error::{BoundaryError, BoundaryErrorExt};
use crate::host::HostShell;
use crate::lifecycle::{LifecycleAction, LifecycleCoordinator, LifecycleOutcome, RendererSurface};
use crate::redact::redact_args;
use crate::secure_store::{SECURE_PREFIX, SecureStore};
use crate::validator::{Channel, IpcValue, Request, ValidationError, validate_channel};
use serde_json::{Map, Value};
use shub_storage::{Store, write_atomic};
use shub_vault::{DEFAULT_KEY_ACCOUNT, DEFAULT_KEY_SERVICE, KeyManager, Keystore};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configures a [`Boundary`].
pub struct BoundaryBuilder<K, H> {
    store: Store,
    keystore: Arc<K>,
    host: Arc<H>,
    key_service: String,
    key_account: String,
    max_entries: usize,
    queue_capacity: usize,
    ack_timeout: Duration,
    development: bool,
    style_hashes: Vec<String>,
}

impl<K, H> std::fmt::Debug for BoundaryBuilder<K, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryBuilder")
            .field("key_service", &self.key_service)
            .field("max_entries", &self.max_entries)
            .field("ack_timeout", &self.ack_timeout)
            .field("development", &self.development)
            .finish_non_exhaustive()
    }
}

impl<K: Keystore, H: HostShell> BoundaryBuilder<K, H> {
    /// Applies every boundary-related setting of `config`. Storage location is not
    /// part of it: the store is already open.
    #[must_use]
    pub fn config(self, config: &BoundaryConfig) -> Self {
        self.key_identity(&config.keystore.service, &config.keystore.account)
            .max_entries(config.audit.max_entries)
            .queue_capacity(config.audit.queue_capacity)
            .ack_timeout(config.lifecycle.ack_timeout())
            .development(config.csp.development)
            .style_hashes(config.csp.style_hashes.clone())
    }

    #[must_use]
    pub fn key_identity(mut self, service: impl Into<String>, account: impl Into<String>) -> Self {
        self.key_service = service.into();
        self.key_account = account.into();
        self
    }

    #[must_use]
    pub const fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn development(mut self, enabled: bool) -> Self {
        self.development = enabled;
        self
    }

    #[must_use]
    pub fn style_hashes(mut self, hashes: Vec<String>) -> Self {
        self.style_hashes = hashes;
        self
    }

    /// Must run inside a tokio runtime: the audit writer is spawned here.
    ///
    /// # Errors
    /// [`BoundaryError::Internal`] when the first CSP nonce cannot be generated.
    pub fn build(self) -> Result<Boundary<K, H>, BoundaryError> {
        let keys =
            Arc::new(KeyManager::with_identity(self.keystore, self.key_service, self.key_account));
        let secure = SecureStore::new(self.store.clone(), keys);
        let audit = AuditWriter::spawn(AuditTrail::new(secure.clone(), self.max_entries), self.queue_capacity);

        Ok(Boundary {
            trail: AuditTrail::new(secure.clone(), self.max_entries),
            store: self.store,
            secure,
            audit,
            lifecycle: LifecycleCoordinator::new(self.ack_timeout),
            nonce: NonceCell::new()?,
            host: self.host,
            development: self.development,
            style_hashes: self.style_hashes,
        })
    }
}

/// The privileged side of the renderer bridge.
pub struct Boundary<K, H> {
    store: Store,
    secure: SecureStore<K>,
    audit: AuditWriter,
    trail: AuditTrail<K>,
    lifecycle: LifecycleCoordinator,
    nonce: NonceCell,
    host: Arc<H>,
    development: bool,
    style_hashes: Vec<String>,
}

impl<K, H> std::fmt::Debug for Boundary<K, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Boundary")
            .field("store", &self.store)
            .field("lifecycle", &self.lifecycle)
            .field("development", &self.development)
            .finish_non_exhaustive()
    }
}

impl<K: Keystore, H: HostShell> Boundary<K, H> {
    #[must_use]
    pub fn builder(store: Store, keystore: Arc<K>, host: Arc<H>) -> BoundaryBuilder<K, H> {
        BoundaryBuilder {
            store,
            keystore,
            host,
            key_service: DEFAULT_KEY_SERVICE.to_owned(),
            key_account: DEFAULT_KEY_ACCOUNT.to_owned(),
            max_entries: crate::audit::DEFAULT_MAX_ENTRIES,
            queue_capacity: crate::audit::DEFAULT_QUEUE_CAPACITY,
            ack_timeout: crate::lifecycle::DEFAULT_ACK_TIMEOUT,
            development: false,
            style_hashes: Vec::new(),
        }
    }

    /// Opens the configured store and builds the boundary on top of it.
    ///
    /// # Errors
    /// [`BoundaryError::Storage`] when the store cannot be opened; see also
    /// [`BoundaryBuilder::build`].
    pub async fn open(config: &BoundaryConfig, keystore: Arc<K>, host: Arc<H>) -> Result<Self, BoundaryError> {
        let store = Store::builder()
            .root(&config.storage.dir)
            .file_name(config.storage.file_name.clone())
            .create(true)
            .open()
            .await
            .context("Opening boundary store")?;
        info!(path = %config.storage.dir.display(), "Boundary store opened");
        Self::builder(store, keystore, host).config(config).build()
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn secure_store(&self) -> &SecureStore<K> {
        &self.secure
    }

    #[must_use]
    pub fn keys(&self) -> &Arc<KeyManager<K>> {
        self.secure.keys()
    }

    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleCoordinator {
        &self.lifecycle
    }

    #[must_use]
    pub const fn host(&self) -> &Arc<H> {
        &self.host
    }

    #[must_use]
    pub const fn audit(&self) -> &AuditWriter {
        &self.audit
    }

    /// Persisted audit events, after everything queued so far has been written.
    ///
    /// # Errors
    /// Any secure store failure reading the log.
    pub async fn audit_events(&self) -> Result<Vec<AuditEvent>, BoundaryError> {
        self.audit.flush().await;
        self.trail.events().await
    }

    // --- Renderer calls ---

    /// Handles an asynchronous renderer call.
    ///
    /// # Errors
    ///
    /// * [`BoundaryError::ValidationRejection`] with
    ///   `Rejected IPC payload for <channel>: <reason>` when the call does not validate;
    ///   the rejection is audited.
    /// * Any handler failure, unaudited.
    pub async fn invoke(&self, channel: &str, args: &[IpcValue]) -> Result<Value, BoundaryError> {
        let request = self.accept(channel, args, false).map_err(|reason| {
            BoundaryError::ValidationRejection {
                message: format!("Rejected IPC payload for {channel}: {reason}").into(),
                context: None,
            }
        })?;
        self.handle(request).await
    }

    /// Handles a synchronous renderer call. Rejections and handler failures are audited
    /// and answered with `null`.
    pub fn invoke_sync(&self, channel: &str, args: &[IpcValue]) -> Value {
        let Ok(request) = self.accept(channel, args, true) else {
            return Value::Null;
        };
        match request {
            Request::CspNonceSync => Value::String(self.nonce.current()),
            other => {
                let reason = format!("no synchronous handler for {}", other.channel());
                warn!(channel, %reason, "Synchronous handler failed");
                self.audit.submit(violation(channel, &reason, args));
                Value::Null
            },
        }
    }

    fn accept(&self, channel: &str, args: &[IpcValue], sync: bool) -> Result<Request, ValidationError> {
        Channel::from_str(channel)
            .ok()
            .filter(|c| c.is_sync() == sync)
            .ok_or_else(|| ValidationError::UnsupportedChannel { channel: channel.to_owned() })
            .and_then(|c| validate_channel(c, args))
            .inspect_err(|reason| {
                warn!(channel, %reason, "Rejected IPC payload");
                self.audit.submit(violation(channel, &reason.to_string(), args));
            })
    }

    async fn handle(&self, request: Request) -> Result<Value, BoundaryError> {
        let channel = request.channel();
        debug!(%channel, "Dispatching renderer call");
        let done = Value::Bool(true);

        let value = match request {
            Request::StoreGet { key } => self.store.get(key.as_str()).unwrap_or(Value::Null),
            Request::StoreSet { key, value } => {
                self.store.set(key.as_str(), value).await?;
                done
            },
            Request::StoreDelete { key } => {
                self.store.delete(key.as_str()).await?;
                done
            },
            Request::StoreClear => {
                self.store.retain(|name, _| name.starts_with(SECURE_PREFIX)).await?;
                done
            },
            Request::SecureStoreGet { key } => self.secure.get(key.as_str()).await?.unwrap_or(Value::Null),
            Request::SecureStoreSet { key, value } => {
                self.secure.set(key.as_str(), &value).await?;
                done
            },
            Request::SecureStoreDelete { key } => {
                self.secure.delete(key.as_str()).await?;
                done
            },
            Request::SecureStoreClear => {
                self.secure.clear_retaining(&[AUDIT_LOG_KEY]).await?;
                done
            },
            Request::AppQuit => {
                self.host.quit();
                done
            },
            Request::AppMinimize => {
                self.host.minimize();
                done
            },
            Request::AppMaximize => Value::Bool(self.host.toggle_maximize()),
            Request::AppClose => {
                self.host.close();
                done
            },
            Request::AppGetVersion => Value::String(self.host.version()),
            Request::FsReadFile { path } => Value::String(
                tokio::fs::read_to_string(&path)
                    .await
                    .context(format!("Reading {}", path.display()))?,
            ),
            Request::FsWriteFile { path, data } => {
                write_atomic(&path, data.as_bytes()).await?;
                done
            },
            Request::FsFileExists { path } => {
                Value::Bool(tokio::fs::try_exists(&path).await.unwrap_or(false))
            },
            Request::DialogOpenFile(options) => serde_json::to_value(self.host.open_dialog(&options).await?)?,
            Request::DialogSaveFile(options) => serde_json::to_value(self.host.save_dialog(&options).await?)?,
            Request::CspNonce | Request::CspNonceSync => Value::String(self.nonce.current()),
            Request::DesktopAction(action) => {
                serde_json::to_value(desktop::perform(&action, &*self.host, &self.audit))?
            },
            Request::LifecycleAck(ack) => {
                self.lifecycle.acknowledge(ack);
                done
            },
            Request::CheckForUpdates => Value::Bool(self.check_for_updates().await?),
        };
        Ok(value)
    }

    async fn check_for_updates(&self) -> Result<bool, BoundaryError> {
        let version = self.host.version();
        let updater = |action: &str, status: &str| {
            AuditDetails::new()
                .category("auto-updater")
                .action(action)
                .key(version.clone())
                .status(status)
                .level(if status == "error" { "error" } else { "info" })
                .actor("system")
        };

        self.audit.submit(updater("check-scheduled", "success").meta("reason", "manual"));
        match self.host.check_for_updates().await {
            Ok(started) => {
                self.audit.submit(updater("check-completed", "success").meta("reason", "manual"));
                Ok(started)
            },
            Err(e) => {
                warn!(error = %e, "Update check failed");
                self.audit.submit(updater("check-failed", "error").meta("message", e.to_string()));
                Err(e)
            },
        }
    }

    // --- Content security ---

    /// The nonce of the current document.
    #[must_use]
    pub fn nonce(&self) -> String {
        self.nonce.current()
    }

    /// The policy for the current document.
    ///
    /// # Errors
    /// See [`build_content_security_policy`].
    pub fn content_security_policy(&self) -> Result<String, BoundaryError> {
        let nonce = self.nonce.current();
        build_content_security_policy(&CspOptions {
            is_development: self.development,
            nonce: &nonce,
            style_hashes: &self.style_hashes,
        })
    }

    /// Adds the policy header to document responses. Returns whether `headers` changed.
    ///
    /// # Errors
    /// See [`build_content_security_policy`].
    pub fn intercept_response(
        &self,
        url: &str,
        resource: ResourceType,
        headers: &mut ResponseHeaders,
    ) -> Result<bool, BoundaryError> {
        if !is_main_document(resource, url) {
            return Ok(false);
        }
        inject_policy(headers, self.content_security_policy()?);
        Ok(true)
    }

    /// A new document is about to load: rotates the nonce.
    ///
    /// # Errors
    /// [`BoundaryError::Internal`] when the RNG fails; the old nonce stays in place.
    pub fn on_navigation_start(&self) -> Result<String, BoundaryError> {
        self.nonce.rotate()
    }

    /// A window was created: rotates the nonce and routes lifecycle requests to it.
    ///
    /// # Errors
    /// See [`Boundary::on_navigation_start`].
    pub fn attach_renderer(&self, surface: Arc<dyn RendererSurface>) -> Result<(), BoundaryError> {
        self.nonce.rotate()?;
        self.lifecycle.attach(surface);
        Ok(())
    }

    pub fn detach_renderer(&self) {
        self.lifecycle.detach();
    }

    // --- Power and quit events ---

    /// The system is suspending: lets the renderer prepare, then drops the key.
    pub async fn suspend(&self) -> LifecycleOutcome {
        let outcome = self
            .lifecycle
            .request_acknowledgment(LifecycleAction::PrepareSuspend, source("powerMonitor:suspend"))
            .await;
        self.keys().release();
        info!(status = %outcome.status, "Suspend handled");
        outcome
    }

    /// The system resumed: reloads the key and tells the renderer.
    pub async fn resume(&self) -> LifecycleOutcome {
        self.keys().release();
        if let Err(e) = self.keys().master_key().await {
            warn!(error = %e, "Master key could not be reloaded after resume");
        }
        let outcome = self
            .lifecycle
            .request_acknowledgment(LifecycleAction::Resume, source("powerMonitor:resume"))
            .await;
        info!(status = %outcome.status, "Resume handled");
        outcome
    }

    /// The user asked to quit: lets the renderer prepare, then drops the key.
    pub async fn before_quit(&self) -> LifecycleOutcome {
        let outcome = self
            .lifecycle
            .request_acknowledgment(LifecycleAction::PrepareBeforeQuit, source("app:before-quit"))
            .await;
        self.keys().release();
        outcome
    }

    /// Last call before exit: drains the audit queue, then drops the key.
    pub async fn will_quit(&self) {
        self.audit.flush().await;
        self.keys().release();
    }
}

fn violation(channel: &str, reason: &str, args: &[IpcValue]) -> AuditDetails {
    AuditDetails::new().key(channel).meta("reason", reason).meta("sample", redact_args(args))
}

fn source(name: &str) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("source".into(), Value::from(name));
    metadata
}

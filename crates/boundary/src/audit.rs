//! # Audit Trail
//!
//! Security-relevant events are appended to one encrypted log in the secure store,
//! under [`AUDIT_LOG_KEY`]:
//!
//! ```text
//! { "__meta": { "schemaVersion": 1, "storedAt": <RFC 3339> }, "data": [AuditEvent, ...] }
//! ```
//!
//! Only the most recent entries are kept. Appends are read-modify-write, so they are
//! funnelled through [`AuditWriter`], a single task draining a bounded queue; callers
//! submit and move on.

use crate::error::BoundaryError;
use crate::ids::event_id;
use crate::secure_store::SecureStore;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use shub_vault::Keystore;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub const AUDIT_LOG_KEY: &str = "app_security_audit_log";
pub const DEFAULT_MAX_ENTRIES: usize = 500;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
const SCHEMA_VERSION: u64 = 1;

const MAX_METADATA_KEY_CHARS: usize = 64;
const MAX_METADATA_VALUE_CHARS: usize = 256;
const METADATA_VALUE_KEEP_CHARS: usize = 253;

/// One persisted audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: String,
    pub category: String,
    pub action: String,
    pub key: String,
    pub status: String,
    pub level: String,
    pub actor: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// What the caller knows about an event; unset fields take the defaults of an IPC
/// payload rejection.
#[derive(Debug, Clone, Default)]
pub struct AuditDetails {
    category: Option<String>,
    action: Option<String>,
    key: Option<String>,
    status: Option<String>,
    level: Option<String>,
    actor: Option<String>,
    origin: Option<String>,
    metadata: Map<String, Value>,
}

macro_rules! details_setter {
    ($($field:ident),* $(,)?) => {
        $(
            #[must_use]
            pub fn $field(mut self, value: impl Into<String>) -> Self {
                self.$field = Some(value.into());
                self
            }
        )*
    };
}

impl AuditDetails {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    details_setter!(category, action, key, status, level, actor, origin);

    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn into_event(self) -> AuditEvent {
        let or = |v: Option<String>, default: &str| v.unwrap_or_else(|| default.to_owned());
        AuditEvent {
            id: event_id(),
            timestamp: now(),
            category: or(self.category, "ipc"),
            action: or(self.action, "payload-rejected"),
            key: or(self.key, "unknown"),
            status: or(self.status, "error"),
            level: or(self.level, "warning"),
            actor: or(self.actor, "renderer"),
            origin: or(self.origin, "main-process"),
            metadata: sanitize_metadata(self.metadata),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Flattens metadata to short strings: keys trimmed and cut to 64 characters, values
/// stringified and cut to 256 (253 plus `...`), `null` entries dropped.
#[must_use]
pub fn sanitize_metadata(metadata: Map<String, Value>) -> Option<Map<String, Value>> {
    let mut out = Map::new();
    for (raw_key, raw_value) in metadata {
        let key = raw_key.trim();
        if key.is_empty() {
            continue;
        }
        let text = match raw_value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        };
        let text = if text.chars().count() > MAX_METADATA_VALUE_CHARS {
            let cut: String = text.chars().take(METADATA_VALUE_KEEP_CHARS).collect();
            format!("{cut}...")
        } else {
            text
        };
        out.insert(key.chars().take(MAX_METADATA_KEY_CHARS).collect(), Value::String(text));
    }
    (!out.is_empty()).then_some(out)
}

/// Direct access to the persisted log.
#[derive(Debug)]
pub struct AuditTrail<K> {
    secure: SecureStore<K>,
    max_entries: usize,
}

impl<K: Keystore> AuditTrail<K> {
    #[must_use]
    pub fn new(secure: SecureStore<K>, max_entries: usize) -> Self {
        Self { secure, max_entries: max_entries.max(1) }
    }

    /// Appends one event and trims the log to the newest `max_entries`.
    ///
    /// A log stored as a bare array is accepted and rewritten in the wrapped form.
    /// `schemaVersion` is carried through unchanged.
    ///
    /// # Errors
    /// Any [`SecureStore`] failure reading or writing the log.
    pub async fn append(&self, details: AuditDetails) -> Result<AuditEvent, BoundaryError> {
        let (mut events, schema_version) = split_log(self.secure.get(AUDIT_LOG_KEY).await?);

        let event = details.into_event();
        events.push(serde_json::to_value(&event)?);
        if events.len() > self.max_entries {
            events.drain(..events.len() - self.max_entries);
        }

        let log = json!({
            "__meta": { "schemaVersion": schema_version, "storedAt": now() },
            "data": events,
        });
        self.secure.set(AUDIT_LOG_KEY, &log).await?;
        Ok(event)
    }

    /// Events oldest first. Entries that do not parse as [`AuditEvent`] are skipped.
    ///
    /// # Errors
    /// Any [`SecureStore`] failure reading the log.
    pub async fn events(&self) -> Result<Vec<AuditEvent>, BoundaryError> {
        let (events, _) = split_log(self.secure.get(AUDIT_LOG_KEY).await?);
        Ok(events.into_iter().filter_map(|e| serde_json::from_value(e).ok()).collect())
    }
}

fn split_log(current: Option<Value>) -> (Vec<Value>, Value) {
    let default_version = Value::from(SCHEMA_VERSION);
    match current {
        Some(Value::Array(events)) => (events, default_version),
        Some(Value::Object(mut log)) => {
            let version = log
                .get("__meta")
                .and_then(|m| m.get("schemaVersion"))
                .filter(|v| v.is_number())
                .cloned()
                .unwrap_or(default_version);
            match log.remove("data") {
                Some(Value::Array(events)) => (events, version),
                _ => (Vec::new(), Value::from(SCHEMA_VERSION)),
            }
        }
        _ => (Vec::new(), default_version),
    }
}

enum Command {
    Append(AuditDetails),
    Flush(oneshot::Sender<()>),
}

/// Handle to the single task that owns all audit appends.
///
/// Cheap to clone. The task stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct AuditWriter {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append(details) => f.debug_tuple("Append").field(details).finish(),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl AuditWriter {
    /// Starts the writer on the current tokio runtime.
    #[must_use]
    pub fn spawn<K: Keystore>(trail: AuditTrail<K>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Append(details) => {
                        if let Err(e) = trail.append(details).await {
                            warn!(error = %e, kind = e.kind(), "Failed to append audit log event");
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Audit writer stopped");
        });
        Self { tx }
    }

    /// Queues an event without waiting. A full or closed queue drops it with a warning.
    pub fn submit(&self, details: AuditDetails) {
        if let Err(e) = self.tx.try_send(Command::Append(details)) {
            warn!(error = %e, "Audit event dropped");
        }
    }

    /// Resolves once everything submitted before the call has been written.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }
}

//! # Lifecycle Coordination
//!
//! Before the host suspends or quits, the renderer gets a chance to flush its state.
//! A request goes out on [`LIFECYCLE_CHANNEL`] and the coordinator waits, bounded by a
//! timeout, for the matching `lifecycle-ack`. Requests never fail: every path resolves
//! to a [`LifecycleOutcome`].

use crate::error::BoundaryError;
use crate::ids::event_id;
use crate::validator::LifecycleAck;
use chrono::Utc;
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const LIFECYCLE_CHANNEL: &str = "system-lifecycle";
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Where lifecycle requests are delivered; implemented by the window system.
pub trait RendererSurface: Send + Sync + 'static {
    fn send(&self, channel: &str, payload: Value) -> Result<(), BoundaryError>;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, AsRefStr, IntoStaticStr, Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LifecycleAction {
    PrepareSuspend,
    Resume,
    PrepareBeforeQuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleStatus {
    Acknowledged,
    Timeout,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleOutcome {
    pub action: LifecycleAction,
    pub acknowledged: bool,
    /// The renderer's own status when it answered, otherwise `timeout`, `skipped` or `error`.
    pub status: String,
    #[serde(skip)]
    pub kind: LifecycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub elapsed_ms: f64,
}

impl LifecycleOutcome {
    fn unanswered(
        action: LifecycleAction,
        status: LifecycleStatus,
        reason: impl Into<String>,
        started: Instant,
    ) -> Self {
        Self {
            action,
            acknowledged: false,
            status: status.to_string(),
            kind: status,
            reason: Some(reason.into()),
            details: None,
            elapsed_ms: elapsed_ms(started),
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[derive(Debug)]
struct Pending {
    action: LifecycleAction,
    tx: oneshot::Sender<LifecycleAck>,
}

/// Tracks in-flight lifecycle requests and the renderer they go to.
pub struct LifecycleCoordinator {
    surface: RwLock<Option<Arc<dyn RendererSurface>>>,
    pending: Mutex<FxHashMap<String, Pending>>,
    timeout: Duration,
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("attached", &self.surface.read().is_some())
            .field("pending", &self.pending.lock().len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for LifecycleCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_ACK_TIMEOUT)
    }
}

/// Removes a pending entry when the waiting request goes away, whatever the path.
struct PendingGuard<'a> {
    pending: &'a Mutex<FxHashMap<String, Pending>>,
    id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl LifecycleCoordinator {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { surface: RwLock::new(None), pending: Mutex::new(FxHashMap::default()), timeout }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn attach(&self, surface: Arc<dyn RendererSurface>) {
        *self.surface.write() = Some(surface);
        debug!("Renderer surface attached");
    }

    pub fn detach(&self) {
        *self.surface.write() = None;
        debug!("Renderer surface detached");
    }

    /// Number of requests still waiting for an answer.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Asks the renderer to handle `action` and waits for its acknowledgment.
    ///
    /// The payload sent is `{id, action, timestamp, ...metadata}`.
    pub async fn request_acknowledgment(
        &self,
        action: LifecycleAction,
        metadata: Map<String, Value>,
    ) -> LifecycleOutcome {
        let started = Instant::now();
        let Some(surface) = self.surface.read().clone() else {
            debug!(%action, "No renderer attached; lifecycle request skipped");
            return LifecycleOutcome::unanswered(action, LifecycleStatus::Skipped, "no-window", started);
        };

        let id = event_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id.clone(), Pending { action, tx });
        let _guard = PendingGuard { pending: &self.pending, id: id.clone() };

        let mut payload = Map::new();
        payload.insert("id".into(), Value::String(id.clone()));
        payload.insert("action".into(), Value::String(action.to_string()));
        payload.insert("timestamp".into(), Value::from(Utc::now().timestamp_millis()));
        payload.extend(metadata);

        if let Err(e) = surface.send(LIFECYCLE_CHANNEL, Value::Object(payload)) {
            warn!(%action, error = %e, "Failed to deliver lifecycle request");
            return LifecycleOutcome::unanswered(action, LifecycleStatus::Error, e.to_string(), started);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(ack)) => {
                info!(%action, status = %ack.status, "Renderer acknowledged lifecycle request");
                LifecycleOutcome {
                    action,
                    acknowledged: true,
                    status: ack.status,
                    kind: LifecycleStatus::Acknowledged,
                    reason: None,
                    details: ack.details,
                    elapsed_ms: ack.elapsed_ms.unwrap_or_else(|| elapsed_ms(started)),
                }
            },
            Ok(Err(_)) => {
                LifecycleOutcome::unanswered(action, LifecycleStatus::Error, "acknowledgment-dropped", started)
            },
            Err(_) => {
                warn!(%action, timeout = ?self.timeout, "Renderer did not acknowledge in time");
                LifecycleOutcome::unanswered(action, LifecycleStatus::Timeout, "renderer-ack-timeout", started)
            },
        }
    }

    /// Resolves the request named by `ack.id`. Unknown ids are ignored.
    ///
    /// Returns whether a waiting request was resolved.
    pub fn acknowledge(&self, ack: LifecycleAck) -> bool {
        let Some(Pending { action, tx }) = self.pending.lock().remove(&ack.id) else {
            debug!(id = %ack.id, "Acknowledgment for unknown lifecycle request");
            return false;
        };
        debug!(%action, id = %ack.id, "Lifecycle acknowledgment received");
        tx.send(ack).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, Value)>>,
        fail: bool,
    }

    impl RendererSurface for Recorder {
        fn send(&self, channel: &str, payload: Value) -> Result<(), BoundaryError> {
            if self.fail {
                return Err(BoundaryError::host("window destroyed"));
            }
            self.sent.lock().push((channel.to_owned(), payload));
            Ok(())
        }
    }

    fn ack(id: &str) -> LifecycleAck {
        LifecycleAck { id: id.to_owned(), status: "ok".into(), details: None, elapsed_ms: Some(4.0) }
    }

    #[tokio::test]
    async fn test_skipped_without_renderer() {
        let outcome = LifecycleCoordinator::default()
            .request_acknowledgment(LifecycleAction::Resume, Map::new())
            .await;
        assert_eq!(outcome.kind, LifecycleStatus::Skipped);
        assert_eq!(outcome.reason.as_deref(), Some("no-window"));
        assert!(!outcome.acknowledged);
    }

    #[tokio::test]
    async fn test_send_failure_is_an_outcome() {
        let coordinator = LifecycleCoordinator::default();
        coordinator.attach(Arc::new(Recorder { fail: true, ..Recorder::default() }));
        let outcome = coordinator.request_acknowledgment(LifecycleAction::PrepareSuspend, Map::new()).await;
        assert_eq!(outcome.kind, LifecycleStatus::Error);
        assert!(outcome.reason.unwrap().contains("window destroyed"));
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_pending() {
        let coordinator = LifecycleCoordinator::new(Duration::from_millis(50));
        coordinator.attach(Arc::new(Recorder::default()));
        let outcome = coordinator.request_acknowledgment(LifecycleAction::PrepareSuspend, Map::new()).await;
        assert_eq!(outcome.kind, LifecycleStatus::Timeout);
        assert_eq!(outcome.reason.as_deref(), Some("renderer-ack-timeout"));
        assert_eq!(coordinator.pending(), 0);
    }

    #[tokio::test]
    async fn test_acknowledged_request() {
        let coordinator = Arc::new(LifecycleCoordinator::default());
        let recorder = Arc::new(Recorder::default());
        coordinator.attach(recorder.clone());

        let mut metadata = Map::new();
        metadata.insert("source".into(), Value::from("powerMonitor:suspend"));
        let waiting = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator.request_acknowledgment(LifecycleAction::PrepareSuspend, metadata).await
            })
        };

        let id = loop {
            if let Some((_, payload)) = recorder.sent.lock().first() {
                break payload["id"].as_str().unwrap().to_owned();
            }
            tokio::task::yield_now().await;
        };
        {
            let sent = recorder.sent.lock();
            assert_eq!(sent[0].0, LIFECYCLE_CHANNEL);
            assert_eq!(sent[0].1["action"], "prepare-suspend");
            assert_eq!(sent[0].1["source"], "powerMonitor:suspend");
        }

        assert!(coordinator.acknowledge(ack(&id)));
        let outcome = waiting.await.unwrap();
        assert!(outcome.acknowledged);
        assert_eq!(outcome.kind, LifecycleStatus::Acknowledged);
        assert!((outcome.elapsed_ms - 4.0).abs() < f64::EPSILON);
        assert!(!coordinator.acknowledge(ack(&id)));

        let wire = serde_json::to_value(&outcome).unwrap();
        assert_eq!(wire["acknowledged"], true);
        assert_eq!(wire["status"], "ok");
        assert_eq!(wire["elapsedMs"], 4.0);
        assert!(wire.get("kind").is_none());
    }

    #[tokio::test]
    async fn test_unanswered_outcome_wire_shape() {
        let outcome = LifecycleCoordinator::default()
            .request_acknowledgment(LifecycleAction::PrepareBeforeQuit, Map::new())
            .await;
        let wire = serde_json::to_value(&outcome).unwrap();
        assert_eq!(wire["action"], "prepare-before-quit");
        assert_eq!(wire["acknowledged"], false);
        assert_eq!(wire["status"], "skipped");
        assert_eq!(wire["reason"], "no-window");
    }
}

#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::Value;
use shub_boundary::validator::{DialogOptions, Notification};
use shub_boundary::{Boundary, BoundaryError, DialogResult, HostShell, IpcValue, RendererSurface};
use shub_storage::Store;
use shub_vault::MemoryKeystore;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub type TestBoundary = Boundary<MemoryKeystore, TestHost>;

/// Window system double that records what the boundary asked of it.
#[derive(Debug, Default)]
pub struct TestHost {
    pub maximized: AtomicBool,
    pub quits: AtomicUsize,
    pub notifications: Mutex<Vec<Notification>>,
    pub fail_updates: AtomicBool,
}

impl HostShell for TestHost {
    fn version(&self) -> String {
        "1.4.0".to_owned()
    }

    fn quit(&self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }

    fn minimize(&self) {}

    fn toggle_maximize(&self) -> bool {
        !self.maximized.fetch_xor(true, Ordering::SeqCst)
    }

    fn close(&self) {}

    fn notify(&self, notification: &Notification) -> Result<(), BoundaryError> {
        self.notifications.lock().push(notification.clone());
        Ok(())
    }

    fn open_dialog(
        &self,
        _options: &DialogOptions,
    ) -> impl Future<Output = Result<DialogResult, BoundaryError>> + Send {
        async { Ok(DialogResult::canceled()) }
    }

    fn save_dialog(
        &self,
        options: &DialogOptions,
    ) -> impl Future<Output = Result<DialogResult, BoundaryError>> + Send {
        let chosen = options.default_path.clone();
        async move {
            Ok(DialogResult { canceled: chosen.is_none(), file_paths: Vec::new(), file_path: chosen })
        }
    }

    fn check_for_updates(&self) -> impl Future<Output = Result<bool, BoundaryError>> + Send {
        let fail = self.fail_updates.load(Ordering::SeqCst);
        async move { if fail { Err(BoundaryError::host("update feed unreachable")) } else { Ok(true) } }
    }
}

/// Renderer double: records every lifecycle request it receives.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub sent: Mutex<Vec<(String, Value)>>,
}

impl RendererSurface for RecordingSurface {
    fn send(&self, channel: &str, payload: Value) -> Result<(), BoundaryError> {
        self.sent.lock().push((channel.to_owned(), payload));
        Ok(())
    }
}

impl RecordingSurface {
    /// Waits until `count` requests have arrived and returns the id of the last one.
    pub async fn nth_request_id(&self, count: usize) -> String {
        loop {
            if let Some((_, payload)) = self.sent.lock().get(count - 1) {
                return payload["id"].as_str().unwrap().to_owned();
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

pub fn keystore() -> Arc<MemoryKeystore> {
    Arc::new(MemoryKeystore::new())
}

pub fn boundary_with(keystore: Arc<MemoryKeystore>) -> (TestBoundary, Arc<TestHost>) {
    let host = Arc::new(TestHost::default());
    let boundary = Boundary::builder(Store::memory(), keystore, Arc::clone(&host))
        .ack_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    (boundary, host)
}

pub fn boundary() -> (TestBoundary, Arc<TestHost>) {
    boundary_with(keystore())
}

pub fn wire(value: Value) -> IpcValue {
    IpcValue::from_wire(value)
}

//! Window system stand-in for running the boundary without a GUI.

use shub_boundary::validator::{DialogOptions, Notification};
use shub_boundary::{BoundaryError, DialogResult, HostShell};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::info;

/// Dialogs resolve as cancelled, notifications go to the log and quitting wakes
/// [`HeadlessShell::exit_requested`].
#[derive(Debug, Default)]
pub(crate) struct HeadlessShell {
    maximized: AtomicBool,
    exit: Notify,
}

impl HeadlessShell {
    /// Resolves once the renderer asked to quit or close.
    pub(crate) async fn exit_requested(&self) {
        self.exit.notified().await;
    }

    pub(crate) fn request_exit(&self) {
        self.exit.notify_one();
    }
}

impl HostShell for HeadlessShell {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_owned()
    }

    fn quit(&self) {
        info!("Quit requested by renderer");
        self.request_exit();
    }

    fn minimize(&self) {
        info!("Minimize requested by renderer");
    }

    fn toggle_maximize(&self) -> bool {
        !self.maximized.fetch_xor(true, Ordering::SeqCst)
    }

    fn close(&self) {
        info!("Close requested by renderer");
        self.request_exit();
    }

    fn notify(&self, notification: &Notification) -> Result<(), BoundaryError> {
        info!(
            severity = %notification.severity,
            title = %notification.title,
            message = %notification.message,
            "Desktop notification"
        );
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
        _options: &DialogOptions,
    ) -> impl Future<Output = Result<DialogResult, BoundaryError>> + Send {
        async { Ok(DialogResult::canceled()) }
    }

    fn check_for_updates(&self) -> impl Future<Output = Result<bool, BoundaryError>> + Send {
        async { Ok(false) }
    }
}

//! Privileged operations provided by the window system.

use crate::error::BoundaryError;
use crate::validator::{DialogOptions, Notification};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;

/// What a file dialog resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogResult {
    pub canceled: bool,
    pub file_paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl DialogResult {
    #[must_use]
    pub fn canceled() -> Self {
        Self { canceled: true, ..Self::default() }
    }
}

/// Window, dialog and updater operations the boundary delegates to.
pub trait HostShell: Send + Sync + 'static {
    fn version(&self) -> String;

    fn quit(&self);

    fn minimize(&self);

    /// Toggles the maximized state. Returns whether the window is maximized afterwards,
    /// `false` when there is no window.
    fn toggle_maximize(&self) -> bool;

    fn close(&self);

    /// Shows a validated notification.
    fn notify(&self, notification: &Notification) -> Result<(), BoundaryError>;

    fn open_dialog(
        &self,
        options: &DialogOptions,
    ) -> impl Future<Output = Result<DialogResult, BoundaryError>> + Send;

    fn save_dialog(
        &self,
        options: &DialogOptions,
    ) -> impl Future<Output = Result<DialogResult, BoundaryError>> + Send;

    /// Starts an update check. Returns whether a check was started.
    fn check_for_updates(&self) -> impl Future<Output = Result<bool, BoundaryError>> + Send;
}

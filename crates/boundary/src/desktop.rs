//! # Desktop Actions
//!
//! Host-side policy for `desktop-secure-action`. The validator has already shaped the
//! payload; here the host decides whether the action goes ahead and records the
//! decision in the audit trail.

use crate::audit::{AuditDetails, AuditWriter};
use crate::host::HostShell;
use crate::validator::{DesktopAction, DragIntent, ExportRequest, Notification, sanitize_file_name};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Document types accepted from drag and drop.
pub const TECHNICAL_FILE_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-powerpoint",
];
pub const TECHNICAL_FILE_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DRAG_TOTAL_LIMIT: u64 = 50 * 1024 * 1024;

pub const EXPORT_FORMATS: &[&str] =
    &["csv", "json", "xlsx", "xls", "pdf", "docx", "doc", "pptx", "ppt", "binary"];
pub const EXPORT_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Reply to a desktop action: `{allowed, reason?, payload?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesktopOutcome {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl DesktopOutcome {
    fn allow(payload: Value) -> Self {
        Self { allowed: true, reason: None, payload: Some(payload) }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()), payload: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct FileVerdict<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    mime_type: &'a str,
    size: u64,
    allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a Value>,
}

/// Applies the per-file and aggregate drag policy.
///
/// A file passes when its type is a technical document and it is at most 10 MiB. When
/// the files together exceed 50 MiB every one of them is blocked.
#[must_use]
pub fn drag_policy(intent: &DragIntent) -> (DesktopOutcome, AuditDetails) {
    let mut total: u64 = 0;
    let mut files: Vec<FileVerdict<'_>> = intent
        .files
        .iter()
        .map(|file| {
            total = total.saturating_add(file.size);
            let reason = if !TECHNICAL_FILE_TYPES.contains(&file.mime_type.as_str()) {
                Some("unsupported-type")
            } else if file.size > TECHNICAL_FILE_MAX_BYTES {
                Some("file-too-large")
            } else {
                None
            };
            FileVerdict {
                name: &file.name,
                mime_type: &file.mime_type,
                size: file.size,
                allowed: reason.is_none(),
                reason,
                metadata: file.metadata.as_ref(),
            }
        })
        .collect();

    let audit = AuditDetails::new()
        .category("desktop")
        .action("drag-intent")
        .key(sanitize_file_name(&intent.intent, "file"))
        .meta("source", intent.source.as_deref().unwrap_or("unknown"))
        .meta("tenderId", intent.tender_id.as_deref().unwrap_or_default())
        .meta("files", files.len().to_string());

    if total > DRAG_TOTAL_LIMIT {
        for file in &mut files {
            file.allowed = false;
            file.reason = Some("aggregate-limit-exceeded");
        }
        let outcome = DesktopOutcome {
            allowed: false,
            reason: Some("aggregate-limit-exceeded".into()),
            payload: Some(drag_payload(intent, &files)),
        };
        let audit = audit.status("error").level("warning").meta("reason", "aggregate-limit-exceeded");
        return (outcome, audit);
    }

    let allowed_files = files.iter().filter(|f| f.allowed).count();
    let allowed = allowed_files > 0;
    let outcome = DesktopOutcome {
        allowed,
        reason: (!allowed).then(|| "no-files-allowed".to_owned()),
        payload: Some(drag_payload(intent, &files)),
    };
    let audit = audit
        .status(if allowed { "success" } else { "error" })
        .level(if allowed { "info" } else { "warning" })
        .meta("allowedFiles", allowed_files.to_string())
        .meta("blockedFiles", (files.len() - allowed_files).to_string());
    (outcome, audit)
}

fn drag_payload(intent: &DragIntent, files: &[FileVerdict<'_>]) -> Value {
    json!({
        "intent": intent.intent,
        "source": intent.source,
        "tenderId": intent.tender_id,
        "files": files,
    })
}

/// Re-checks an export against the host's format allowlist and size ceiling.
///
/// Only approved exports are audited.
#[must_use]
pub fn export_policy(request: &ExportRequest) -> (DesktopOutcome, Option<AuditDetails>) {
    let format: &str = request.format.as_ref();
    if !EXPORT_FORMATS.contains(&format) {
        return (DesktopOutcome::deny("unsupported-format"), None);
    }
    if request.bytes.is_some_and(|b| b > EXPORT_MAX_BYTES) {
        return (DesktopOutcome::deny("payload-too-large"), None);
    }

    let filename = sanitize_file_name(&request.filename, "export");
    let mut audit = AuditDetails::new()
        .category("desktop")
        .action("export")
        .key(filename.clone())
        .status("success")
        .level("info")
        .meta("format", format)
        .meta("origin", request.origin.as_deref().unwrap_or("renderer"));
    if let Some(rows) = request.rows {
        audit = audit.meta("rows", rows.to_string());
    }

    let mut payload = serde_json::to_value(request).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut payload {
        map.insert("filename".into(), Value::String(filename));
    }
    (DesktopOutcome::allow(payload), Some(audit))
}

#[must_use]
pub fn notify_audit(notification: &Notification) -> AuditDetails {
    AuditDetails::new()
        .category("desktop")
        .action("notify")
        .key(sanitize_file_name(notification.scope.as_deref().unwrap_or("global"), "file"))
        .status("success")
        .level("info")
        .meta("severity", notification.severity.to_string())
        .meta("title", notification.title.as_str())
        .meta("correlationId", notification.correlation_id.as_deref().unwrap_or_default())
}

/// Runs one validated desktop action. Host failures become a refusal carrying the
/// error message.
pub fn perform<H: HostShell>(action: &DesktopAction, host: &H, audit: &AuditWriter) -> DesktopOutcome {
    debug!(action = action.name(), "Desktop action requested");
    match action {
        DesktopAction::Notify(notification) => {
            if let Err(e) = host.notify(notification) {
                warn!(error = %e, "Notification could not be shown");
                return DesktopOutcome::deny(e.to_string());
            }
            audit.submit(notify_audit(notification));
            match serde_json::to_value(notification) {
                Ok(payload) => DesktopOutcome::allow(payload),
                Err(e) => DesktopOutcome::deny(e.to_string()),
            }
        },
        DesktopAction::DragIntent(intent) => {
            let (outcome, details) = drag_policy(intent);
            audit.submit(details);
            outcome
        },
        DesktopAction::Export(request) => {
            let (outcome, details) = export_policy(request);
            if let Some(details) = details {
                audit.submit(details);
            }
            outcome
        },
    }
}

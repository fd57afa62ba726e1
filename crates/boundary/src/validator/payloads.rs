//! Composite payloads: dialog options, desktop actions, lifecycle acknowledgements and
//! file data.

use super::error::ValidationError;
use super::limits::{
    MAX_DRAG_FILE_BYTES, MAX_DRAG_FILES, MAX_DRAG_SOURCE_LENGTH, MAX_DRAG_TENDER_ID_LENGTH,
    MAX_DRAG_TOTAL_BYTES, MAX_DRAG_TYPE_LENGTH, MAX_EXPORT_BYTES, MAX_EXPORT_ORIGIN_LENGTH,
    MAX_FILTER_EXTENSION_LENGTH, MAX_NOTIFICATION_ACTION_LENGTH,
    MAX_NOTIFICATION_DESCRIPTION_LENGTH, MAX_NOTIFICATION_DURATION_MS,
    MAX_NOTIFICATION_MESSAGE_LENGTH, MAX_NOTIFICATION_TAG_LENGTH, MAX_NOTIFICATION_TITLE_LENGTH,
    MAX_SERIALIZED_PAYLOAD_SIZE,
};
use super::primitives::{
    check_serializable, ensure_string, file_name, non_negative_whole, optional_serializable,
    optional_text, sanitize_path, truncate_chars,
};
use super::value::IpcValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};

// --- Dialogs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    Open,
    Save,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr, Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum DialogProperty {
    OpenFile,
    OpenDirectory,
    MultiSelections,
    ShowHiddenFiles,
    CreateDirectory,
    PromptToCreate,
    TreatPackageAsDirectory,
    DontAddToRecent,
}

impl DialogProperty {
    #[must_use]
    pub const fn allowed_in(self, mode: DialogMode) -> bool {
        match mode {
            DialogMode::Open => true,
            DialogMode::Save => matches!(
                self,
                Self::ShowHiddenFiles
                    | Self::CreateDirectory
                    | Self::TreatPackageAsDirectory
                    | Self::DontAddToRecent
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

/// Options forwarded to the host's file dialogs. Unknown fields are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FileFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<DialogProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_field_label: Option<String>,
}

/// Anything that is not an object yields empty options.
pub(crate) fn dialog_options(
    value: Option<&IpcValue>,
    mode: DialogMode,
) -> Result<DialogOptions, ValidationError> {
    let Some(options) = value.filter(|v| v.is_object()) else {
        return Ok(DialogOptions::default());
    };

    let mut sanitized = DialogOptions {
        title: options.get("title").map(|t| ensure_string(Some(t), "dialog title", true)).transpose()?,
        default_path: options
            .get("defaultPath")
            .map(|p| sanitize_path(Some(p), "dialog defaultPath"))
            .transpose()?,
        filters: filters(options.get("filters"))?,
        properties: properties(options.get("properties"), mode),
        ..DialogOptions::default()
    };

    if mode == DialogMode::Save {
        sanitized.button_label = options
            .get("buttonLabel")
            .map(|v| ensure_string(Some(v), "dialog button label", false))
            .transpose()?;
        sanitized.name_field_label = options
            .get("nameFieldLabel")
            .map(|v| ensure_string(Some(v), "dialog name field label", false))
            .transpose()?;
    }
    Ok(sanitized)
}

fn filters(value: Option<&IpcValue>) -> Result<Vec<FileFilter>, ValidationError> {
    let Some(IpcValue::Array(items)) = value else {
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(items.len());
    for filter in items.iter().filter(|f| f.is_object()) {
        let name = match filter.get_non_null("name") {
            Some(name) => ensure_string(Some(name), "filter name", true)?,
            None => "untitled".to_owned(),
        };
        let Some(IpcValue::Array(raw)) = filter.get("extensions") else {
            continue;
        };
        let extensions: Vec<String> = raw
            .iter()
            .filter_map(IpcValue::as_str)
            .map(str::trim)
            .filter(|ext| !ext.is_empty() && !ext.contains('\0'))
            .map(|ext| ext.strip_prefix('.').unwrap_or(ext))
            .filter(|ext| !ext.is_empty())
            .map(|ext| truncate_chars(ext, MAX_FILTER_EXTENSION_LENGTH))
            .collect();
        if !extensions.is_empty() {
            out.push(FileFilter { name, extensions });
        }
    }
    Ok(out)
}

fn properties(value: Option<&IpcValue>, mode: DialogMode) -> Vec<DialogProperty> {
    let Some(IpcValue::Array(items)) = value else {
        return Vec::new();
    };
    let mut out: Vec<DialogProperty> = Vec::new();
    for property in items
        .iter()
        .filter_map(IpcValue::as_str)
        .filter_map(|p| DialogProperty::from_str(p.trim()).ok())
        .filter(|p| p.allowed_in(mode))
    {
        if !out.contains(&property) {
            out.push(property);
        }
    }
    out
}

// --- Desktop actions ---

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
    IntoStaticStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Urgent,
    Reminder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragFile {
    pub name: String,
    /// MIME type as reported by the renderer, possibly empty.
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragIntent {
    pub intent: String,
    pub files: Vec<DragFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
    IntoStaticStr, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    Xlsx,
    Pdf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// The `desktop-secure-action` request, one variant per action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "kebab-case")]
pub enum DesktopAction {
    Notify(Notification),
    DragIntent(DragIntent),
    Export(ExportRequest),
}

impl DesktopAction {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Notify(_) => "notify",
            Self::DragIntent(_) => "drag-intent",
            Self::Export(_) => "export",
        }
    }
}

pub(crate) fn desktop_action(value: Option<&IpcValue>) -> Result<DesktopAction, ValidationError> {
    let Some(request) = value.filter(|v| v.is_object()) else {
        return Err(ValidationError::invalid("desktop secure action must be an object"));
    };
    let action = ensure_string(request.get("action"), "desktop secure action", false)?;
    let payload = request.get("payload");
    match action.as_str() {
        "notify" => notification(payload).map(DesktopAction::Notify),
        "drag-intent" => drag_intent(payload).map(DesktopAction::DragIntent),
        "export" => export(payload).map(DesktopAction::Export),
        _ => Err(ValidationError::invalid("unsupported desktop action")),
    }
}

/// Missing payloads validate as `{}`.
fn object_or_empty<'a>(
    value: Option<&'a IpcValue>,
    message: &'static str,
) -> Result<&'a IpcValue, ValidationError> {
    static EMPTY: IpcValue = IpcValue::Object(Vec::new());
    match value {
        None => Ok(&EMPTY),
        Some(v) if v.is_object() => Ok(v),
        Some(_) => Err(ValidationError::invalid(message)),
    }
}

fn text_or(value: &IpcValue, key: &str, default: &str, field: &str) -> Result<String, ValidationError> {
    match value.get_non_null(key) {
        Some(v) => ensure_string(Some(v), field, false),
        None => ensure_string(Some(&IpcValue::from(default)), field, false),
    }
}

fn notification(value: Option<&IpcValue>) -> Result<Notification, ValidationError> {
    let value = object_or_empty(value, "notification payload must be an object")?;

    let severity = text_or(value, "severity", "info", "notification severity")?;
    let title = text_or(value, "title", "", "notification title")?;
    let message = text_or(value, "message", "", "notification message")?;

    let duration_ms = value
        .get("durationMs")
        .map(|d| non_negative_whole(d, "notification durationMs must be a non-negative number"))
        .transpose()?
        .map(|d| d.min(MAX_NOTIFICATION_DURATION_MS));

    Ok(Notification {
        severity: Severity::from_str(&severity).unwrap_or_default(),
        title: truncate_chars(&title, MAX_NOTIFICATION_TITLE_LENGTH),
        message: truncate_chars(&message, MAX_NOTIFICATION_MESSAGE_LENGTH),
        description: optional_text(
            value.get("description"),
            "notification description",
            true,
            MAX_NOTIFICATION_DESCRIPTION_LENGTH,
        )?,
        action_label: optional_text(
            value.get("actionLabel"),
            "notification action label",
            false,
            MAX_NOTIFICATION_ACTION_LENGTH,
        )?,
        scope: optional_text(
            value.get("scope"),
            "notification scope",
            true,
            MAX_NOTIFICATION_TAG_LENGTH,
        )?,
        correlation_id: optional_text(
            value.get("correlationId"),
            "notification correlationId",
            true,
            MAX_NOTIFICATION_TAG_LENGTH,
        )?,
        duration_ms,
        metadata: optional_serializable(value.get("metadata"), "notification metadata")?,
    })
}

fn drag_intent(value: Option<&IpcValue>) -> Result<DragIntent, ValidationError> {
    let value = object_or_empty(value, "drag payload must be an object")?;
    let intent = text_or(value, "intent", "unspecified", "drag intent")?;

    let raw_files = match value.get("files") {
        Some(IpcValue::Array(files)) if !files.is_empty() => files,
        _ => return Err(ValidationError::invalid("drag payload requires at least one file")),
    };
    if raw_files.len() > MAX_DRAG_FILES {
        return Err(ValidationError::oversized("drag payload exceeds maximum file count"));
    }

    let mut total: u64 = 0;
    let mut files = Vec::with_capacity(raw_files.len());
    for (index, file) in raw_files.iter().enumerate() {
        let n = index + 1;
        if !file.is_object() {
            return Err(ValidationError::invalid(format!("drag file #{n} must be an object")));
        }
        let name = file_name(file.get("name"), &format!("drag file #{n} name"), &format!("file-{n}"))?;
        let mime_type = optional_text(
            file.get("type"),
            &format!("drag file #{n} type"),
            true,
            MAX_DRAG_TYPE_LENGTH,
        )?
        .unwrap_or_default();
        let size_error = format!("drag file #{n} size must be a non-negative number");
        let size = match file.get("size") {
            Some(raw) => non_negative_whole(raw, &size_error)?,
            None => return Err(ValidationError::invalid(size_error)),
        }
        .min(MAX_DRAG_FILE_BYTES);
        total = total.saturating_add(size);

        files.push(DragFile {
            name,
            mime_type,
            size,
            metadata: optional_serializable(file.get("metadata"), &format!("drag file #{n} metadata"))?,
        });
    }

    if total > MAX_DRAG_TOTAL_BYTES {
        return Err(ValidationError::oversized("drag payload exceeds maximum aggregate size"));
    }

    Ok(DragIntent {
        intent,
        files,
        source: optional_text(value.get("source"), "drag source", true, MAX_DRAG_SOURCE_LENGTH)?,
        tender_id: optional_text(
            value.get("tenderId"),
            "drag tenderId",
            true,
            MAX_DRAG_TENDER_ID_LENGTH,
        )?,
        metadata: optional_serializable(value.get("metadata"), "drag metadata")?,
    })
}

#[allow(clippy::cast_precision_loss)]
fn export(value: Option<&IpcValue>) -> Result<ExportRequest, ValidationError> {
    let value = object_or_empty(value, "export payload must be an object")?;

    let format = text_or(value, "format", "csv", "export format")?;
    let format = ExportFormat::from_str(&format)
        .map_err(|_| ValidationError::invalid("unsupported export format"))?;
    let filename = file_name(value.get("filename"), "export filename", "export")?;

    let bytes = match value.get("bytes") {
        None => None,
        Some(IpcValue::Number(n)) if n.is_finite() && *n > MAX_EXPORT_BYTES as f64 => {
            return Err(ValidationError::oversized("export payload exceeds maximum size"));
        }
        Some(raw) => Some(non_negative_whole(raw, "export bytes must be a non-negative number")?),
    };
    let rows = value
        .get("rows")
        .map(|r| non_negative_whole(r, "export rows must be a non-negative number"))
        .transpose()?;

    Ok(ExportRequest {
        format,
        filename,
        bytes,
        rows,
        origin: optional_text(value.get("origin"), "export origin", true, MAX_EXPORT_ORIGIN_LENGTH)?,
        metadata: optional_serializable(value.get("metadata"), "export metadata")?,
    })
}

// --- Lifecycle ---

/// The renderer's answer to a lifecycle request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleAck {
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<f64>,
}

pub(crate) fn lifecycle_ack(value: Option<&IpcValue>) -> Result<LifecycleAck, ValidationError> {
    let Some(value) = value.filter(|v| v.is_object()) else {
        return Err(ValidationError::invalid("lifecycle ack payload must be an object"));
    };

    let id = ensure_string(value.get("id"), "lifecycle ack id", false)?;
    let status = text_or(value, "status", "ok", "lifecycle ack status")?;
    let details = optional_serializable(value.get("details"), "lifecycle ack details")?;
    let elapsed_ms = match value.get("elapsedMs") {
        None => None,
        Some(IpcValue::Number(n)) if n.is_finite() && *n >= 0.0 => Some(*n),
        Some(_) => {
            return Err(ValidationError::invalid(
                "lifecycle ack elapsedMs must be a non-negative number",
            ));
        }
    };

    Ok(LifecycleAck { id, status, details, elapsed_ms })
}

// --- File data ---

/// Normalizes `fs-write-file` data to text.
///
/// `null` and `undefined` become an empty string, strings pass through and other JSON
/// values are written pretty-printed with two-space indentation.
pub(crate) fn writable_data(value: Option<&IpcValue>) -> Result<String, ValidationError> {
    let too_large = || ValidationError::oversized("file data exceeds maximum allowed size");

    let text = match value {
        None | Some(IpcValue::Undefined | IpcValue::Null) => return Ok(String::new()),
        Some(IpcValue::String(s)) => s.clone(),
        Some(other) => {
            check_serializable(other)?;
            serde_json::to_string_pretty(&other.to_json()).map_err(|_| {
                ValidationError::invalid("file data must be a string or JSON-serializable value")
            })?
        }
    };
    if text.len() > MAX_SERIALIZED_PAYLOAD_SIZE {
        return Err(too_large());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(v: Value) -> IpcValue {
        IpcValue::from_wire(v)
    }

    #[test]
    fn test_dialog_filters_and_properties() {
        let options = dialog_options(
            Some(&wire(json!({
                "title": "  Import  ",
                "filters": [
                    {"name": "Sheets", "extensions": [".xlsx", " csv ", 3, ""]},
                    {"extensions": ["pdf"]},
                    {"name": "Empty", "extensions": [".", "  "]},
                    "not-a-filter"
                ],
                "properties": ["openFile", "openFile", "bogus", " multiSelections "],
                "buttonLabel": "ignored for open"
            }))),
            DialogMode::Open,
        )
        .unwrap();

        assert_eq!(options.title.as_deref(), Some("Import"));
        assert_eq!(
            options.filters,
            vec![
                FileFilter { name: "Sheets".into(), extensions: vec!["xlsx".into(), "csv".into()] },
                FileFilter { name: "untitled".into(), extensions: vec!["pdf".into()] },
            ]
        );
        assert_eq!(options.properties, vec![DialogProperty::OpenFile, DialogProperty::MultiSelections]);
        assert!(options.button_label.is_none());
    }

    #[test]
    fn test_save_dialog_limits_properties() {
        let options = dialog_options(
            Some(&wire(json!({"properties": ["openDirectory", "createDirectory"], "buttonLabel": "Save"}))),
            DialogMode::Save,
        )
        .unwrap();
        assert_eq!(options.properties, vec![DialogProperty::CreateDirectory]);
        assert_eq!(options.button_label.as_deref(), Some("Save"));

        let err = dialog_options(Some(&wire(json!({"nameFieldLabel": " "}))), DialogMode::Save)
            .unwrap_err();
        assert_eq!(err.to_string(), "dialog name field label cannot be empty");
    }

    #[test]
    fn test_non_object_dialog_options_are_empty() {
        assert_eq!(dialog_options(Some(&wire(json!(42))), DialogMode::Open).unwrap(), DialogOptions::default());
        assert_eq!(dialog_options(None, DialogMode::Save).unwrap(), DialogOptions::default());
    }

    #[test]
    fn test_notification_coercion() {
        let action = desktop_action(Some(&wire(json!({
            "action": "notify",
            "payload": {
                "severity": "catastrophic",
                "title": "t".repeat(200),
                "message": "Tender closed",
                "durationMs": 99_999.7,
                "scope": "tenders"
            }
        }))))
        .unwrap();

        let DesktopAction::Notify(n) = action else { panic!("expected notify") };
        assert_eq!(n.severity, Severity::Info);
        assert_eq!(n.title.chars().count(), MAX_NOTIFICATION_TITLE_LENGTH);
        assert_eq!(n.duration_ms, Some(MAX_NOTIFICATION_DURATION_MS));
        assert_eq!(n.scope.as_deref(), Some("tenders"));
    }

    #[test]
    fn test_notification_requires_title() {
        let err = desktop_action(Some(&wire(json!({"action": "notify", "payload": {"message": "m"}}))))
            .unwrap_err();
        assert_eq!(err.to_string(), "notification title cannot be empty");
    }

    #[test]
    fn test_drag_files_are_sanitized() {
        let DesktopAction::DragIntent(drag) = desktop_action(Some(&wire(json!({
            "action": "drag-intent",
            "payload": {
                "files": [
                    {"name": "spec<1>.pdf", "type": "application/pdf", "size": 1024.9},
                    {"size": 20 * 1024 * 1024}
                ]
            }
        }))))
        .unwrap() else {
            panic!("expected drag intent")
        };

        assert_eq!(drag.intent, "unspecified");
        assert_eq!(drag.files[0].name, "spec_1_.pdf");
        assert_eq!(drag.files[0].size, 1024);
        assert_eq!(drag.files[1].name, "file-2");
        assert_eq!(drag.files[1].size, MAX_DRAG_FILE_BYTES);
        assert_eq!(drag.files[1].mime_type, "");
    }

    #[test]
    fn test_drag_rejections() {
        let no_files = desktop_action(Some(&wire(json!({"action": "drag-intent", "payload": {"files": []}}))));
        assert_eq!(no_files.unwrap_err().to_string(), "drag payload requires at least one file");

        let bad_size = desktop_action(Some(&wire(
            json!({"action": "drag-intent", "payload": {"files": [{"name": "a", "size": -1}]}}),
        )));
        assert_eq!(bad_size.unwrap_err().to_string(), "drag file #1 size must be a non-negative number");

        let five = json!({"size": 11 * 1024 * 1024});
        let heavy = desktop_action(Some(&wire(json!({
            "action": "drag-intent",
            "payload": {"files": vec![five; 5]}
        }))));
        assert_eq!(heavy.unwrap_err().to_string(), "drag payload exceeds maximum aggregate size");
    }

    #[test]
    fn test_export_rules() {
        let DesktopAction::Export(export) = desktop_action(Some(&wire(json!({
            "action": "export",
            "payload": {"filename": "Q1 costs.", "rows": 10.8, "bytes": 2048}
        }))))
        .unwrap() else {
            panic!("expected export")
        };
        assert_eq!(export.format, ExportFormat::Csv);
        assert_eq!(export.filename, "Q1 costs");
        assert_eq!(export.rows, Some(10));

        let docx = desktop_action(Some(&wire(json!({"action": "export", "payload": {"format": "docx"}}))));
        assert_eq!(docx.unwrap_err().to_string(), "unsupported export format");

        let big = desktop_action(Some(&wire(
            json!({"action": "export", "payload": {"bytes": MAX_EXPORT_BYTES + 1}}),
        )));
        assert_eq!(big.unwrap_err().to_string(), "export payload exceeds maximum size");
    }

    #[test]
    fn test_unknown_desktop_action() {
        let err = desktop_action(Some(&wire(json!({"action": "shell-exec"})))).unwrap_err();
        assert_eq!(err.to_string(), "unsupported desktop action");
    }

    #[test]
    fn test_lifecycle_ack_defaults() {
        let ack = lifecycle_ack(Some(&wire(json!({"id": "abc", "elapsedMs": 12.5})))).unwrap();
        assert_eq!(ack.status, "ok");
        assert_eq!(ack.elapsed_ms, Some(12.5));

        let err = lifecycle_ack(Some(&wire(json!({"status": "ok"})))).unwrap_err();
        assert_eq!(err.to_string(), "lifecycle ack id must be a string");
    }

    #[test]
    fn test_writable_data_forms() {
        assert_eq!(writable_data(Some(&IpcValue::Null)).unwrap(), "");
        assert_eq!(writable_data(Some(&wire(json!("plain")))).unwrap(), "plain");
        assert_eq!(writable_data(Some(&wire(json!({"a": 1})))).unwrap(), "{\n  \"a\": 1\n}");

        let huge = IpcValue::String("x".repeat(MAX_SERIALIZED_PAYLOAD_SIZE + 1));
        assert_eq!(writable_data(Some(&huge)).unwrap_err().to_string(), "file data exceeds maximum allowed size");
    }
}

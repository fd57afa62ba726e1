//! # Payload Validator
//!
//! Closed allowlist of renderer channels. Every call is matched against its channel's
//! rule, which checks arity and argument shapes and produces a typed [`Request`].
//! Anything not explicitly declared safe is rejected. Validation is pure.

mod error;
pub mod limits;
mod payloads;
mod primitives;
mod value;

pub use error::{ValidationError, ValidationErrorExt};
pub use payloads::{
    DesktopAction, DialogMode, DialogOptions, DialogProperty, DragFile, DragIntent, ExportFormat,
    ExportRequest, FileFilter, LifecycleAck, Notification, Severity,
};
pub use primitives::{StorageKey, check_serializable, normalize_lexically, sanitize_file_name};
pub use value::{IpcValue, WIRE_TAG};

use crate::secure_store::SECURE_PREFIX;
use serde_json::Value;
use std::path::PathBuf;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Every operation the renderer may request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, IntoStaticStr, Display, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Channel {
    StoreGet,
    StoreSet,
    StoreDelete,
    StoreClear,
    SecureStoreGet,
    SecureStoreSet,
    SecureStoreDelete,
    SecureStoreClear,
    AppQuit,
    AppMinimize,
    AppMaximize,
    AppClose,
    AppGetVersion,
    FsReadFile,
    FsWriteFile,
    FsFileExists,
    DialogOpenFile,
    DialogSaveFile,
    SecurityGetCspNonce,
    SecurityGetCspNonceSync,
    DesktopSecureAction,
    LifecycleAck,
    CheckForUpdates,
}

impl Channel {
    /// Channels answered synchronously; every other channel is asynchronous.
    #[must_use]
    pub const fn is_sync(self) -> bool {
        matches!(self, Self::SecurityGetCspNonceSync)
    }
}

/// A sanitized renderer call. Handlers only ever see this, never the raw arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    StoreGet { key: StorageKey },
    StoreSet { key: StorageKey, value: Value },
    StoreDelete { key: StorageKey },
    StoreClear,
    SecureStoreGet { key: StorageKey },
    SecureStoreSet { key: StorageKey, value: Value },
    SecureStoreDelete { key: StorageKey },
    SecureStoreClear,
    AppQuit,
    AppMinimize,
    AppMaximize,
    AppClose,
    AppGetVersion,
    FsReadFile { path: PathBuf },
    FsWriteFile { path: PathBuf, data: String },
    FsFileExists { path: PathBuf },
    DialogOpenFile(DialogOptions),
    DialogSaveFile(DialogOptions),
    CspNonce,
    CspNonceSync,
    DesktopAction(DesktopAction),
    LifecycleAck(LifecycleAck),
    CheckForUpdates,
}

impl Request {
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::StoreGet { .. } => Channel::StoreGet,
            Self::StoreSet { .. } => Channel::StoreSet,
            Self::StoreDelete { .. } => Channel::StoreDelete,
            Self::StoreClear => Channel::StoreClear,
            Self::SecureStoreGet { .. } => Channel::SecureStoreGet,
            Self::SecureStoreSet { .. } => Channel::SecureStoreSet,
            Self::SecureStoreDelete { .. } => Channel::SecureStoreDelete,
            Self::SecureStoreClear => Channel::SecureStoreClear,
            Self::AppQuit => Channel::AppQuit,
            Self::AppMinimize => Channel::AppMinimize,
            Self::AppMaximize => Channel::AppMaximize,
            Self::AppClose => Channel::AppClose,
            Self::AppGetVersion => Channel::AppGetVersion,
            Self::FsReadFile { .. } => Channel::FsReadFile,
            Self::FsWriteFile { .. } => Channel::FsWriteFile,
            Self::FsFileExists { .. } => Channel::FsFileExists,
            Self::DialogOpenFile(_) => Channel::DialogOpenFile,
            Self::DialogSaveFile(_) => Channel::DialogSaveFile,
            Self::CspNonce => Channel::SecurityGetCspNonce,
            Self::CspNonceSync => Channel::SecurityGetCspNonceSync,
            Self::DesktopAction(_) => Channel::DesktopSecureAction,
            Self::LifecycleAck(_) => Channel::LifecycleAck,
            Self::CheckForUpdates => Channel::CheckForUpdates,
        }
    }
}

/// Validates one renderer call.
///
/// # Errors
///
/// * [`ValidationError::UnsupportedChannel`] for a name outside the allowlist.
/// * [`ValidationError::Arity`] for the wrong number of arguments.
/// * [`ValidationError::Invalid`] or [`ValidationError::Oversized`] for a malformed or
///   oversized argument.
pub fn validate(channel: &str, args: &[IpcValue]) -> Result<Request, ValidationError> {
    let parsed = Channel::from_str(channel)
        .map_err(|_| ValidationError::UnsupportedChannel { channel: channel.to_owned() })?;
    validate_channel(parsed, args)
}

/// [`validate`] for an already resolved channel.
pub fn validate_channel(channel: Channel, args: &[IpcValue]) -> Result<Request, ValidationError> {
    use primitives::{ensure_serializable, sanitize_path, storage_key};

    let arg = |i: usize| args.get(i);
    let name = channel.as_ref();

    let request = match channel {
        Channel::StoreGet | Channel::StoreDelete | Channel::SecureStoreGet | Channel::SecureStoreDelete => {
            expect_exactly(args, 1, || format!("{name} expects a single key argument"))?;
            let key = storage_key(arg(0))?;
            if matches!(channel, Channel::StoreGet | Channel::StoreDelete) {
                ensure_plain(&key)?;
            }
            match channel {
                Channel::StoreGet => Request::StoreGet { key },
                Channel::StoreDelete => Request::StoreDelete { key },
                Channel::SecureStoreGet => Request::SecureStoreGet { key },
                _ => Request::SecureStoreDelete { key },
            }
        }
        Channel::StoreSet | Channel::SecureStoreSet => {
            expect_exactly(args, 2, || format!("{name} expects key and value arguments"))?;
            let key = storage_key(arg(0))?;
            if channel == Channel::StoreSet {
                ensure_plain(&key)?;
                Request::StoreSet { key, value: ensure_serializable(&args[1], "store value")? }
            } else {
                Request::SecureStoreSet { key, value: ensure_serializable(&args[1], "secure store value")? }
            }
        }
        Channel::FsReadFile | Channel::FsFileExists => {
            expect_exactly(args, 1, || format!("{name} expects a single path argument"))?;
            let path = sanitize_path(arg(0), "filePath")?;
            if channel == Channel::FsReadFile {
                Request::FsReadFile { path }
            } else {
                Request::FsFileExists { path }
            }
        }
        Channel::FsWriteFile => {
            expect_exactly(args, 2, || format!("{name} expects path and data arguments"))?;
            Request::FsWriteFile {
                path: sanitize_path(arg(0), "filePath")?,
                data: payloads::writable_data(arg(1))?,
            }
        }
        Channel::DialogOpenFile | Channel::DialogSaveFile => {
            if args.len() > 1 {
                return Err(ValidationError::arity(format!("{name} accepts at most one argument")));
            }
            if channel == Channel::DialogOpenFile {
                Request::DialogOpenFile(payloads::dialog_options(arg(0), DialogMode::Open)?)
            } else {
                Request::DialogSaveFile(payloads::dialog_options(arg(0), DialogMode::Save)?)
            }
        }
        Channel::DesktopSecureAction => {
            expect_exactly(args, 1, || format!("{name} expects a single payload argument"))?;
            Request::DesktopAction(payloads::desktop_action(arg(0))?)
        }
        Channel::LifecycleAck => {
            expect_exactly(args, 1, || format!("{name} expects a single payload argument"))?;
            Request::LifecycleAck(payloads::lifecycle_ack(arg(0))?)
        }
        Channel::StoreClear
        | Channel::SecureStoreClear
        | Channel::AppQuit
        | Channel::AppMinimize
        | Channel::AppMaximize
        | Channel::AppClose
        | Channel::AppGetVersion
        | Channel::SecurityGetCspNonce
        | Channel::SecurityGetCspNonceSync
        | Channel::CheckForUpdates => {
            expect_exactly(args, 0, || format!("{name} does not accept arguments"))?;
            no_argument_request(channel)
        }
    };
    Ok(request)
}

const fn no_argument_request(channel: Channel) -> Request {
    match channel {
        Channel::StoreClear => Request::StoreClear,
        Channel::SecureStoreClear => Request::SecureStoreClear,
        Channel::AppQuit => Request::AppQuit,
        Channel::AppMinimize => Request::AppMinimize,
        Channel::AppMaximize => Request::AppMaximize,
        Channel::AppClose => Request::AppClose,
        Channel::AppGetVersion => Request::AppGetVersion,
        Channel::SecurityGetCspNonce => Request::CspNonce,
        Channel::SecurityGetCspNonceSync => Request::CspNonceSync,
        _ => Request::CheckForUpdates,
    }
}

/// Plain store channels may not address the secure namespace.
fn ensure_plain(key: &StorageKey) -> Result<(), ValidationError> {
    if key.as_str().starts_with(SECURE_PREFIX) {
        return Err(ValidationError::invalid("storage key uses a reserved prefix"));
    }
    Ok(())
}

fn expect_exactly(
    args: &[IpcValue],
    count: usize,
    message: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    if args.len() == count { Ok(()) } else { Err(ValidationError::arity(message())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn args(values: Value) -> Vec<IpcValue> {
        match IpcValue::from_wire(values) {
            IpcValue::Array(items) => items,
            other => vec![other],
        }
    }

    #[test]
    fn test_channel_names_round_trip() {
        assert_eq!(Channel::SecurityGetCspNonceSync.as_ref(), "security-get-csp-nonce-sync");
        assert_eq!(Channel::FsFileExists.as_ref(), "fs-file-exists");
        assert_eq!(Channel::iter().count(), 23);
        for channel in Channel::iter() {
            assert_eq!(Channel::from_str(channel.as_ref()), Ok(channel));
        }
    }

    #[test]
    fn test_unknown_channel() {
        let err = validate("shell-exec", &[]).unwrap_err();
        assert_eq!(err.to_string(), "unsupported channel: shell-exec");
        assert_eq!(err.kind(), "UnsupportedChannel");
    }

    #[test]
    fn test_arity_messages() {
        let cases = [
            ("store-get", json!([]), "store-get expects a single key argument"),
            ("store-set", json!(["k"]), "store-set expects key and value arguments"),
            ("store-clear", json!(["x"]), "store-clear does not accept arguments"),
            ("fs-write-file", json!(["/tmp/a"]), "fs-write-file expects path and data arguments"),
            ("dialog-open-file", json!([{}, {}]), "dialog-open-file accepts at most one argument"),
            ("lifecycle-ack", json!([]), "lifecycle-ack expects a single payload argument"),
        ];
        for (channel, raw, message) in cases {
            let err = validate(channel, &args(raw)).unwrap_err();
            assert_eq!(err.kind(), "Arity", "{channel}");
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn test_store_set_request() {
        let request = validate("store-set", &args(json!(["app.theme", {"mode": "dark"}]))).unwrap();
        assert_eq!(
            request,
            Request::StoreSet {
                key: StorageKey::parse("app.theme").unwrap(),
                value: json!({"mode": "dark"})
            }
        );
        assert_eq!(request.channel(), Channel::StoreSet);
    }

    #[test]
    fn test_secure_store_set_rejects_functions() {
        let err = validate(
            "secure-store-set",
            &args(json!(["auth.token", {"cb": {"$ipc": "function", "name": "f"}}])),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "payload contains unsupported type");
    }

    #[test]
    fn test_plain_store_cannot_address_secure_keys() {
        for raw in [json!(["__secure__:auth.token"]), json!(["__secure__:auth.token", "forged"])] {
            let channel = if raw.as_array().map_or(0, Vec::len) == 1 { "store-get" } else { "store-set" };
            let err = validate(channel, &args(raw)).unwrap_err();
            assert_eq!(err.to_string(), "storage key uses a reserved prefix");
        }
        assert!(validate("store-delete", &args(json!(["__secure__:x"]))).is_err());
        assert!(validate("secure-store-get", &args(json!(["__secure__:x"]))).is_ok());
    }

    #[test]
    fn test_dialog_without_argument() {
        assert_eq!(
            validate("dialog-save-file", &[]).unwrap(),
            Request::DialogSaveFile(DialogOptions::default())
        );
    }
}

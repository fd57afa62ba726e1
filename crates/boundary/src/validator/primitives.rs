//! Field-level rules shared by every channel.

use super::error::ValidationError;
use super::limits::{
    MAX_CONTAINER_DEPTH, MAX_FILE_NAME_LENGTH, MAX_PATH_LENGTH, MAX_SERIALIZED_PAYLOAD_SIZE,
    MAX_STRING_LENGTH,
};
use super::value::IpcValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A key the renderer may address in the plain or secure store: `^[a-z0-9._:-]+$`,
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    /// # Errors
    /// [`ValidationError::Invalid`] when `raw` is empty or has characters outside the pattern.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::invalid("storage key cannot be empty"));
        }
        if !raw.bytes().all(is_key_byte) {
            return Err(ValidationError::invalid("storage key contains invalid characters"));
        }
        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

const fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b':' | b'-')
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims a string field and enforces the shared length ceiling.
pub(crate) fn ensure_string(
    value: Option<&IpcValue>,
    field: &str,
    allow_empty: bool,
) -> Result<String, ValidationError> {
    let Some(IpcValue::String(raw)) = value else {
        return Err(ValidationError::invalid(format!("{field} must be a string")));
    };
    if raw.contains('\0') {
        return Err(ValidationError::invalid(format!("{field} contains null bytes")));
    }
    let trimmed = raw.trim();
    if !allow_empty && trimmed.is_empty() {
        return Err(ValidationError::invalid(format!("{field} cannot be empty")));
    }
    if char_len_exceeds(trimmed, MAX_STRING_LENGTH) {
        return Err(ValidationError::oversized(format!("{field} is too long")));
    }
    Ok(trimmed.to_owned())
}

/// Like [`ensure_string`] for an optional field, with the value cut to `max` characters.
pub(crate) fn optional_text(
    value: Option<&IpcValue>,
    field: &str,
    allow_empty: bool,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    value.map(|v| ensure_string(Some(v), field, allow_empty).map(|s| truncate_chars(&s, max))).transpose()
}

pub(crate) fn storage_key(value: Option<&IpcValue>) -> Result<StorageKey, ValidationError> {
    StorageKey::parse(&ensure_string(value, "storage key", false)?)
}

/// Recursively rejects anything that is not plain JSON data.
///
/// # Errors
/// [`ValidationError::Oversized`] past [`MAX_CONTAINER_DEPTH`] or for an oversized
/// string, [`ValidationError::Invalid`] for functions, symbols, bigints, non-finite
/// numbers, foreign objects and back-references.
pub fn check_serializable(value: &IpcValue) -> Result<(), ValidationError> {
    check_at(value, 0)
}

fn check_at(value: &IpcValue, depth: usize) -> Result<(), ValidationError> {
    if depth > MAX_CONTAINER_DEPTH {
        return Err(ValidationError::oversized("payload nesting depth exceeded"));
    }
    match value {
        IpcValue::Undefined | IpcValue::Null | IpcValue::Bool(_) => Ok(()),
        IpcValue::Function(_) | IpcValue::Symbol => {
            Err(ValidationError::invalid("payload contains unsupported type"))
        }
        IpcValue::BigInt(_) => {
            Err(ValidationError::invalid("bigint values are not supported in IPC payloads"))
        }
        IpcValue::Number(n) if !n.is_finite() => {
            Err(ValidationError::invalid("number must be a finite number"))
        }
        IpcValue::Number(_) => Ok(()),
        IpcValue::String(s) if char_len_exceeds(s, MAX_STRING_LENGTH) => {
            Err(ValidationError::oversized("string payload segment is too large"))
        }
        IpcValue::String(_) => Ok(()),
        IpcValue::Array(items) => items.iter().try_for_each(|item| check_at(item, depth + 1)),
        IpcValue::Object(entries) => entries.iter().try_for_each(|(_, v)| check_at(v, depth + 1)),
        IpcValue::BackReference => {
            Err(ValidationError::invalid("payload contains circular reference"))
        }
        IpcValue::Foreign(_) => {
            Err(ValidationError::invalid("payload contains unsupported object type"))
        }
    }
}

/// Checks that `value` is plain JSON no larger than [`MAX_SERIALIZED_PAYLOAD_SIZE`] once
/// encoded, and returns it as JSON.
pub(crate) fn ensure_serializable(value: &IpcValue, field: &str) -> Result<Value, ValidationError> {
    check_serializable(value)?;
    let json = value.to_json();
    let size = serde_json::to_vec(&json)
        .map_err(|_| ValidationError::invalid(format!("{field} must be JSON-serializable")))?
        .len();
    if size > MAX_SERIALIZED_PAYLOAD_SIZE {
        return Err(ValidationError::oversized(format!("{field} exceeds maximum allowed size")));
    }
    Ok(json)
}

pub(crate) fn optional_serializable(
    value: Option<&IpcValue>,
    field: &str,
) -> Result<Option<Value>, ValidationError> {
    value.map(|v| ensure_serializable(v, field)).transpose()
}

/// Resolves a renderer-supplied path against the working directory and normalizes it
/// lexically. Symlinks are not followed.
pub(crate) fn sanitize_path(value: Option<&IpcValue>, field: &str) -> Result<PathBuf, ValidationError> {
    let candidate = ensure_string(value, field, false)?;
    if char_len_exceeds(&candidate, MAX_PATH_LENGTH) {
        return Err(ValidationError::oversized(format!("{field} is too long")));
    }
    let absolute = std::path::absolute(&candidate)
        .map_err(|e| ValidationError::invalid(format!("{field} cannot be resolved: {e}")))?;
    Ok(normalize_lexically(&absolute))
}

/// Folds `.` and `..` components; `..` never climbs above the root.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
        }
    }
    out
}

/// Turns arbitrary text into a file name safe on every desktop platform.
///
/// Reserved characters and control characters become `_`; the result is trimmed, cut
/// to 120 characters and stripped of trailing dots, falling back to `fallback` when
/// nothing is left.
#[must_use]
pub fn sanitize_file_name(raw: &str, fallback: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| if is_reserved_file_char(c) { '_' } else { c })
        .collect();
    let mut name = replaced.trim().to_owned();
    if name.is_empty() {
        fallback.clone_into(&mut name);
    }
    name = truncate_chars(&name, MAX_FILE_NAME_LENGTH);
    let kept = name.trim_end_matches('.').len();
    name.truncate(kept);
    if name.is_empty() { fallback.to_owned() } else { name }
}

const fn is_reserved_file_char(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '\u{0}'..='\u{1f}')
}

/// A validated file-name field; `null` and absent take the fallback.
pub(crate) fn file_name(
    value: Option<&IpcValue>,
    field: &str,
    fallback: &str,
) -> Result<String, ValidationError> {
    let raw = match value {
        None | Some(IpcValue::Null) => fallback.to_owned(),
        Some(v) => ensure_string(Some(v), field, true)?,
    };
    Ok(sanitize_file_name(&raw, fallback))
}

/// A non-negative finite number, floored.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn non_negative_whole(value: &IpcValue, message: &str) -> Result<u64, ValidationError> {
    match value {
        IpcValue::Number(n) if n.is_finite() && *n >= 0.0 => Ok(n.floor() as u64),
        _ => Err(ValidationError::invalid(message.to_owned())),
    }
}

#[must_use]
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}

fn char_len_exceeds(s: &str, max: usize) -> bool {
    s.len() > max && s.chars().nth(max).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> IpcValue {
        IpcValue::String(v.to_owned())
    }

    #[test]
    fn test_storage_key_pattern() {
        assert!(StorageKey::parse("proj.cost:1").is_ok());
        assert!(StorageKey::parse("App_Theme-2").is_ok());
        assert_eq!(
            StorageKey::parse("bad key!").unwrap_err().to_string(),
            "storage key contains invalid characters"
        );
    }

    #[test]
    fn test_ensure_string_rules() {
        assert_eq!(ensure_string(Some(&s("  hi ")), "title", false).unwrap(), "hi");
        assert_eq!(
            ensure_string(Some(&IpcValue::Number(1.0)), "title", false).unwrap_err().to_string(),
            "title must be a string"
        );
        assert_eq!(
            ensure_string(Some(&s("a\0b")), "title", false).unwrap_err().to_string(),
            "title contains null bytes"
        );
        assert_eq!(
            ensure_string(Some(&s("   ")), "title", false).unwrap_err().to_string(),
            "title cannot be empty"
        );
        assert_eq!(ensure_string(Some(&s("   ")), "title", true).unwrap(), "");
    }

    #[test]
    fn test_depth_ceiling() {
        let mut value = IpcValue::Null;
        for _ in 0..=MAX_CONTAINER_DEPTH {
            value = IpcValue::Array(vec![value]);
        }
        assert!(check_serializable(&value).is_ok());

        let too_deep = IpcValue::Array(vec![value]);
        assert_eq!(
            check_serializable(&too_deep).unwrap_err().to_string(),
            "payload nesting depth exceeded"
        );
    }

    #[test]
    fn test_file_name_sanitizing() {
        assert_eq!(sanitize_file_name("re:port?.csv", "export"), "re_port_.csv");
        assert_eq!(sanitize_file_name("notes...", "export"), "notes");
        assert_eq!(sanitize_file_name("   ", "export"), "export");
        assert_eq!(sanitize_file_name("...", "file-1"), "file-1");
        assert_eq!(sanitize_file_name(&"x".repeat(300), "f").len(), MAX_FILE_NAME_LENGTH);
    }

    #[test]
    fn test_paths_are_absolute_and_normalized() {
        let path = sanitize_path(Some(&s("reports/../reports/./q1.csv")), "filePath").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("reports/q1.csv"));
        assert_eq!(normalize_lexically(Path::new("/a/b/../../..")), PathBuf::from("/"));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("مرحبا", 2), "مر");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }
}

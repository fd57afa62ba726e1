//! Bounded, secret-free previews of rejected arguments for the audit log.

use crate::validator::IpcValue;
use serde_json::{Map, Value};

const MAX_PREVIEW_CHARS: usize = 512;
const MAX_STRING_CHARS: usize = 120;
const STRING_KEEP_CHARS: usize = 117;

/// Renders `args` as compact JSON with non-data values replaced by markers:
/// `[Function]`, `[Symbol]`, `[BigInt:<v>]`, `[Circular]`, `[Object:<class>]`.
///
/// Strings over 120 characters are cut to 117 plus `...`, NUL bytes are removed and the
/// whole preview is capped at 512 characters plus `…`. Never fails.
#[must_use]
pub fn redact_args(args: &[IpcValue]) -> String {
    let preview = Value::Array(args.iter().map(redact).collect());
    let Ok(serialized) = serde_json::to_string(&preview) else {
        return "[unserializable]".to_owned();
    };
    match serialized.char_indices().nth(MAX_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &serialized[..idx]),
        None => serialized,
    }
}

fn redact(value: &IpcValue) -> Value {
    match value {
        IpcValue::Undefined | IpcValue::Null => Value::Null,
        IpcValue::Bool(b) => Value::Bool(*b),
        IpcValue::Number(_) => value.to_json(),
        IpcValue::BigInt(v) => Value::String(format!("[BigInt:{v}]")),
        IpcValue::String(s) => Value::String(redact_string(s)),
        IpcValue::Symbol => Value::String("[Symbol]".to_owned()),
        IpcValue::Function(_) => Value::String("[Function]".to_owned()),
        IpcValue::Array(items) => Value::Array(items.iter().map(redact).collect()),
        IpcValue::Object(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (k, v) in entries.iter().filter(|(_, v)| !v.is_undefined()) {
                map.insert(k.clone(), redact(v));
            }
            Value::Object(map)
        }
        IpcValue::Foreign(class) => Value::String(format!("[Object:{class}]")),
        IpcValue::BackReference => Value::String("[Circular]".to_owned()),
    }
}

fn redact_string(s: &str) -> String {
    let clean = s.replace('\0', "");
    if clean.chars().nth(MAX_STRING_CHARS).is_some() {
        let cut = clean.char_indices().nth(STRING_KEEP_CHARS).map_or(clean.len(), |(i, _)| i);
        return format!("{}...", &clean[..cut]);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_markers() {
        let preview = redact_args(&[
            IpcValue::Function(None),
            IpcValue::Symbol,
            IpcValue::BigInt("9007199254740993".into()),
            IpcValue::Object(vec![("self".into(), IpcValue::BackReference)]),
            IpcValue::Foreign("Date".into()),
        ]);
        assert_eq!(
            preview,
            r#"["[Function]","[Symbol]","[BigInt:9007199254740993]",{"self":"[Circular]"},"[Object:Date]"]"#
        );
    }

    #[test]
    fn test_long_strings_are_cut() {
        let preview = redact_args(&[IpcValue::String("a".repeat(500))]);
        assert_eq!(preview, format!("[\"{}...\"]", "a".repeat(117)));
    }

    #[test]
    fn test_nul_bytes_stripped() {
        assert_eq!(redact_args(&[IpcValue::from("a\0b")]), r#"["ab"]"#);
    }

    #[test]
    fn test_preview_is_capped() {
        let many: Vec<IpcValue> = (0..100).map(|i| IpcValue::from_wire(json!({"n": i, "v": "xxxxxxxx"}))).collect();
        let preview = redact_args(&many);
        assert_eq!(preview.chars().count(), MAX_PREVIEW_CHARS + 1);
        assert!(preview.ends_with('…'));
    }
}

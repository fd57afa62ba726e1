//! The renderer's value domain as it arrives at the boundary.

use serde::Deserialize;
use serde_json::{Map, Number, Value};

/// Reserved key marking a value JSON cannot carry natively.
pub const WIRE_TAG: &str = "$ipc";

/// One argument of a renderer call.
///
/// Structured-clone values are richer than JSON, so the bridge encodes the extra
/// variants as `{"$ipc": "<tag>", ...}` objects:
///
/// ```text
/// {"$ipc":"undefined"}                 {"$ipc":"symbol"}
/// {"$ipc":"function","name":"f"}       {"$ipc":"ref"}
/// {"$ipc":"bigint","value":"12"}       {"$ipc":"object","class":"Map"}
/// {"$ipc":"number","value":"NaN"}
/// ```
///
/// Validation rejects most of these; they exist so that rejections can be described
/// and redacted faithfully.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum IpcValue {
    Undefined,
    Null,
    Bool(bool),
    /// May be non-finite.
    Number(f64),
    BigInt(String),
    String(String),
    Symbol,
    Function(Option<String>),
    Array(Vec<Self>),
    /// Entries in insertion order.
    Object(Vec<(String, Self)>),
    /// Non-plain object (`Date`, `Map`, class instance), by class name.
    Foreign(String),
    /// A container already visited on the current path.
    BackReference,
}

impl IpcValue {
    /// Decodes the bridge's wire form.
    #[must_use]
    pub fn from_wire(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_wire).collect()),
            Value::Object(map) => match map.get(WIRE_TAG).and_then(Value::as_str) {
                Some(tag) => Self::from_tag(tag, &map),
                None => Self::Object(map.into_iter().map(|(k, v)| (k, Self::from_wire(v))).collect()),
            },
        }
    }

    fn from_tag(tag: &str, map: &Map<String, Value>) -> Self {
        let text = |field: &str| map.get(field).and_then(Value::as_str).map(str::to_owned);
        match tag {
            "undefined" => Self::Undefined,
            "symbol" => Self::Symbol,
            "ref" => Self::BackReference,
            "function" => Self::Function(text("name")),
            "bigint" => Self::BigInt(text("value").unwrap_or_default()),
            "number" => Self::Number(match text("value").as_deref() {
                Some("Infinity") => f64::INFINITY,
                Some("-Infinity") => f64::NEG_INFINITY,
                _ => f64::NAN,
            }),
            "object" => Self::Foreign(text("class").unwrap_or_else(|| "Object".to_owned())),
            other => Self::Foreign(other.to_owned()),
        }
    }

    /// Looks up an object entry; a missing key and an `undefined` value are the same.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(entries) => entries
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .filter(|v| !v.is_undefined()),
            _ => None,
        }
    }

    /// Like [`IpcValue::get`], also treating `null` as absent.
    #[must_use]
    pub fn get_non_null(&self, key: &str) -> Option<&Self> {
        self.get(key).filter(|v| !matches!(v, Self::Null))
    }

    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    #[must_use]
    pub const fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Name used in rejection messages and previews.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Symbol => "symbol",
            Self::Function(_) => "function",
            Self::Array(_) => "array",
            Self::Object(_) | Self::Foreign(_) | Self::BackReference => "object",
        }
    }

    /// Converts an already validated value to JSON.
    ///
    /// `undefined` entries are dropped from objects and become `null` inside arrays.
    /// Values JSON cannot represent become `null`; validation never lets them through.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null | Self::Undefined => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (k, v) in entries.iter().filter(|(_, v)| !v.is_undefined()) {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
            Self::BigInt(_)
            | Self::Symbol
            | Self::Function(_)
            | Self::Foreign(_)
            | Self::BackReference => Value::Null,
        }
    }
}

impl From<Value> for IpcValue {
    fn from(value: Value) -> Self {
        Self::from_wire(value)
    }
}

impl From<&str> for IpcValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

/// Whole numbers inside the exactly representable range are written without a fraction.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_json(n: f64) -> Value {
    const SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= SAFE_INTEGER {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_tags_decode() {
        let decoded = IpcValue::from_wire(json!([
            {"$ipc": "function", "name": "steal"},
            {"$ipc": "bigint", "value": "12"},
            {"$ipc": "number", "value": "-Infinity"},
            {"$ipc": "object", "class": "Map"},
            {"$ipc": "ref"},
            {"$ipc": "undefined"},
        ]));
        assert_eq!(
            decoded,
            IpcValue::Array(vec![
                IpcValue::Function(Some("steal".into())),
                IpcValue::BigInt("12".into()),
                IpcValue::Number(f64::NEG_INFINITY),
                IpcValue::Foreign("Map".into()),
                IpcValue::BackReference,
                IpcValue::Undefined,
            ])
        );
    }

    #[test]
    fn test_undefined_entries_are_absent() {
        let value = IpcValue::from_wire(json!({"title": {"$ipc": "undefined"}, "n": null}));
        assert!(value.get("title").is_none());
        assert!(value.get("n").is_some());
        assert!(value.get_non_null("n").is_none());
        assert_eq!(value.to_json(), json!({"n": null}));
    }

    #[test]
    fn test_whole_numbers_stay_integers() {
        assert_eq!(IpcValue::Number(16.0).to_json().to_string(), "16");
        assert_eq!(IpcValue::Number(1.5).to_json().to_string(), "1.5");
    }
}

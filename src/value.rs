// ABOUTME: Dynamic value tree and the ValueBuilder consumer that assembles it from events.
// ABOUTME: Value serializes through serde, so a decoded tree can be re-emitted in any serde format.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::consumer::{Consumer, ElementType};
use crate::error::{Error, Result};

/// A decoded value of either format.
#[derive(Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    /// A signed integer. Unsigned values that fit are stored here too.
    Int(i64),
    /// An unsigned integer above `i64::MAX`
    UInt(u64),
    Float(f64),
    String(String),
    /// A CBOR byte string
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// An object (using `BTreeMap` for deterministic ordering)
    Object(BTreeMap<String, Value>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Float(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If this is an integer that fits, returns it as i64.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// If this is a non-negative integer, returns it as u64.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// If this is a number, returns the value as f64.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Intentional: int-to-float conversion may lose precision
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            Value::UInt(n) => Some(*n as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Index into an array. Returns None if not an array or index out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_array().and_then(|a| a.get(index))
    }

    /// Index into an object by key. Returns None if not an object or key not found.
    #[must_use]
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(key))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::UInt(n) => write!(f, "UInt({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({b:02x?})"),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Object(o) => f.debug_tuple("Object").field(o).finish(),
        }
    }
}

// JSON-like, with byte strings in CBOR diagnostic notation
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{}\"", s.escape_default()),
            Value::Bytes(b) => {
                write!(f, "h'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                write!(f, "'")
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k.escape_default(), v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::UInt(n) => serializer.serialize_u64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for v in a {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(Value::UInt(n), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// Build a [`Value`] with JSON-like syntax.
///
/// ```rust
/// use feedparse::value;
///
/// let v = value!({ "name": "test", "values": [1, 2, 3], "active": true });
/// assert_eq!(v.get_key("active").and_then(|a| a.as_bool()), Some(true));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };
    (true) => {
        $crate::Value::Bool(true)
    };
    (false) => {
        $crate::Value::Bool(false)
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![ $( $crate::value!($elem) ),* ])
    };
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            let mut map = std::collections::BTreeMap::new();
            $(
                map.insert(String::from($key), $crate::value!($value));
            )*
            $crate::Value::Object(map)
        }
    };
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

/// Largest capacity reserved up front from a declared count.
const MAX_PREALLOCATE: usize = 1024;

enum Partial {
    Array(Vec<Value>),
    Bytes(Vec<u8>),
    Object {
        members: BTreeMap<String, Value>,
        key: Option<String>,
    },
}

/// A consumer that assembles events into [`Value`] trees.
///
/// Duplicate object keys keep the last value.
#[derive(Default)]
pub struct ValueBuilder {
    open: Vec<Partial>,
    complete: Vec<Value>,
}

impl ValueBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The single complete top-level value.
    ///
    /// Fails with `Incomplete` if no value (or only part of one) was built
    /// and with `TrailingBytes` if more than one was.
    pub fn finish(self) -> Result<Value> {
        let mut values = self.into_values()?;
        match values.len() {
            0 => Err(Error::Incomplete),
            1 => Ok(values.remove(0)),
            _ => Err(Error::TrailingBytes),
        }
    }

    /// Every complete top-level value, for CBOR sequences.
    pub fn into_values(self) -> Result<Vec<Value>> {
        if !self.open.is_empty() {
            return Err(Error::Incomplete);
        }
        Ok(self.complete)
    }

    fn insert(&mut self, value: Value) -> Result<()> {
        match self.open.last_mut() {
            None => self.complete.push(value),
            Some(Partial::Array(items)) => items.push(value),
            Some(Partial::Object { members, key }) => {
                let key = key
                    .take()
                    .ok_or_else(|| Error::Custom("object value without a key".into()))?;
                members.insert(key, value);
            }
            Some(Partial::Bytes(_)) => {
                return Err(Error::Custom("value inside a byte string".into()));
            }
        }
        Ok(())
    }
}

impl Consumer for ValueBuilder {
    fn on_object_start(&mut self, _len: Option<usize>) -> Result<()> {
        self.open.push(Partial::Object {
            members: BTreeMap::new(),
            key: None,
        });
        Ok(())
    }

    fn on_object_finished(&mut self) -> Result<()> {
        match self.open.pop() {
            Some(Partial::Object { members, .. }) => self.insert(Value::Object(members)),
            _ => Err(Error::Custom("unbalanced object finish".into())),
        }
    }

    fn on_array_start(&mut self, len: Option<usize>, elem: ElementType) -> Result<()> {
        let capacity = len.unwrap_or(0).min(MAX_PREALLOCATE);
        self.open.push(match elem {
            ElementType::Any => Partial::Array(Vec::with_capacity(capacity)),
            ElementType::Byte => Partial::Bytes(Vec::with_capacity(capacity)),
        });
        Ok(())
    }

    fn on_array_finished(&mut self) -> Result<()> {
        match self.open.pop() {
            Some(Partial::Array(items)) => self.insert(Value::Array(items)),
            Some(Partial::Bytes(bytes)) => self.insert(Value::Bytes(bytes)),
            _ => Err(Error::Custom("unbalanced array finish".into())),
        }
    }

    fn on_key(&mut self, name: &str) -> Result<()> {
        match self.open.last_mut() {
            Some(Partial::Object { key, .. }) => {
                *key = Some(name.to_owned());
                Ok(())
            }
            _ => Err(Error::Custom("key outside an object".into())),
        }
    }

    fn on_string(&mut self, value: &str) -> Result<()> {
        self.insert(Value::from(value))
    }

    fn on_bool(&mut self, value: bool) -> Result<()> {
        self.insert(Value::Bool(value))
    }

    fn on_nil(&mut self) -> Result<()> {
        self.insert(Value::Null)
    }

    fn on_i64(&mut self, value: i64) -> Result<()> {
        self.insert(Value::Int(value))
    }

    fn on_u64(&mut self, value: u64) -> Result<()> {
        self.insert(Value::from(value))
    }

    fn on_f64(&mut self, value: f64) -> Result<()> {
        self.insert(Value::Float(value))
    }

    fn on_byte(&mut self, value: u8) -> Result<()> {
        match self.open.last_mut() {
            Some(Partial::Bytes(bytes)) => {
                bytes.push(value);
                Ok(())
            }
            _ => Err(Error::Custom("byte outside a byte string".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(events: impl FnOnce(&mut ValueBuilder) -> Result<()>) -> Result<Value> {
        let mut builder = ValueBuilder::new();
        events(&mut builder)?;
        builder.finish()
    }

    #[test]
    fn test_builds_nested_object() {
        let v = build(|b| {
            b.on_object_start(None)?;
            b.on_key("a")?;
            b.on_array_start(None, ElementType::Any)?;
            b.on_u8(1)?;
            b.on_i16(-2)?;
            b.on_array_finished()?;
            b.on_key("b")?;
            b.on_f32(1.5)?;
            b.on_object_finished()
        })
        .unwrap();
        assert_eq!(v, value!({ "a": [1, (-2)], "b": 1.5 }));
    }

    #[test]
    fn test_builds_byte_string() {
        let v = build(|b| {
            b.on_array_start(Some(2), ElementType::Byte)?;
            b.on_byte(0xde)?;
            b.on_byte(0xad)?;
            b.on_array_finished()
        })
        .unwrap();
        assert_eq!(v, Value::Bytes(vec![0xde, 0xad]));
        assert_eq!(v.to_string(), "h'dead'");
    }

    #[test]
    fn test_finish_requires_exactly_one_value() {
        assert_eq!(build(|_| Ok(())), Err(Error::Incomplete));
        assert_eq!(
            build(|b| b.on_array_start(None, ElementType::Any)),
            Err(Error::Incomplete)
        );
        assert_eq!(
            build(|b| {
                b.on_nil()?;
                b.on_nil()
            }),
            Err(Error::TrailingBytes)
        );
    }

    #[test]
    fn test_rejects_unbalanced_events() {
        let mut b = ValueBuilder::new();
        assert!(b.on_array_finished().is_err());
        assert!(b.on_key("k").is_err());
        assert!(b.on_byte(1).is_err());
    }

    #[test]
    fn test_huge_declared_length_does_not_preallocate() {
        let mut b = ValueBuilder::new();
        b.on_array_start(Some(usize::MAX), ElementType::Any).unwrap();
        b.on_array_finished().unwrap();
        assert_eq!(b.finish().unwrap(), Value::Array(vec![]));
    }

    #[test]
    fn test_u64_normalisation() {
        assert_eq!(Value::from(5u64), Value::Int(5));
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Int(-1).as_u64(), None);
    }

    #[test]
    fn test_serializes_through_serde() {
        let v = value!({ "k": [null, true, "s", 2.5] });
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"k":[null,true,"s",2.5]}"#
        );
        assert_eq!(
            serde_json::to_string(&Value::Bytes(vec![1, 2])).unwrap(),
            "[1,2]"
        );
    }

    #[test]
    fn test_display() {
        let v = value!({ "a": [1, "x"], "b": null });
        assert_eq!(v.to_string(), r#"{"a": [1, "x"], "b": null}"#);
    }
}

//! Dynamic document values.

use crate::decimal::Decimal128;
use crate::document::Document;
use crate::oid::ObjectId;

/// A dynamically typed field value.
///
/// One variant per BSON element type, deprecated ones included, so any
/// document a server returns can be carried through a backup unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// IEEE 754 double.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Nested document.
    Document(Document),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Opaque unique identifier.
    ObjectId(ObjectId),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    /// Binary payload with its subtype tag.
    Binary {
        /// Binary subtype (0x00 generic, 0x04 UUID, ...).
        subtype: u8,
        /// Raw bytes.
        bytes: Vec<u8>,
    },
    /// 128-bit decimal.
    Decimal128(Decimal128),
    /// Internal replication timestamp.
    Timestamp {
        /// Seconds since the Unix epoch.
        time: u32,
        /// Ordinal within the second.
        increment: u32,
    },
    /// Regular expression with its option flags.
    Regex {
        /// Pattern text.
        pattern: String,
        /// Option letters, e.g. `"im"`.
        options: String,
    },
    /// JavaScript code.
    JavaScript(String),
    /// JavaScript code with a scope document.
    JavaScriptWithScope {
        /// Code text.
        code: String,
        /// Variables in scope.
        scope: Document,
    },
    /// Deprecated symbol.
    Symbol(String),
    /// Deprecated reference to a document in another namespace.
    DbPointer {
        /// `database.collection` of the referenced document.
        namespace: String,
        /// `_id` of the referenced document.
        id: ObjectId,
    },
    /// Deprecated undefined value.
    Undefined,
    /// Sorts before every other value.
    MinKey,
    /// Sorts after every other value.
    MaxKey,
}

impl Value {
    /// Short type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
            Value::ObjectId(_) => "objectId",
            Value::DateTime(_) => "date",
            Value::Binary { .. } => "binData",
            Value::Decimal128(_) => "decimal",
            Value::Timestamp { .. } => "timestamp",
            Value::Regex { .. } => "regex",
            Value::JavaScript(_) => "javascript",
            Value::JavaScriptWithScope { .. } => "javascriptWithScope",
            Value::Symbol(_) => "symbol",
            Value::DbPointer { .. } => "dbPointer",
            Value::Undefined => "undefined",
            Value::MinKey => "minKey",
            Value::MaxKey => "maxKey",
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, widening `Int32`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a nested document, if it is one.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as an object id, if it is one.
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Value::ObjectId(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

impl From<Decimal128> for Value {
    fn from(d: Decimal128) -> Self {
        Value::Decimal128(d)
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::ObjectId(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_bool(), None);

        assert_eq!(Value::Int32(42).as_i64(), Some(42));
        assert_eq!(Value::Int64(1 << 40).as_i64(), Some(1 << 40));
        assert_eq!(Value::String("42".to_string()).as_i64(), None);

        assert_eq!(Value::String("hello".to_string()).as_str(), Some("hello"));
        assert_eq!(Value::Array(vec![Value::Null]).as_array().map(<[_]>::len), Some(1));
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i32), Value::Int32(42));
        assert_eq!(Value::from(42i64), Value::Int64(42));
        assert_eq!(Value::from(1.5), Value::Double(1.5));
        assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
        assert_eq!(
            Value::from(vec![1i32, 2]),
            Value::Array(vec![Value::Int32(1), Value::Int32(2)])
        );
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Int64(0).type_name(), "int64");
        assert_eq!(Value::ObjectId(ObjectId::new()).type_name(), "objectId");
        assert_eq!(
            Value::Binary {
                subtype: 0,
                bytes: vec![]
            }
            .type_name(),
            "binData"
        );
        assert_eq!(Value::MinKey.type_name(), "minKey");
        assert_eq!(
            Value::Timestamp {
                time: 1,
                increment: 2
            }
            .type_name(),
            "timestamp"
        );
    }
}

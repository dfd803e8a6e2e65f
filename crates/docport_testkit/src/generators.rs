//! Property-based test generators using proptest.
//!
//! Generated documents stay inside what both artifact formats carry
//! losslessly: finite doubles, canonical decimals, and field names without
//! NUL or a leading `$`. A `$`-prefixed sub-document shaped like an
//! Extended JSON wrapper reads back from JSON as the wrapped value.

use docport_codec::{Decimal128, Document, ObjectId, Value};
use proptest::prelude::*;

/// Strategy for field names.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z_][a-zA-Z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for collection names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{0,15}").expect("Invalid regex")
}

/// Strategy for object ids.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform12(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for decimals in canonical form.
pub fn decimal_strategy() -> impl Strategy<Value = Decimal128> {
    (any::<i64>(), -40i32..40).prop_filter_map("representable", |(coefficient, exponent)| {
        format!("{coefficient}E{exponent}").parse().ok()
    })
}

/// Strategy for the server-side types: decimals, timestamps, regexes,
/// code, keys and the deprecated kinds.
pub fn server_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        decimal_strategy().prop_map(Value::Decimal128),
        (any::<u32>(), any::<u32>())
            .prop_map(|(time, increment)| Value::Timestamp { time, increment }),
        ("[a-z^$.*+?]{0,8}", "[imsx]{0,3}")
            .prop_map(|(pattern, options)| Value::Regex { pattern, options }),
        "\\PC{0,16}".prop_map(Value::JavaScript),
        ("\\PC{0,16}", any::<i32>()).prop_map(|(code, x)| Value::JavaScriptWithScope {
            code,
            scope: Document::new().with("x", x),
        }),
        "[a-z]{0,8}".prop_map(Value::Symbol),
        ("[a-z]{1,6}\\.[a-z]{1,6}", object_id_strategy())
            .prop_map(|(namespace, id)| Value::DbPointer { namespace, id }),
        Just(Value::Undefined),
        Just(Value::MinKey),
        Just(Value::MaxKey),
    ]
}

/// Strategy for scalar values.
pub fn leaf_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>()
            .prop_filter("wide ints only", |n| i32::try_from(*n).is_err())
            .prop_map(Value::Int64),
        (-1.0e15..1.0e15f64).prop_map(Value::Double),
        "\\PC{0,24}".prop_map(Value::String),
        object_id_strategy().prop_map(Value::ObjectId),
        any::<i64>().prop_map(Value::DateTime),
        (any::<u8>(), prop::collection::vec(any::<u8>(), 0..32))
            .prop_map(|(subtype, bytes)| Value::Binary { subtype, bytes }),
        server_value_strategy(),
    ]
}

/// Strategy for values, nesting documents and arrays up to depth 3.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    leaf_value_strategy().prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            fields(inner).prop_map(Value::Document),
        ]
    })
}

fn fields(values: impl Strategy<Value = Value>) -> impl Strategy<Value = Document> {
    prop::collection::vec((field_name_strategy(), values), 0..8)
        .prop_map(|pairs| pairs.into_iter().collect())
}

/// Strategy for top-level documents. Every document has an `_id`.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    (object_id_strategy(), fields(value_strategy())).prop_map(|(id, body)| {
        std::iter::once(("_id".to_string(), Value::ObjectId(id)))
            .chain(body.into_iter().filter(|(k, _)| k != "_id"))
            .collect()
    })
}

/// Strategy for a collection's worth of documents.
pub fn documents_strategy(max: usize) -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(document_strategy(), 0..=max)
}

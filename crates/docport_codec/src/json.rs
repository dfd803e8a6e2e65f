//! JSON-lines text form.
//!
//! One JSON object per line. Values plain JSON cannot carry without loss
//! use the MongoDB Extended JSON wrappers:
//!
//! | value            | text form                                        |
//! |------------------|--------------------------------------------------|
//! | `Int64`          | `{"$numberLong": "42"}`                          |
//! | non-finite float | `{"$numberDouble": "NaN"}`                       |
//! | `ObjectId`       | `{"$oid": "651f..."}`                            |
//! | `DateTime`       | `{"$date": {"$numberLong": "1700000000000"}}`    |
//! | `Binary`         | `{"$binary": {"base64": "...", "subType": "04"}}` |
//! | `Decimal128`     | `{"$numberDecimal": "19.99"}`                    |
//! | `Timestamp`      | `{"$timestamp": {"t": 1700000000, "i": 1}}`      |
//! | `Regex`          | `{"$regularExpression": {"pattern": "^a", "options": "i"}}` |
//! | `JavaScript`     | `{"$code": "..."}`                               |
//! | code with scope  | `{"$code": "...", "$scope": {...}}`              |
//! | `Symbol`         | `{"$symbol": "..."}`                             |
//! | `DbPointer`      | `{"$dbPointer": {"$ref": "db.c", "$id": {"$oid": "..."}}}` |
//! | `Undefined`      | `{"$undefined": true}`                           |
//! | `MinKey`/`MaxKey`| `{"$minKey": 1}` / `{"$maxKey": 1}`              |
//!
//! Plain integers decode as `Int32` when they fit and `Int64` otherwise;
//! numbers with a fraction or exponent decode as `Double`.
//!
//! The text form is ambiguous for a stored sub-document whose keys are
//! exactly those of a wrapper, such as `{"$oid": "<24 hex digits>"}`: it
//! decodes as the wrapped value, or is rejected when the wrapped payload is
//! malformed. Such field names are reserved by the server, so only BSON
//! artifacts carry them faithfully.

use crate::decimal::Decimal128;
use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::oid::ObjectId;
use crate::value::Value;
use crate::MAX_NESTING_DEPTH;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number, Value as Json};

/// Encode a document as one JSON line, newline included.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_line(document: &Document) -> CodecResult<Vec<u8>> {
    let json = document_to_json(document);
    let mut line = serde_json::to_vec(&json).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    line.push(b'\n');
    Ok(line)
}

/// Decode one JSON line (without its newline) into a document.
///
/// # Errors
///
/// Returns `MalformedRecord` if the line is not a JSON object or carries
/// a malformed Extended JSON wrapper, and `InvalidUtf8` for non-UTF-8 input.
pub fn from_json_line(line: &[u8]) -> CodecResult<Document> {
    let text = std::str::from_utf8(line).map_err(|_| CodecError::InvalidUtf8)?;
    let json: Json =
        serde_json::from_str(text).map_err(|e| CodecError::malformed(e.to_string()))?;
    match json {
        Json::Object(map) => object_to_document(map, 1),
        other => Err(CodecError::malformed(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn document_to_json(document: &Document) -> Json {
    let mut map = Map::with_capacity(document.len());
    for (key, value) in document.iter() {
        map.insert(key.to_string(), value_to_json(value));
    }
    Json::Object(map)
}

fn wrapper(key: &str, inner: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), inner);
    Json::Object(map)
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int32(n) => Json::from(*n),
        Value::Int64(n) => wrapper("$numberLong", Json::String(n.to_string())),
        Value::Double(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None => wrapper("$numberDouble", Json::String(non_finite_name(*f).to_string())),
        },
        Value::String(s) => Json::String(s.clone()),
        Value::Document(d) => document_to_json(d),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::ObjectId(id) => wrapper("$oid", Json::String(id.to_hex())),
        Value::DateTime(ms) => wrapper(
            "$date",
            wrapper("$numberLong", Json::String(ms.to_string())),
        ),
        Value::Binary { subtype, bytes } => {
            let mut inner = Map::with_capacity(2);
            inner.insert("base64".to_string(), Json::String(STANDARD.encode(bytes)));
            inner.insert("subType".to_string(), Json::String(format!("{subtype:02x}")));
            wrapper("$binary", Json::Object(inner))
        }
        Value::Decimal128(d) => wrapper("$numberDecimal", Json::String(d.to_string())),
        Value::Timestamp { time, increment } => {
            let mut inner = Map::with_capacity(2);
            inner.insert("t".to_string(), Json::from(*time));
            inner.insert("i".to_string(), Json::from(*increment));
            wrapper("$timestamp", Json::Object(inner))
        }
        Value::Regex { pattern, options } => {
            let mut inner = Map::with_capacity(2);
            inner.insert("pattern".to_string(), Json::String(pattern.clone()));
            inner.insert("options".to_string(), Json::String(options.clone()));
            wrapper("$regularExpression", Json::Object(inner))
        }
        Value::JavaScript(code) => wrapper("$code", Json::String(code.clone())),
        Value::JavaScriptWithScope { code, scope } => {
            let mut map = Map::with_capacity(2);
            map.insert("$code".to_string(), Json::String(code.clone()));
            map.insert("$scope".to_string(), document_to_json(scope));
            Json::Object(map)
        }
        Value::Symbol(s) => wrapper("$symbol", Json::String(s.clone())),
        Value::DbPointer { namespace, id } => {
            let mut inner = Map::with_capacity(2);
            inner.insert("$ref".to_string(), Json::String(namespace.clone()));
            inner.insert("$id".to_string(), wrapper("$oid", Json::String(id.to_hex())));
            wrapper("$dbPointer", Json::Object(inner))
        }
        Value::Undefined => wrapper("$undefined", Json::Bool(true)),
        Value::MinKey => wrapper("$minKey", Json::from(1)),
        Value::MaxKey => wrapper("$maxKey", Json::from(1)),
    }
}

fn non_finite_name(f: f64) -> &'static str {
    if f.is_nan() {
        "NaN"
    } else if f.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// `depth` counts the object being converted; the top level is 1.
fn object_to_document(map: Map<String, Json>, depth: usize) -> CodecResult<Document> {
    if depth > MAX_NESTING_DEPTH {
        return Err(CodecError::malformed(format!(
            "record nests deeper than {MAX_NESTING_DEPTH} levels"
        )));
    }
    let mut document = Document::with_capacity(map.len());
    for (key, value) in map {
        document.insert(key, json_to_value(value, depth)?);
    }
    Ok(document)
}

fn json_to_value(json: Json, depth: usize) -> CodecResult<Value> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_to_value(&n)?,
        Json::String(s) => Value::String(s),
        Json::Array(items) => {
            if depth + 1 > MAX_NESTING_DEPTH {
                return Err(CodecError::malformed(format!(
                    "record nests deeper than {MAX_NESTING_DEPTH} levels"
                )));
            }
            Value::Array(
                items
                    .into_iter()
                    .map(|item| json_to_value(item, depth + 1))
                    .collect::<CodecResult<Vec<_>>>()?,
            )
        }
        Json::Object(mut map) => {
            if let Some(value) = scoped_code(&mut map, depth)? {
                return Ok(value);
            }
            match extended_value(&map)? {
                Some(value) => value,
                None => Value::Document(object_to_document(map, depth + 1)?),
            }
        }
    };
    Ok(value)
}

/// Recognises the two-key `{"$code": ..., "$scope": {...}}` wrapper.
fn scoped_code(map: &mut Map<String, Json>, depth: usize) -> CodecResult<Option<Value>> {
    if map.len() != 2 || !map.contains_key("$code") || !map.contains_key("$scope") {
        return Ok(None);
    }
    let code = wrapped_str("$code", &map["$code"])?.to_string();
    let scope = match map.remove("$scope") {
        Some(Json::Object(scope)) => object_to_document(scope, depth + 1)?,
        _ => return Err(CodecError::malformed("$scope must be an object")),
    };
    Ok(Some(Value::JavaScriptWithScope { code, scope }))
}

fn number_to_value(n: &Number) -> CodecResult<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(i32::try_from(i).map_or(Value::Int64(i), Value::Int32));
    }
    if n.is_u64() {
        return Err(CodecError::malformed(format!("integer {n} overflows int64")));
    }
    n.as_f64()
        .map(Value::Double)
        .ok_or_else(|| CodecError::malformed(format!("unrepresentable number {n}")))
}

/// Recognises a single-key Extended JSON wrapper object.
fn extended_value(map: &Map<String, Json>) -> CodecResult<Option<Value>> {
    if map.len() != 1 {
        return Ok(None);
    }
    let Some((key, inner)) = map.iter().next() else {
        return Ok(None);
    };
    let value = match key.as_str() {
        "$oid" => Value::ObjectId(ObjectId::parse_hex(wrapped_str(key, inner)?)?),
        "$numberLong" => Value::Int64(parse_wrapped(key, inner)?),
        "$numberInt" => Value::Int32(parse_wrapped(key, inner)?),
        "$numberDouble" => Value::Double(match wrapped_str(key, inner)? {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            other => other
                .parse()
                .map_err(|_| CodecError::malformed(format!("invalid $numberDouble {other:?}")))?,
        }),
        "$date" => Value::DateTime(match inner {
            Json::Object(m) if m.len() == 1 && m.contains_key("$numberLong") => {
                parse_wrapped("$numberLong", &m["$numberLong"])?
            }
            Json::Number(n) => n
                .as_i64()
                .ok_or_else(|| CodecError::malformed(format!("invalid $date {n}")))?,
            other => {
                return Err(CodecError::malformed(format!(
                    "unsupported $date form {}",
                    json_kind(other)
                )))
            }
        }),
        "$binary" => binary_value(inner)?,
        "$numberDecimal" => Value::Decimal128(wrapped_str(key, inner)?.parse::<Decimal128>()?),
        "$timestamp" => {
            let part = |name: &str| {
                inner
                    .get(name)
                    .and_then(Json::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| CodecError::malformed(format!("$timestamp needs a u32 {name:?}")))
            };
            Value::Timestamp {
                time: part("t")?,
                increment: part("i")?,
            }
        }
        "$regularExpression" => {
            let part = |name: &str| {
                inner
                    .get(name)
                    .and_then(Json::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        CodecError::malformed(format!("$regularExpression needs a string {name:?}"))
                    })
            };
            Value::Regex {
                pattern: part("pattern")?,
                options: part("options")?,
            }
        }
        "$code" => Value::JavaScript(wrapped_str(key, inner)?.to_string()),
        "$symbol" => Value::Symbol(wrapped_str(key, inner)?.to_string()),
        "$dbPointer" => {
            let namespace = inner
                .get("$ref")
                .and_then(Json::as_str)
                .ok_or_else(|| CodecError::malformed("$dbPointer needs a string $ref"))?;
            let id = inner
                .get("$id")
                .and_then(|id| id.get("$oid"))
                .and_then(Json::as_str)
                .ok_or_else(|| CodecError::malformed("$dbPointer needs an $oid $id"))?;
            Value::DbPointer {
                namespace: namespace.to_string(),
                id: ObjectId::parse_hex(id)?,
            }
        }
        "$undefined" => Value::Undefined,
        "$minKey" => Value::MinKey,
        "$maxKey" => Value::MaxKey,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn binary_value(inner: &Json) -> CodecResult<Value> {
    let Json::Object(m) = inner else {
        return Err(CodecError::malformed("$binary must be an object"));
    };
    let encoded = m
        .get("base64")
        .and_then(Json::as_str)
        .ok_or_else(|| CodecError::malformed("$binary missing base64"))?;
    let subtype = m
        .get("subType")
        .and_then(Json::as_str)
        .ok_or_else(|| CodecError::malformed("$binary missing subType"))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| CodecError::malformed(format!("invalid base64: {e}")))?;
    let subtype = u8::from_str_radix(subtype, 16)
        .map_err(|_| CodecError::malformed(format!("invalid subType {subtype:?}")))?;
    Ok(Value::Binary { subtype, bytes })
}

fn wrapped_str<'j>(key: &str, inner: &'j Json) -> CodecResult<&'j str> {
    inner
        .as_str()
        .ok_or_else(|| CodecError::malformed(format!("{key} must wrap a string")))
}

fn parse_wrapped<T: std::str::FromStr>(key: &str, inner: &Json) -> CodecResult<T> {
    let s = wrapped_str(key, inner)?;
    s.parse()
        .map_err(|_| CodecError::malformed(format!("invalid {key} value {s:?}")))
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(doc: &Document) -> String {
        String::from_utf8(to_json_line(doc).unwrap()).unwrap()
    }

    #[test]
    fn plain_fields_stay_plain() {
        let doc = Document::new()
            .with("Number", "A1")
            .with("count", 3)
            .with("ratio", 0.5)
            .with("ok", false)
            .with("none", Value::Null);
        assert_eq!(
            line(&doc),
            "{\"Number\":\"A1\",\"count\":3,\"ratio\":0.5,\"ok\":false,\"none\":null}\n"
        );
    }

    #[test]
    fn field_order_is_preserved() {
        let doc = Document::new().with("z", 1).with("a", 2);
        assert_eq!(line(&doc), "{\"z\":1,\"a\":2}\n");
        let decoded = from_json_line(line(&doc).trim_end().as_bytes()).unwrap();
        assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn extended_types_roundtrip() {
        let doc = Document::new()
            .with("_id", ObjectId::from_bytes([0xab; 12]))
            .with("big", 1i64 << 40)
            .with("small_long", Value::Int64(7))
            .with("when", Value::DateTime(-5))
            .with(
                "blob",
                Value::Binary {
                    subtype: 4,
                    bytes: vec![0, 1, 2, 250],
                },
            );
        let encoded = to_json_line(&doc).unwrap();
        let text = String::from_utf8(encoded.clone()).unwrap();
        assert!(text.contains("{\"$oid\":\"abababababababababababab\"}"));
        assert!(text.contains("{\"$numberLong\":\"7\"}"));
        assert!(text.contains("\"subType\":\"04\""));

        let decoded = from_json_line(&encoded[..encoded.len() - 1]).unwrap();
        assert_eq!(decoded.get("_id"), doc.get("_id"));
        assert_eq!(decoded.get("big"), Some(&Value::Int64(1 << 40)));
        assert_eq!(decoded.get("small_long"), Some(&Value::Int64(7)));
        assert_eq!(decoded.get("when"), Some(&Value::DateTime(-5)));
        assert_eq!(decoded.get("blob"), doc.get("blob"));
    }

    #[test]
    fn non_finite_doubles_are_wrapped() {
        let doc = Document::new()
            .with("inf", f64::INFINITY)
            .with("neg", f64::NEG_INFINITY);
        let text = line(&doc);
        assert!(text.contains("{\"$numberDouble\":\"Infinity\"}"));
        assert!(text.contains("{\"$numberDouble\":\"-Infinity\"}"));
        let decoded = from_json_line(text.trim_end().as_bytes()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn integral_double_stays_double() {
        let doc = Document::new().with("d", 3.0);
        let text = line(&doc);
        let decoded = from_json_line(text.trim_end().as_bytes()).unwrap();
        assert_eq!(decoded.get("d"), Some(&Value::Double(3.0)));
    }

    #[test]
    fn wide_plain_integer_is_int64() {
        let decoded = from_json_line(b"{\"n\":4294967296,\"m\":-7}").unwrap();
        assert_eq!(decoded.get("n"), Some(&Value::Int64(4_294_967_296)));
        assert_eq!(decoded.get("m"), Some(&Value::Int32(-7)));
    }

    #[test]
    fn reject_non_object_line() {
        assert!(matches!(
            from_json_line(b"[1,2]"),
            Err(CodecError::MalformedRecord { .. })
        ));
        assert!(matches!(
            from_json_line(b"{\"a\":"),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn reject_bad_wrappers() {
        assert!(from_json_line(b"{\"x\":{\"$oid\":\"nothex\"}}").is_err());
        assert!(from_json_line(b"{\"x\":{\"$numberLong\":12}}").is_err());
        assert!(from_json_line(b"{\"x\":{\"$binary\":{\"base64\":\"!!\",\"subType\":\"00\"}}}").is_err());
    }

    #[test]
    fn server_only_types_use_canonical_wrappers() {
        let doc = Document::new()
            .with("price", Value::Decimal128("19.99".parse().unwrap()))
            .with(
                "ts",
                Value::Timestamp {
                    time: 5,
                    increment: 6,
                },
            )
            .with(
                "re",
                Value::Regex {
                    pattern: "^a".into(),
                    options: "i".into(),
                },
            )
            .with(
                "scoped",
                Value::JavaScriptWithScope {
                    code: "x".into(),
                    scope: Document::new().with("x", 1),
                },
            )
            .with("min", Value::MinKey)
            .with("max", Value::MaxKey)
            .with("undef", Value::Undefined);
        let text = line(&doc);
        assert!(text.contains("{\"$numberDecimal\":\"19.99\"}"));
        assert!(text.contains("{\"$timestamp\":{\"t\":5,\"i\":6}}"));
        assert!(text.contains("{\"$regularExpression\":{\"pattern\":\"^a\",\"options\":\"i\"}}"));
        assert!(text.contains("{\"$code\":\"x\",\"$scope\":{\"x\":1}}"));
        assert!(text.contains("{\"$minKey\":1}"));
        assert!(text.contains("{\"$undefined\":true}"));
        assert_eq!(from_json_line(text.trim_end().as_bytes()).unwrap(), doc);
    }

    #[test]
    fn reject_bad_server_type_wrappers() {
        assert!(from_json_line(b"{\"x\":{\"$numberDecimal\":\"1.2.3\"}}").is_err());
        assert!(from_json_line(b"{\"x\":{\"$timestamp\":{\"t\":-1,\"i\":0}}}").is_err());
        assert!(from_json_line(b"{\"x\":{\"$regularExpression\":{\"pattern\":\"a\"}}}").is_err());
        assert!(from_json_line(b"{\"x\":{\"$code\":\"c\",\"$scope\":5}}").is_err());
    }

    #[test]
    fn wrapper_shaped_subdocument_reads_as_wrapped_value() {
        let hex = "0102030405060708090a0b0c";
        let decoded = from_json_line(format!("{{\"ref\":{{\"$oid\":\"{hex}\"}}}}").as_bytes()).unwrap();
        assert_eq!(
            decoded.get("ref"),
            Some(&Value::ObjectId(ObjectId::parse_hex(hex).unwrap()))
        );
    }

    #[test]
    fn nesting_limit_applies_to_text() {
        let deep = |levels: usize| {
            let mut text = "1".to_string();
            for _ in 1..levels {
                text = format!("{{\"d\":{text}}}");
            }
            format!("{{\"d\":{text}}}")
        };
        assert!(from_json_line(deep(MAX_NESTING_DEPTH).as_bytes()).is_ok());
        assert!(matches!(
            from_json_line(deep(MAX_NESTING_DEPTH + 1).as_bytes()),
            Err(CodecError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn unknown_dollar_keys_are_plain_documents() {
        let decoded = from_json_line(b"{\"q\":{\"$gt\":5}}").unwrap();
        assert_eq!(
            decoded.get("q"),
            Some(&Value::Document(Document::new().with("$gt", 5)))
        );
    }
}

//! BSON encoder.

use crate::document::Document;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH};

pub(crate) const TYPE_DOUBLE: u8 = 0x01;
pub(crate) const TYPE_STRING: u8 = 0x02;
pub(crate) const TYPE_DOCUMENT: u8 = 0x03;
pub(crate) const TYPE_ARRAY: u8 = 0x04;
pub(crate) const TYPE_BINARY: u8 = 0x05;
pub(crate) const TYPE_UNDEFINED: u8 = 0x06;
pub(crate) const TYPE_OBJECT_ID: u8 = 0x07;
pub(crate) const TYPE_BOOL: u8 = 0x08;
pub(crate) const TYPE_DATETIME: u8 = 0x09;
pub(crate) const TYPE_NULL: u8 = 0x0A;
pub(crate) const TYPE_REGEX: u8 = 0x0B;
pub(crate) const TYPE_DB_POINTER: u8 = 0x0C;
pub(crate) const TYPE_JAVASCRIPT: u8 = 0x0D;
pub(crate) const TYPE_SYMBOL: u8 = 0x0E;
pub(crate) const TYPE_JAVASCRIPT_SCOPE: u8 = 0x0F;
pub(crate) const TYPE_INT32: u8 = 0x10;
pub(crate) const TYPE_TIMESTAMP: u8 = 0x11;
pub(crate) const TYPE_INT64: u8 = 0x12;
pub(crate) const TYPE_DECIMAL128: u8 = 0x13;
pub(crate) const TYPE_MIN_KEY: u8 = 0xFF;
pub(crate) const TYPE_MAX_KEY: u8 = 0x7F;

/// Encode a document to BSON bytes.
///
/// The first four bytes are the little-endian total length, prefix
/// included, so a sequence of encoded documents is self-framing.
///
/// # Errors
///
/// Returns an error if a field name contains NUL, the document nests
/// deeper than [`MAX_NESTING_DEPTH`], or it exceeds [`MAX_DOCUMENT_SIZE`].
pub fn to_bson(document: &Document) -> CodecResult<Vec<u8>> {
    let mut encoder = BsonEncoder::new();
    encoder.encode(document)?;
    Ok(encoder.into_bytes())
}

/// A BSON encoder writing into an owned buffer.
pub(crate) struct BsonEncoder {
    buffer: Vec<u8>,
    depth: usize,
}

impl BsonEncoder {
    /// Create a new encoder.
    pub(crate) fn new() -> Self {
        Self {
            buffer: Vec::new(),
            depth: 0,
        }
    }

    /// Encode a top-level document.
    pub(crate) fn encode(&mut self, document: &Document) -> CodecResult<()> {
        let start = self.buffer.len();
        self.encode_document(document)?;
        let size = self.buffer.len() - start;
        if size > MAX_DOCUMENT_SIZE {
            self.buffer.truncate(start);
            return Err(CodecError::encoding_failed(format!(
                "document is {size} bytes, limit is {MAX_DOCUMENT_SIZE}"
            )));
        }
        Ok(())
    }

    /// Consume this encoder and return the encoded bytes.
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn encode_document(&mut self, document: &Document) -> CodecResult<()> {
        self.enter()?;
        let start = self.begin_length();
        for (key, value) in document.iter() {
            self.encode_element(key, value)?;
        }
        self.buffer.push(0x00);
        self.depth -= 1;
        self.end_length(start)
    }

    fn encode_array(&mut self, items: &[Value]) -> CodecResult<()> {
        // Arrays are documents keyed "0", "1", ...
        self.enter()?;
        let start = self.begin_length();
        for (idx, item) in items.iter().enumerate() {
            self.encode_element(&idx.to_string(), item)?;
        }
        self.buffer.push(0x00);
        self.depth -= 1;
        self.end_length(start)
    }

    /// Mirrors the decoder's nesting limit.
    fn enter(&mut self) -> CodecResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(CodecError::encoding_failed(format!(
                "document nests deeper than {MAX_NESTING_DEPTH} levels"
            )));
        }
        Ok(())
    }

    fn encode_element(&mut self, key: &str, value: &Value) -> CodecResult<()> {
        self.buffer.push(element_type(value));
        self.encode_cstring(key)?;
        match value {
            Value::Null => {}
            Value::Bool(b) => self.buffer.push(u8::from(*b)),
            Value::Int32(n) => self.buffer.extend_from_slice(&n.to_le_bytes()),
            Value::Int64(n) | Value::DateTime(n) => {
                self.buffer.extend_from_slice(&n.to_le_bytes());
            }
            Value::Double(f) => self.buffer.extend_from_slice(&f.to_le_bytes()),
            Value::String(s) => self.encode_string(s)?,
            Value::Document(d) => self.encode_document(d)?,
            Value::Array(items) => self.encode_array(items)?,
            Value::ObjectId(id) => self.buffer.extend_from_slice(&id.bytes()),
            Value::Binary { subtype, bytes } => {
                self.encode_len(bytes.len())?;
                self.buffer.push(*subtype);
                self.buffer.extend_from_slice(bytes);
            }
            Value::Decimal128(d) => self.buffer.extend_from_slice(&d.bytes()),
            Value::Timestamp { time, increment } => {
                self.buffer.extend_from_slice(&increment.to_le_bytes());
                self.buffer.extend_from_slice(&time.to_le_bytes());
            }
            Value::Regex { pattern, options } => {
                self.encode_cstring(pattern)?;
                self.encode_cstring(options)?;
            }
            Value::JavaScript(code) | Value::Symbol(code) => self.encode_string(code)?,
            Value::JavaScriptWithScope { code, scope } => {
                let start = self.begin_length();
                self.encode_string(code)?;
                self.encode_document(scope)?;
                self.end_length(start)?;
            }
            Value::DbPointer { namespace, id } => {
                self.encode_string(namespace)?;
                self.buffer.extend_from_slice(&id.bytes());
            }
            Value::Undefined | Value::MinKey | Value::MaxKey => {}
        }
        Ok(())
    }

    fn encode_cstring(&mut self, s: &str) -> CodecResult<()> {
        if s.as_bytes().contains(&0) {
            return Err(CodecError::encoding_failed(format!(
                "{s:?} contains a NUL byte"
            )));
        }
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(0x00);
        Ok(())
    }

    fn encode_string(&mut self, s: &str) -> CodecResult<()> {
        self.encode_len(s.len() + 1)?;
        self.buffer.extend_from_slice(s.as_bytes());
        self.buffer.push(0x00);
        Ok(())
    }

    fn encode_len(&mut self, len: usize) -> CodecResult<()> {
        let len = i32::try_from(len)
            .map_err(|_| CodecError::encoding_failed(format!("length {len} overflows i32")))?;
        self.buffer.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn begin_length(&mut self) -> usize {
        let start = self.buffer.len();
        self.buffer.extend_from_slice(&[0u8; 4]);
        start
    }

    fn end_length(&mut self, start: usize) -> CodecResult<()> {
        let len = self.buffer.len() - start;
        let len = i32::try_from(len)
            .map_err(|_| CodecError::encoding_failed(format!("document length {len} overflows i32")))?;
        self.buffer[start..start + 4].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }
}

fn element_type(value: &Value) -> u8 {
    match value {
        Value::Null => TYPE_NULL,
        Value::Bool(_) => TYPE_BOOL,
        Value::Int32(_) => TYPE_INT32,
        Value::Int64(_) => TYPE_INT64,
        Value::Double(_) => TYPE_DOUBLE,
        Value::String(_) => TYPE_STRING,
        Value::Document(_) => TYPE_DOCUMENT,
        Value::Array(_) => TYPE_ARRAY,
        Value::ObjectId(_) => TYPE_OBJECT_ID,
        Value::DateTime(_) => TYPE_DATETIME,
        Value::Binary { .. } => TYPE_BINARY,
        Value::Decimal128(_) => TYPE_DECIMAL128,
        Value::Timestamp { .. } => TYPE_TIMESTAMP,
        Value::Regex { .. } => TYPE_REGEX,
        Value::JavaScript(_) => TYPE_JAVASCRIPT,
        Value::JavaScriptWithScope { .. } => TYPE_JAVASCRIPT_SCOPE,
        Value::Symbol(_) => TYPE_SYMBOL,
        Value::DbPointer { .. } => TYPE_DB_POINTER,
        Value::Undefined => TYPE_UNDEFINED,
        Value::MinKey => TYPE_MIN_KEY,
        Value::MaxKey => TYPE_MAX_KEY,
    }
}

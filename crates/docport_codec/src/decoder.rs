//! BSON decoder.

use crate::document::Document;
use crate::decimal::Decimal128;
use crate::encoder::{
    TYPE_ARRAY, TYPE_BINARY, TYPE_BOOL, TYPE_DATETIME, TYPE_DB_POINTER, TYPE_DECIMAL128,
    TYPE_DOCUMENT, TYPE_DOUBLE, TYPE_INT32, TYPE_INT64, TYPE_JAVASCRIPT, TYPE_JAVASCRIPT_SCOPE,
    TYPE_MAX_KEY, TYPE_MIN_KEY, TYPE_NULL, TYPE_OBJECT_ID, TYPE_REGEX, TYPE_STRING, TYPE_SYMBOL,
    TYPE_TIMESTAMP, TYPE_UNDEFINED,
};
use crate::error::{CodecError, CodecResult};
use crate::oid::{ObjectId, OBJECT_ID_LEN};
use crate::value::Value;
use crate::{MAX_DOCUMENT_SIZE, MAX_NESTING_DEPTH, MIN_DOCUMENT_SIZE};

/// Decode exactly one BSON document from `bytes`.
///
/// The slice must hold the whole document and nothing else.
///
/// # Errors
///
/// Returns an error if the bytes are not a well-formed document or contain
/// element types this codec does not carry.
pub fn from_bson(bytes: &[u8]) -> CodecResult<Document> {
    let mut decoder = BsonDecoder::new(bytes);
    let document = decoder.decode()?;
    if !decoder.remaining().is_empty() {
        return Err(CodecError::decoding_failed(format!(
            "{} trailing bytes after document",
            decoder.remaining().len()
        )));
    }
    Ok(document)
}

/// Reads the declared length of the document starting at `bytes`.
///
/// Returns `TruncatedStream` when fewer than four bytes are available and
/// `InvalidLength` when the prefix is outside the allowed range.
pub fn peek_length(bytes: &[u8]) -> CodecResult<usize> {
    let prefix: [u8; 4] = match bytes.get(..4) {
        Some(p) => [p[0], p[1], p[2], p[3]],
        None => return Err(CodecError::truncated(None, bytes.len())),
    };
    let length = i32::from_le_bytes(prefix);
    match usize::try_from(length) {
        Ok(len) if (MIN_DOCUMENT_SIZE..=MAX_DOCUMENT_SIZE).contains(&len) => Ok(len),
        _ => Err(CodecError::InvalidLength {
            length: i64::from(length),
            min: MIN_DOCUMENT_SIZE,
            max: MAX_DOCUMENT_SIZE,
        }),
    }
}

/// A BSON decoder over a borrowed byte slice.
pub(crate) struct BsonDecoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> BsonDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Decode the next document.
    pub(crate) fn decode(&mut self) -> CodecResult<Document> {
        let end = self.document_end()?;
        self.read_document(end)
    }

    fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Reads a length prefix and returns the absolute end offset of the
    /// document it introduces.
    fn document_end(&mut self) -> CodecResult<usize> {
        let start = self.pos;
        let len = peek_length(&self.data[start..]).map_err(|e| match e {
            CodecError::TruncatedStream { .. } => CodecError::decoding_failed("missing length prefix"),
            other => other,
        })?;
        let end = start + len;
        if end > self.data.len() {
            return Err(CodecError::decoding_failed(format!(
                "document declares {len} bytes but only {} remain",
                self.data.len() - start
            )));
        }
        self.pos += 4;
        Ok(end)
    }

    fn read_document(&mut self, end: usize) -> CodecResult<Document> {
        let mut document = Document::new();
        self.read_elements(end, |key, value| {
            if document.contains_key(&key) {
                return Err(CodecError::decoding_failed(format!(
                    "duplicate field name {key:?}"
                )));
            }
            document.insert(key, value);
            Ok(())
        })?;
        Ok(document)
    }

    fn read_elements<F>(&mut self, end: usize, mut sink: F) -> CodecResult<()>
    where
        F: FnMut(String, Value) -> CodecResult<()>,
    {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(CodecError::decoding_failed("nesting too deep"));
        }
        loop {
            if self.pos >= end {
                return Err(CodecError::decoding_failed("document missing terminator"));
            }
            let element_type = self.read_byte()?;
            if element_type == 0x00 {
                if self.pos != end {
                    return Err(CodecError::decoding_failed(
                        "terminator before declared document end",
                    ));
                }
                break;
            }
            let key = self.read_cstring(end)?;
            let value = self.read_value(element_type, end)?;
            sink(key, value)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn read_value(&mut self, element_type: u8, end: usize) -> CodecResult<Value> {
        let value = match element_type {
            TYPE_DOUBLE => Value::Double(f64::from_le_bytes(self.read_array::<8>(end)?)),
            TYPE_STRING => Value::String(self.read_string(end)?),
            TYPE_DOCUMENT => {
                let inner_end = self.document_end()?;
                self.check_within(inner_end, end)?;
                Value::Document(self.read_document(inner_end)?)
            }
            TYPE_ARRAY => {
                let inner_end = self.document_end()?;
                self.check_within(inner_end, end)?;
                let mut items = Vec::new();
                self.read_elements(inner_end, |_, v| {
                    items.push(v);
                    Ok(())
                })?;
                Value::Array(items)
            }
            TYPE_BINARY => {
                let len = self.read_i32(end)?;
                let len = usize::try_from(len)
                    .map_err(|_| CodecError::decoding_failed("negative binary length"))?;
                let subtype = self.read_byte()?;
                let bytes = self.read_slice(len, end)?.to_vec();
                Value::Binary { subtype, bytes }
            }
            TYPE_OBJECT_ID => Value::ObjectId(ObjectId::from_bytes(
                self.read_array::<OBJECT_ID_LEN>(end)?,
            )),
            TYPE_BOOL => match self.read_byte()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(CodecError::decoding_failed(format!(
                        "invalid boolean byte {other:#04x}"
                    )))
                }
            },
            TYPE_DATETIME => Value::DateTime(i64::from_le_bytes(self.read_array::<8>(end)?)),
            TYPE_NULL => Value::Null,
            TYPE_INT32 => Value::Int32(self.read_i32(end)?),
            TYPE_INT64 => Value::Int64(i64::from_le_bytes(self.read_array::<8>(end)?)),
            TYPE_DECIMAL128 => Value::Decimal128(Decimal128::from_bytes(self.read_array::<16>(end)?)),
            TYPE_TIMESTAMP => {
                let increment = u32::from_le_bytes(self.read_array::<4>(end)?);
                let time = u32::from_le_bytes(self.read_array::<4>(end)?);
                Value::Timestamp { time, increment }
            }
            TYPE_REGEX => Value::Regex {
                pattern: self.read_cstring(end)?,
                options: self.read_cstring(end)?,
            },
            TYPE_JAVASCRIPT => Value::JavaScript(self.read_string(end)?),
            TYPE_SYMBOL => Value::Symbol(self.read_string(end)?),
            TYPE_JAVASCRIPT_SCOPE => {
                let start = self.pos;
                let total = usize::try_from(self.read_i32(end)?)
                    .map_err(|_| CodecError::decoding_failed("negative code-with-scope length"))?;
                let scoped_end = start
                    .checked_add(total)
                    .filter(|stop| *stop <= end)
                    .ok_or_else(|| CodecError::decoding_failed("code-with-scope overruns document"))?;
                let code = self.read_string(scoped_end)?;
                let scope_end = self.document_end()?;
                if scope_end != scoped_end {
                    return Err(CodecError::decoding_failed(
                        "code-with-scope length does not match its parts",
                    ));
                }
                Value::JavaScriptWithScope {
                    code,
                    scope: self.read_document(scope_end)?,
                }
            }
            TYPE_DB_POINTER => Value::DbPointer {
                namespace: self.read_string(end)?,
                id: ObjectId::from_bytes(self.read_array::<OBJECT_ID_LEN>(end)?),
            },
            TYPE_UNDEFINED => Value::Undefined,
            TYPE_MIN_KEY => Value::MinKey,
            TYPE_MAX_KEY => Value::MaxKey,
            other => return Err(CodecError::unsupported_type(format!("{other:#04x}"))),
        };
        Ok(value)
    }

    fn check_within(&self, inner_end: usize, end: usize) -> CodecResult<()> {
        if inner_end > end {
            return Err(CodecError::decoding_failed(
                "embedded document overruns its parent",
            ));
        }
        Ok(())
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CodecError::decoding_failed("unexpected end of document"))?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_slice(&mut self, len: usize, end: usize) -> CodecResult<&'a [u8]> {
        let stop = self
            .pos
            .checked_add(len)
            .filter(|stop| *stop <= end)
            .ok_or_else(|| CodecError::decoding_failed("element overruns document"))?;
        let bytes = &self.data[self.pos..stop];
        self.pos = stop;
        Ok(bytes)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self, end: usize) -> CodecResult<[u8; N]> {
        let slice = self.read_slice(N, end)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn read_i32(&mut self, end: usize) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_array::<4>(end)?))
    }

    fn read_cstring(&mut self, end: usize) -> CodecResult<String> {
        let rest = &self.data[self.pos..end];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| CodecError::decoding_failed("unterminated field name"))?;
        let text = std::str::from_utf8(&rest[..nul]).map_err(|_| CodecError::InvalidUtf8)?;
        self.pos += nul + 1;
        Ok(text.to_string())
    }

    fn read_string(&mut self, end: usize) -> CodecResult<String> {
        let len = self.read_i32(end)?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len >= 1)
            .ok_or_else(|| CodecError::decoding_failed(format!("invalid string length {len}")))?;
        let bytes = self.read_slice(len, end)?;
        let (text, terminator) = bytes.split_at(len - 1);
        if terminator != [0] {
            return Err(CodecError::decoding_failed("string missing NUL terminator"));
        }
        let text = std::str::from_utf8(text).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(text.to_string())
    }
}

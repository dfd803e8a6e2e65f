//! Document framing over an unbounded byte stream.
//!
//! A reader hands over bytes in whatever chunks the source produces. A
//! document may start in one chunk and end several chunks later, so the
//! [`FrameBuffer`] keeps unconsumed bytes and retries boundary detection
//! after every chunk instead of assuming one read holds one document.

use crate::decoder::{from_bson, peek_length};
use crate::document::Document;
use crate::encoder::to_bson;
use crate::error::{CodecError, CodecResult};
use crate::format::Format;
use crate::json::{from_json_line, to_json_line};

/// Encode one document in the given format.
///
/// # Errors
///
/// Returns an error if the document cannot be represented in `format`.
pub fn encode(document: &Document, format: Format) -> CodecResult<Vec<u8>> {
    match format {
        Format::Bson => to_bson(document),
        Format::Json => to_json_line(document),
    }
}

/// Decode the first complete document in `bytes`.
///
/// Returns the document and the number of bytes it occupied. When `bytes`
/// does not yet hold a complete document the error is `TruncatedStream`,
/// which a streaming caller treats as "read more".
///
/// # Errors
///
/// `TruncatedStream` when more bytes are needed; `InvalidLength` for an
/// impossible length prefix; any decoding error for a complete but invalid
/// document.
pub fn decode_one(bytes: &[u8], format: Format) -> CodecResult<(Document, usize)> {
    match format {
        Format::Bson => {
            let len = peek_length(bytes)?;
            if bytes.len() < len {
                return Err(CodecError::truncated(Some(len), bytes.len()));
            }
            Ok((from_bson(&bytes[..len])?, len))
        }
        Format::Json => {
            let start = skip_whitespace(bytes);
            let newline = bytes[start..]
                .iter()
                .position(|b| *b == b'\n')
                .ok_or_else(|| CodecError::truncated(None, bytes.len()))?;
            let line = &bytes[start..start + newline];
            Ok((from_json_line(trim_end(line))?, start + newline + 1))
        }
    }
}

/// End-of-stream counterpart of [`decode_one`].
///
/// Called once the source is exhausted with whatever bytes remain. Returns
/// `None` when nothing meaningful is left. For JSON an unterminated final
/// line is still a document; for BSON any leftover byte is a truncated
/// document.
///
/// # Errors
///
/// `TruncatedStream` (or `InvalidLength`) for leftover BSON bytes, or the
/// decoding error of an invalid final JSON line.
pub fn decode_last(bytes: &[u8], format: Format) -> CodecResult<Option<Document>> {
    match format {
        Format::Bson => {
            if bytes.is_empty() {
                return Ok(None);
            }
            let needed = peek_length(bytes).ok();
            Err(CodecError::truncated(needed, bytes.len()))
        }
        Format::Json => {
            let line = trim_end(&bytes[skip_whitespace(bytes)..]);
            if line.is_empty() {
                return Ok(None);
            }
            from_json_line(line).map(Some)
        }
    }
}

fn skip_whitespace(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len())
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// A growable byte arena with a consumed-so-far index.
///
/// Bytes before `consumed` belong to documents already handed out; they are
/// dropped lazily when at least half the buffer is dead, so extraction is
/// amortised O(1) per byte. For JSON the newline search resumes where the
/// previous one gave up, so a long line is scanned once however many
/// chunks it arrives in.
#[derive(Debug)]
pub struct FrameBuffer {
    format: Format,
    buf: Vec<u8>,
    consumed: usize,
    /// Bytes after `consumed` known to hold no newline.
    scanned: usize,
    decoded: u64,
}

impl FrameBuffer {
    /// Creates an empty buffer for the given format.
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            buf: Vec::new(),
            consumed: 0,
            scanned: 0,
            decoded: 0,
        }
    }

    /// Format this buffer frames.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Appends a chunk read from the source.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.compact();
        self.buf.extend_from_slice(chunk);
    }

    /// Extracts the next complete document, or `None` if more bytes are
    /// needed.
    ///
    /// # Errors
    ///
    /// Any codec error other than `TruncatedStream`.
    pub fn next_document(&mut self) -> CodecResult<Option<Document>> {
        let end = match self.format {
            Format::Bson => self.buf.len(),
            Format::Json => match self.next_line_end() {
                Some(end) => end,
                None => return Ok(None),
            },
        };
        match decode_one(&self.buf[self.consumed..end], self.format) {
            Ok((document, used)) => {
                self.consumed += used;
                self.decoded += 1;
                Ok(Some(document))
            }
            Err(e) if e.is_truncated() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// End offset, newline included, of the next non-blank line.
    ///
    /// Blank lines are consumed on the way.
    fn next_line_end(&mut self) -> Option<usize> {
        loop {
            let from = self.consumed + self.scanned;
            let Some(offset) = self.buf[from..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buf.len() - self.consumed;
                return None;
            };
            let end = from + offset + 1;
            self.scanned = 0;
            if self.buf[self.consumed..end].iter().all(u8::is_ascii_whitespace) {
                self.consumed = end;
                continue;
            }
            return Some(end);
        }
    }

    /// Signals end of stream and drains what is left.
    ///
    /// # Errors
    ///
    /// See [`decode_last`].
    pub fn finish(&mut self) -> CodecResult<Option<Document>> {
        let last = decode_last(&self.buf[self.consumed..], self.format)?;
        self.buf.clear();
        self.consumed = 0;
        self.scanned = 0;
        if last.is_some() {
            self.decoded += 1;
        }
        Ok(last)
    }

    /// Number of buffered bytes not yet consumed.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.consumed
    }

    /// Number of documents extracted so far.
    pub fn documents_decoded(&self) -> u64 {
        self.decoded
    }

    fn compact(&mut self) {
        if self.consumed == 0 {
            return;
        }
        if self.consumed == self.buf.len() {
            self.buf.clear();
            self.consumed = 0;
        } else if self.consumed * 2 >= self.buf.len() {
            self.buf.drain(..self.consumed);
            self.consumed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::ObjectId;
    use crate::value::Value;
    use proptest::prelude::*;

    fn docs(n: i32) -> Vec<Document> {
        (0..n)
            .map(|i| {
                Document::new()
                    .with("_id", ObjectId::from_bytes([i as u8; 12]))
                    .with("n", i)
                    .with("label", "x".repeat(i as usize % 7))
            })
            .collect()
    }

    fn stream(docs: &[Document], format: Format) -> Vec<u8> {
        docs.iter()
            .flat_map(|d| encode(d, format).unwrap())
            .collect()
    }

    fn feed(bytes: &[u8], format: Format, chunk: usize) -> CodecResult<Vec<Document>> {
        let mut frames = FrameBuffer::new(format);
        let mut out = Vec::new();
        for piece in bytes.chunks(chunk.max(1)) {
            frames.extend(piece);
            while let Some(doc) = frames.next_document()? {
                out.push(doc);
            }
        }
        if let Some(doc) = frames.finish()? {
            out.push(doc);
        }
        Ok(out)
    }

    #[test]
    fn decode_one_reports_consumed_bytes() {
        let all = docs(2);
        let bytes = stream(&all, Format::Bson);
        let (first, used) = decode_one(&bytes, Format::Bson).unwrap();
        assert_eq!(first, all[0]);
        let (second, used2) = decode_one(&bytes[used..], Format::Bson).unwrap();
        assert_eq!(second, all[1]);
        assert_eq!(used + used2, bytes.len());
    }

    #[test]
    fn partial_bson_is_truncated_with_needed_length() {
        let bytes = encode(&docs(1)[0], Format::Bson).unwrap();
        let err = decode_one(&bytes[..bytes.len() - 1], Format::Bson).unwrap_err();
        assert_eq!(
            err,
            CodecError::TruncatedStream {
                needed: Some(bytes.len()),
                available: bytes.len() - 1
            }
        );
        assert!(decode_one(&bytes[..3], Format::Bson)
            .unwrap_err()
            .is_truncated());
    }

    #[test]
    fn zero_length_prefix_is_fatal() {
        let err = decode_one(&[0, 0, 0, 0, 0], Format::Bson).unwrap_err();
        assert!(matches!(err, CodecError::InvalidLength { length: 0, .. }));
    }

    #[test]
    fn json_waits_for_newline() {
        let line = encode(&docs(1)[0], Format::Json).unwrap();
        assert!(decode_one(&line[..line.len() - 1], Format::Json)
            .unwrap_err()
            .is_truncated());
        let (doc, used) = decode_one(&line, Format::Json).unwrap();
        assert_eq!(doc, docs(1)[0]);
        assert_eq!(used, line.len());
    }

    #[test]
    fn json_skips_blank_lines_and_crlf() {
        let bytes = b"\n\r\n  {\"a\":1}\r\n\n{\"b\":2}";
        let out = feed(bytes, Format::Json, 3).unwrap();
        assert_eq!(
            out,
            vec![Document::new().with("a", 1), Document::new().with("b", 2)]
        );
    }

    #[test]
    fn one_byte_chunks_match_single_chunk() {
        for format in Format::ALL {
            let all = docs(25);
            let bytes = stream(&all, format);
            let whole = feed(&bytes, format, bytes.len()).unwrap();
            let bytewise = feed(&bytes, format, 1).unwrap();
            assert_eq!(whole, all);
            assert_eq!(bytewise, all);
        }
    }

    #[test]
    fn long_line_is_scanned_once() {
        let doc = Document::new().with("blob", "x".repeat(1 << 20));
        let bytes = encode(&doc, Format::Json).unwrap();
        let mut frames = FrameBuffer::new(Format::Json);
        let mut chunks = bytes.chunks(4096).peekable();
        while let Some(piece) = chunks.next() {
            frames.extend(piece);
            let next = frames.next_document().unwrap();
            if chunks.peek().is_some() {
                assert!(next.is_none());
                // Everything buffered so far was searched exactly once.
                assert_eq!(frames.scanned, frames.pending());
            } else {
                assert_eq!(next, Some(doc.clone()));
            }
        }
        assert_eq!(frames.pending(), 0);
        assert_eq!(frames.scanned, 0);
    }

    #[test]
    fn scan_offset_survives_compaction() {
        let first = encode(&Document::new().with("n", 1), Format::Json).unwrap();
        let second = encode(&Document::new().with("s", "y".repeat(300)), Format::Json).unwrap();
        let mut bytes = first.clone();
        bytes.extend_from_slice(&second);
        let out = feed(&bytes, Format::Json, first.len() + 5).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].get_str("s").map(str::len), Some(300));
    }

    #[test]
    fn leftover_bson_bytes_fail_at_finish() {
        let mut bytes = stream(&docs(3), Format::Bson);
        bytes.truncate(bytes.len() - 2);
        let err = feed(&bytes, Format::Bson, 64).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn empty_stream_yields_nothing() {
        for format in Format::ALL {
            assert!(feed(&[], format, 16).unwrap().is_empty());
        }
    }

    #[test]
    fn buffer_compacts_consumed_bytes() {
        let all = docs(50);
        let bytes = stream(&all, Format::Bson);
        let mut frames = FrameBuffer::new(Format::Bson);
        let mut seen = 0;
        for piece in bytes.chunks(40) {
            frames.extend(piece);
            while frames.next_document().unwrap().is_some() {
                seen += 1;
            }
            assert!(frames.pending() < 80);
        }
        assert_eq!(seen, 50);
        assert_eq!(frames.documents_decoded(), 50);
    }

    #[test]
    fn corrupt_document_surfaces_decoding_error() {
        let mut bytes = stream(&docs(2), Format::Bson);
        // Replace the first element type of the first document.
        bytes[4] = 0x42;
        let err = feed(&bytes, Format::Bson, 8).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedType { .. }));
    }

    proptest! {
        #[test]
        fn arbitrary_chunking_preserves_documents(
            values in prop::collection::vec(any::<i64>(), 0..40),
            chunk in 1usize..97,
        ) {
            let all: Vec<Document> = values
                .iter()
                .map(|v| Document::new().with("v", Value::Int64(*v)).with("s", v.to_string()))
                .collect();
            for format in Format::ALL {
                let bytes = stream(&all, format);
                prop_assert_eq!(feed(&bytes, format, chunk).unwrap(), all.clone());
            }
        }
    }
}

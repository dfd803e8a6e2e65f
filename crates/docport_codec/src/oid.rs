//! Twelve-byte object identifiers.

use crate::error::{CodecError, CodecResult};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of an object identifier in bytes.
pub const OBJECT_ID_LEN: usize = 12;

static COUNTER: AtomicU32 = AtomicU32::new(0);
static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();

/// An opaque unique identifier, laid out like a MongoDB `ObjectId`:
/// 4-byte big-endian seconds, 5 process-unique bytes, 3-byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let unique = PROCESS_UNIQUE.get_or_init(rand::random::<[u8; 5]>);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00FF_FFFF;

        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Wraps raw identifier bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw identifier bytes.
    #[must_use]
    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parses the 24-character lowercase or uppercase hex form.
    pub fn parse_hex(s: &str) -> CodecResult<Self> {
        let decoded = hex::decode(s)
            .map_err(|e| CodecError::decoding_failed(format!("invalid object id {s:?}: {e}")))?;
        let bytes: [u8; OBJECT_ID_LEN] = decoded.try_into().map_err(|_| {
            CodecError::decoding_failed(format!("object id {s:?} is not 12 bytes"))
        })?;
        Ok(Self(bytes))
    }

    /// Returns the 24-character lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        // Same process, same unique bytes.
        assert_eq!(a.bytes()[4..9], b.bytes()[4..9]);
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::from_bytes([0x65, 0x1f, 0, 1, 2, 3, 4, 5, 6, 7, 8, 0xff]);
        assert_eq!(id.to_hex(), "651f000102030405060708ff");
        assert_eq!(ObjectId::parse_hex(&id.to_hex()).unwrap(), id);
        assert_eq!(ObjectId::parse_hex("651F000102030405060708FF").unwrap(), id);
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert!(ObjectId::parse_hex("zz").is_err());
        assert!(ObjectId::parse_hex("0102").is_err());
    }
}

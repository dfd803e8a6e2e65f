//! Artifact format tags.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Wire format of a backup artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Length-prefixed BSON documents, back to back.
    #[default]
    Bson,
    /// One JSON object per line.
    Json,
}

impl Format {
    /// All formats, in display order.
    pub const ALL: [Format; 2] = [Format::Bson, Format::Json];

    /// File extension without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Format::Bson => "bson",
            Format::Json => "json",
        }
    }

    /// Detects the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid format: {0}. Use 'bson' or 'json'")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bson" => Ok(Format::Bson),
            "json" => Ok(Format::Json),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

//! Binary resource index format
//!
//! An index holds a header, a block of qualifier keys and the resource ids
//! declared under them. Two layouts exist:
//!
//! - **eager**: 136-byte header, every key points at its own id block and
//!   all values are decoded in one pass ([`EagerDecoder`])
//! - **lazy**: 140-byte header with a data-block offset, one id table for
//!   all keys, values decoded on first access ([`LazyDecoder`])
//!
//! Both produce the same [`ResourceTable`].

pub mod cursor;
pub mod eager;
pub mod lazy;
pub mod manifest;
pub mod table;
pub mod types;
pub mod writer;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::res_config::ResConfig;

pub use cursor::ByteReader;
pub use eager::EagerDecoder;
pub use lazy::LazyDecoder;
pub use manifest::{IndexManifest, ManifestResource, ManifestValue};
pub use table::{Candidate, LazyValue, ResKey, ResourceTable, TableEntry, ValueHandle};
pub use types::{IdItem, ItemValue, ResType, SelectedTypes};
pub use writer::IndexWriter;

/// Length of the version string at the start of every index.
pub const VERSION_LEN: usize = 128;
/// Eager header: version, length, key count.
pub const EAGER_HEADER_LEN: usize = VERSION_LEN + 8;
/// Lazy header: version, length, key count, data-block offset.
pub const LAZY_HEADER_LEN: usize = VERSION_LEN + 12;

pub const KEYS_TAG: &[u8; 4] = b"KEYS";
pub const IDSS_TAG: &[u8; 4] = b"IDSS";

/// Wire layout of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    Eager,
    Lazy,
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexFormat::Eager => "eager",
            IndexFormat::Lazy => "lazy",
        })
    }
}

impl FromStr for IndexFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eager" | "v1" => Ok(IndexFormat::Eager),
            "lazy" | "v2" => Ok(IndexFormat::Lazy),
            _ => Err(Error::InvalidArgument(format!("unknown index format '{s}'"))),
        }
    }
}

/// Identify the layout from where the first key tag sits.
///
/// A buffer too short to hold a header and its first key tag is an
/// [`Error::AllocationFailure`]; a complete header with no key tag after it
/// is an [`Error::UnknownIndexFormat`].
pub fn detect_format(data: &[u8]) -> Result<IndexFormat> {
    let tag_at = |offset: usize| data.get(offset..offset + 4) == Some(KEYS_TAG.as_slice());
    if tag_at(EAGER_HEADER_LEN) {
        return Ok(IndexFormat::Eager);
    }
    let needed = LAZY_HEADER_LEN + KEYS_TAG.len();
    if data.len() < needed {
        return Err(Error::AllocationFailure {
            requested: needed,
            offset: 0,
            available: data.len(),
        });
    }
    if tag_at(LAZY_HEADER_LEN) {
        Ok(IndexFormat::Lazy)
    } else {
        Err(Error::UnknownIndexFormat(format!(
            "no key block after a {EAGER_HEADER_LEN} or {LAZY_HEADER_LEN} byte header ({} bytes total)",
            data.len()
        )))
    }
}

/// Filters applied while decoding.
///
/// Only the eager layout honours these. The lazy layout decodes nothing
/// but keys and offsets up front, so there is nothing to skip.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Types to decode; items of other types are skipped.
    pub selected_types: SelectedTypes,
    /// Configuration used to skip keys that cannot match.
    pub request: Option<ResConfig>,
    /// Decode every key regardless of locale.
    pub load_all: bool,
    /// Re-decode after a locale change; locale-less keys are already loaded.
    pub is_update: bool,
}

impl DecodeOptions {
    #[must_use]
    pub fn all() -> Self {
        Self {
            load_all: true,
            ..Self::default()
        }
    }
}

/// A decoder for one index layout.
pub trait IndexDecoder: Send + Sync {
    fn format(&self) -> IndexFormat;

    /// Decode `data`. Any structural problem rejects the whole buffer.
    fn decode(&self, data: Arc<[u8]>, options: &DecodeOptions) -> Result<ResourceTable>;
}

/// Decoder for a layout.
#[must_use]
pub fn decoder_for(format: IndexFormat) -> Box<dyn IndexDecoder> {
    match format {
        IndexFormat::Eager => Box::new(EagerDecoder),
        IndexFormat::Lazy => Box::new(LazyDecoder),
    }
}

/// Detect the layout of `data` and decode it.
pub fn decode_index(data: Arc<[u8]>, options: &DecodeOptions) -> Result<ResourceTable> {
    let format = detect_format(&data)?;
    tracing::debug!("Decoding {} byte {} index", data.len(), format);
    decoder_for(format).decode(data, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        let mut eager = vec![0u8; EAGER_HEADER_LEN];
        eager.extend_from_slice(KEYS_TAG);
        assert_eq!(detect_format(&eager).unwrap(), IndexFormat::Eager);

        let mut lazy = vec![0u8; LAZY_HEADER_LEN];
        lazy.extend_from_slice(KEYS_TAG);
        assert_eq!(detect_format(&lazy).unwrap(), IndexFormat::Lazy);

        assert!(matches!(
            detect_format(&[0u8; 64]),
            Err(Error::AllocationFailure { requested: 144, available: 64, .. })
        ));
        assert!(matches!(detect_format(&[0u8; 200]), Err(Error::UnknownIndexFormat(_))));
    }
}

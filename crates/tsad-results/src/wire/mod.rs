//! Versioned binary wire format for result entities.
//!
//! Nodes of differing versions exchange results over this format, so both
//! directions take the peer's [`WireVersion`] explicitly and gate
//! retired/introduced fields on it. Field order is fixed; a writer targeting
//! an old peer must still emit placeholders for retired fields in their
//! original positions, and a reader of old data must consume them to stay
//! positionally aligned.

pub mod reader;
pub mod writer;

pub use reader::WireReader;
pub use writer::WireWriter;

use bytes::{Buf, BufMut};

/// Wire protocol version, ordered.
///
/// Version gates live here so a future breakpoint touches one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireVersion(pub u32);

impl WireVersion {
    /// Oldest version this crate can still read and write.
    pub const BASE: WireVersion = WireVersion(0);

    /// `record_count` and the per-partition max-probability map were dropped
    /// from the stream at this version. Peers below it still expect both.
    pub const LEGACY_FIELDS_PRUNED: WireVersion = WireVersion(1);

    /// `scheduled_events` joined the stream at this version.
    pub const SCHEDULED_EVENTS: WireVersion = WireVersion(2);

    /// What current peers speak.
    pub const CURRENT: WireVersion = WireVersion::SCHEDULED_EVENTS;
}

/// Errors from decoding the binary wire format.
///
/// A version mismatch between writer and reader is not detectable in-band;
/// it surfaces as whichever of these the misaligned bytes happen to produce
/// and must be treated as a fatal protocol violation by the caller.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("unexpected end of input reading {what} ({needed} more bytes required)")]
    UnexpectedEof { what: &'static str, needed: usize },

    #[error("wire string is not valid utf-8")]
    InvalidUtf8,

    #[error("invalid boolean byte [{value}]")]
    InvalidBool { value: u8 },

    #[error("unknown generic value tag [{tag}]")]
    UnknownTag { tag: u8 },

    #[error("timestamp [{millis}] out of representable range")]
    InvalidTimestamp { millis: i64 },
}

/// Result type for wire decode operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Millisecond epoch value off the wire into a concrete timestamp.
pub(crate) fn timestamp_from_millis(millis: i64) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp_millis(millis).ok_or(WireError::InvalidTimestamp { millis })
}

/// Entities that can be decoded from the wire at a given version.
pub trait WireRead: Sized {
    fn read_from<B: Buf>(reader: &mut WireReader<B>, version: WireVersion) -> Result<Self>;
}

/// Entities that can be encoded onto the wire for a given version.
pub trait WireWrite {
    fn write_to<B: BufMut>(&self, writer: &mut WireWriter<B>, version: WireVersion);
}

// Tags for the self-describing "generic value" encoding. Only the empty map
// is ever written by this crate (as a retired-field placeholder), but old
// peers may have written any of these, so the reader skips them all.
pub(crate) const TAG_NULL: u8 = 0;
pub(crate) const TAG_BOOL: u8 = 1;
pub(crate) const TAG_I64: u8 = 2;
pub(crate) const TAG_F64: u8 = 3;
pub(crate) const TAG_STRING: u8 = 4;
pub(crate) const TAG_MAP: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        assert!(WireVersion::BASE < WireVersion::LEGACY_FIELDS_PRUNED);
        assert!(WireVersion::LEGACY_FIELDS_PRUNED < WireVersion::SCHEDULED_EVENTS);
        assert_eq!(WireVersion::CURRENT, WireVersion::SCHEDULED_EVENTS);
    }
}

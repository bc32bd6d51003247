//! TSAD Results Library
//!
//! Result entities produced by the time-series anomaly detection engine and
//! their two serialized forms:
//!
//! - a structured document codec (strict or lenient field handling) used by
//!   the document store, in [`doc`] and on each entity;
//! - a version-gated binary wire codec used between service nodes of
//!   differing versions, in [`wire`].
//!
//! The entities themselves live in [`results`], along with the
//! `is_normalizable` gate consumed by the score-normalization pass.

pub mod doc;
pub mod results;
pub mod wire;

pub use doc::{DocDecode, DocEncode, DocError, ParseMode};
pub use results::{AnomalyRecord, Bucket, BucketInfluencer, PartitionScore};
pub use wire::{WireError, WireRead, WireReader, WireVersion, WireWrite, WireWriter};

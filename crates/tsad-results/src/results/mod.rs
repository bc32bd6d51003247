//! Result entities produced by the anomaly detection engine.
//!
//! Canonical definitions for:
//! - `Bucket`: per-interval analytical result, the unit of normalization
//! - `AnomalyRecord`: individual anomaly attached to a bucket
//! - `BucketInfluencer`: explanation of a bucket's score
//! - `PartitionScore`: per-partition score within a bucket

use chrono::{DateTime, Utc};

pub mod bucket;
pub mod influencer;
pub mod partition;
pub mod record;

pub use bucket::Bucket;
pub use influencer::BucketInfluencer;
pub use partition::PartitionScore;
pub use record::AnomalyRecord;

/// Document field names shared across result entities. Wire-stable contracts;
/// renaming any of these breaks previously stored documents.
pub mod fields {
    pub const JOB_ID: &str = "job_id";
    pub const TIMESTAMP: &str = "timestamp";
    /// Human-readable rendering emitted beside [`TIMESTAMP`]; derived name
    /// (`timestamp` + `_string`).
    pub const TIMESTAMP_STRING: &str = "timestamp_string";
    pub const BUCKET_SPAN: &str = "bucket_span";
    pub const IS_INTERIM: &str = "is_interim";
    pub const RESULT_TYPE: &str = "result_type";
    pub const PROBABILITY: &str = "probability";
    pub const ANOMALY_SCORE: &str = "anomaly_score";
    pub const INITIAL_ANOMALY_SCORE: &str = "initial_anomaly_score";
    pub const RECORD_SCORE: &str = "record_score";
    pub const INITIAL_RECORD_SCORE: &str = "initial_record_score";
}

/// Timestamps are carried at millisecond precision on every wire; entities
/// drop finer precision at construction so round trips compare equal.
pub(crate) fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp.timestamp_millis()).unwrap_or(timestamp)
}

//! Bucket result: the per-interval output of the anomaly detection engine.

use bytes::{Buf, BufMut};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::doc::{self, DocDecode, DocEncode, DocError, ParseMode};
use crate::results::{fields, truncate_to_millis};
use crate::results::{AnomalyRecord, BucketInfluencer, PartitionScore};
use crate::wire::{self, WireRead, WireReader, WireVersion, WireWrite, WireWriter};

/// Result-type tag written into every bucket document, and the marker inside
/// the derived storage key.
pub const RESULT_TYPE_VALUE: &str = "bucket";

/// Field name under which external result pages list buckets.
pub const RESULTS_FIELD: &str = "buckets";

pub const EVENT_COUNT: &str = "event_count";
pub const RECORDS: &str = "records";
pub const BUCKET_INFLUENCERS: &str = "bucket_influencers";
pub const PROCESSING_TIME_MS: &str = "processing_time_ms";
pub const PARTITION_SCORES: &str = "partition_scores";
pub const SCHEDULED_EVENTS: &str = "scheduled_events";

const ENTITY: &str = "bucket";

/// One analyzed interval of a job's time series.
///
/// `job_id`, `timestamp` and `bucket_span` identify the bucket and never
/// change after construction; the engine fills the remaining fields in as
/// scoring completes. A decoded bucket is an ordinary mutable value — callers
/// that treat decoded results as immutable do so by convention, not
/// enforcement.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    job_id: String,
    timestamp: DateTime<Utc>,
    bucket_span: i64,
    pub anomaly_score: f64,
    pub initial_anomaly_score: f64,
    /// Only populated when the bucket was explicitly expanded by an external
    /// query; not part of the stored bucket document.
    pub records: Vec<AnomalyRecord>,
    pub event_count: i64,
    pub is_interim: bool,
    pub bucket_influencers: Vec<BucketInfluencer>,
    pub processing_time_ms: i64,
    pub partition_scores: Vec<PartitionScore>,
    pub scheduled_events: Vec<String>,
}

impl Bucket {
    pub fn new(job_id: String, timestamp: DateTime<Utc>, bucket_span: i64) -> Self {
        Self {
            job_id,
            timestamp: truncate_to_millis(timestamp),
            bucket_span,
            anomaly_score: 0.0,
            initial_anomaly_score: 0.0,
            records: Vec::new(),
            event_count: 0,
            is_interim: false,
            bucket_influencers: Vec::new(),
            processing_time_ms: 0,
            partition_scores: Vec::new(),
            scheduled_events: Vec::new(),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp in milliseconds since the epoch (the internal precision).
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Timestamp in whole seconds since the epoch.
    pub fn epoch(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// Span covered, in seconds.
    pub fn bucket_span(&self) -> i64 {
        self.bucket_span
    }

    /// Storage/lookup key, unique per (job, timestamp, span). Byte-exact
    /// contract with previously stored data.
    pub fn id(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.job_id,
            RESULT_TYPE_VALUE,
            self.timestamp_millis(),
            self.bucket_span
        )
    }

    pub fn add_bucket_influencer(&mut self, influencer: BucketInfluencer) {
        self.bucket_influencers.push(influencer);
    }

    /// Whether the score-normalization pass should visit this bucket.
    ///
    /// A bucket whose own score and every partition record score are zero
    /// cannot change under normalization (a pure re-scaling of positive
    /// scores), so it is skipped as an optimization.
    pub fn is_normalizable(&self) -> bool {
        self.anomaly_score > 0.0
            || self
                .partition_scores
                .iter()
                .any(|score| score.record_score > 0.0)
    }

    /// Record score of the partition with the given field value, or 0.0 when
    /// no such partition exists.
    pub fn partition_anomaly_score(&self, partition_value: &str) -> f64 {
        self.partition_scores
            .iter()
            .find(|score| score.partition_field_value == partition_value)
            .map_or(0.0, |score| score.record_score)
    }

    /// Initial record score of the partition with the given field value, or
    /// 0.0 when no such partition exists.
    pub fn partition_initial_anomaly_score(&self, partition_value: &str) -> f64 {
        self.partition_scores
            .iter()
            .find(|score| score.partition_field_value == partition_value)
            .map_or(0.0, |score| score.initial_record_score)
    }

    /// Encode for a peer speaking `version`.
    pub fn to_wire(&self, version: WireVersion) -> Vec<u8> {
        let mut writer = WireWriter::new(Vec::new());
        self.write_to(&mut writer, version);
        writer.into_inner()
    }

    /// Decode bytes written by a peer speaking `version`.
    pub fn from_wire(bytes: &[u8], version: WireVersion) -> wire::Result<Self> {
        let mut reader = WireReader::new(bytes);
        Bucket::read_from(&mut reader, version)
    }
}

impl DocDecode for Bucket {
    fn from_doc(doc_value: &Value, mode: ParseMode) -> doc::Result<Self> {
        let object = doc_value.as_object().ok_or_else(|| DocError::NotAnObject {
            entity: ENTITY,
            token: doc::token_kind(doc_value),
        })?;

        let mut job_id = None;
        let mut timestamp = None;
        let mut bucket_span = None;
        let mut anomaly_score = 0.0;
        let mut initial_anomaly_score = 0.0;
        let mut records = Vec::new();
        let mut event_count = 0i64;
        let mut is_interim = false;
        let mut bucket_influencers = Vec::new();
        let mut processing_time_ms = 0i64;
        let mut partition_scores = Vec::new();
        let mut scheduled_events = Vec::new();

        for (key, value) in object {
            match key.as_str() {
                fields::JOB_ID => {
                    job_id = Some(doc::expect_str(ENTITY, fields::JOB_ID, value)?);
                }
                fields::TIMESTAMP => {
                    timestamp = Some(doc::decode_timestamp(ENTITY, fields::TIMESTAMP, value)?);
                }
                fields::BUCKET_SPAN => {
                    bucket_span = Some(doc::expect_i64(ENTITY, fields::BUCKET_SPAN, value)?);
                }
                fields::ANOMALY_SCORE => {
                    anomaly_score = doc::expect_f64(ENTITY, fields::ANOMALY_SCORE, value)?;
                }
                fields::INITIAL_ANOMALY_SCORE => {
                    initial_anomaly_score =
                        doc::expect_f64(ENTITY, fields::INITIAL_ANOMALY_SCORE, value)?;
                }
                RECORDS => {
                    records = doc::decode_entity_array(ENTITY, RECORDS, value, mode)?;
                }
                EVENT_COUNT => {
                    event_count = doc::expect_i64(ENTITY, EVENT_COUNT, value)?;
                }
                fields::IS_INTERIM => {
                    is_interim = doc::expect_bool(ENTITY, fields::IS_INTERIM, value)?;
                }
                BUCKET_INFLUENCERS => {
                    bucket_influencers =
                        doc::decode_entity_array(ENTITY, BUCKET_INFLUENCERS, value, mode)?;
                }
                PROCESSING_TIME_MS => {
                    processing_time_ms = doc::expect_i64(ENTITY, PROCESSING_TIME_MS, value)?;
                }
                PARTITION_SCORES => {
                    partition_scores =
                        doc::decode_entity_array(ENTITY, PARTITION_SCORES, value, mode)?;
                }
                SCHEDULED_EVENTS => {
                    scheduled_events = doc::decode_string_array(ENTITY, SCHEDULED_EVENTS, value)?;
                }
                fields::RESULT_TYPE => {
                    // Type discriminator; read and discard.
                    doc::expect_str(ENTITY, fields::RESULT_TYPE, value)?;
                }
                fields::TIMESTAMP_STRING => {
                    // Side channel the writer emits beside the epoch value;
                    // the epoch value is authoritative.
                    doc::expect_str(ENTITY, fields::TIMESTAMP_STRING, value)?;
                }
                _ => doc::on_unknown_field(ENTITY, key, mode)?,
            }
        }

        let missing = |field| DocError::MissingField {
            entity: ENTITY,
            field,
        };
        let mut bucket = Bucket::new(
            job_id.ok_or_else(|| missing(fields::JOB_ID))?,
            timestamp.ok_or_else(|| missing(fields::TIMESTAMP))?,
            bucket_span.ok_or_else(|| missing(fields::BUCKET_SPAN))?,
        );
        bucket.anomaly_score = anomaly_score;
        bucket.initial_anomaly_score = initial_anomaly_score;
        bucket.records = records;
        bucket.event_count = event_count;
        bucket.is_interim = is_interim;
        bucket.bucket_influencers = bucket_influencers;
        bucket.processing_time_ms = processing_time_ms;
        bucket.partition_scores = partition_scores;
        bucket.scheduled_events = scheduled_events;
        Ok(bucket)
    }
}

impl DocEncode for Bucket {
    fn to_doc(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(fields::JOB_ID.to_string(), Value::from(self.job_id.clone()));
        doc.insert(
            fields::TIMESTAMP.to_string(),
            Value::from(self.timestamp_millis()),
        );
        doc.insert(
            fields::TIMESTAMP_STRING.to_string(),
            Value::from(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        doc.insert(
            fields::ANOMALY_SCORE.to_string(),
            Value::from(self.anomaly_score),
        );
        doc.insert(
            fields::BUCKET_SPAN.to_string(),
            Value::from(self.bucket_span),
        );
        doc.insert(
            fields::INITIAL_ANOMALY_SCORE.to_string(),
            Value::from(self.initial_anomaly_score),
        );
        if !self.records.is_empty() {
            doc.insert(
                RECORDS.to_string(),
                Value::Array(self.records.iter().map(DocEncode::to_doc).collect()),
            );
        }
        doc.insert(EVENT_COUNT.to_string(), Value::from(self.event_count));
        doc.insert(fields::IS_INTERIM.to_string(), Value::from(self.is_interim));
        // Influencers are always present, even when empty.
        doc.insert(
            BUCKET_INFLUENCERS.to_string(),
            Value::Array(
                self.bucket_influencers
                    .iter()
                    .map(DocEncode::to_doc)
                    .collect(),
            ),
        );
        doc.insert(
            PROCESSING_TIME_MS.to_string(),
            Value::from(self.processing_time_ms),
        );
        if !self.partition_scores.is_empty() {
            doc.insert(
                PARTITION_SCORES.to_string(),
                Value::Array(
                    self.partition_scores
                        .iter()
                        .map(DocEncode::to_doc)
                        .collect(),
                ),
            );
        }
        if !self.scheduled_events.is_empty() {
            doc.insert(
                SCHEDULED_EVENTS.to_string(),
                Value::Array(
                    self.scheduled_events
                        .iter()
                        .map(|event| Value::from(event.clone()))
                        .collect(),
                ),
            );
        }
        doc.insert(
            fields::RESULT_TYPE.to_string(),
            Value::from(RESULT_TYPE_VALUE),
        );
        Value::Object(doc)
    }
}

impl WireRead for Bucket {
    fn read_from<B: Buf>(reader: &mut WireReader<B>, version: WireVersion) -> wire::Result<Self> {
        let job_id = reader.read_string("bucket job id")?;
        let timestamp = wire::timestamp_from_millis(reader.read_i64("bucket timestamp")?)?;
        let anomaly_score = reader.read_f64("anomaly score")?;
        let bucket_span = reader.read_i64("bucket span")?;
        let initial_anomaly_score = reader.read_f64("initial anomaly score")?;
        if version < WireVersion::LEGACY_FIELDS_PRUNED {
            // Retired record count; consume to stay aligned.
            reader.read_i32("retired record count")?;
        }
        let records = reader.read_seq(version, "records")?;
        let event_count = reader.read_i64("event count")?;
        let is_interim = reader.read_bool("interim flag")?;
        let bucket_influencers = reader.read_seq(version, "bucket influencers")?;
        let processing_time_ms = reader.read_i64("processing time")?;
        if version < WireVersion::LEGACY_FIELDS_PRUNED {
            // Retired per-partition max-probability map; consume to stay aligned.
            reader.skip_generic()?;
        }
        let partition_scores = reader.read_seq(version, "partition scores")?;
        let scheduled_events = if version >= WireVersion::SCHEDULED_EVENTS {
            reader.read_string_seq("scheduled events")?
        } else {
            Vec::new()
        };

        let mut bucket = Bucket::new(job_id, timestamp, bucket_span);
        bucket.anomaly_score = anomaly_score;
        bucket.initial_anomaly_score = initial_anomaly_score;
        bucket.records = records;
        bucket.event_count = event_count;
        bucket.is_interim = is_interim;
        bucket.bucket_influencers = bucket_influencers;
        bucket.processing_time_ms = processing_time_ms;
        bucket.partition_scores = partition_scores;
        bucket.scheduled_events = scheduled_events;
        Ok(bucket)
    }
}

impl WireWrite for Bucket {
    fn write_to<B: BufMut>(&self, writer: &mut WireWriter<B>, version: WireVersion) {
        writer.write_string(&self.job_id);
        writer.write_i64(self.timestamp_millis());
        writer.write_f64(self.anomaly_score);
        writer.write_i64(self.bucket_span);
        writer.write_f64(self.initial_anomaly_score);
        if version < WireVersion::LEGACY_FIELDS_PRUNED {
            // Placeholder for the retired record count.
            writer.write_i32(0);
        }
        writer.write_seq(&self.records, version);
        writer.write_i64(self.event_count);
        writer.write_bool(self.is_interim);
        writer.write_seq(&self.bucket_influencers, version);
        writer.write_i64(self.processing_time_ms);
        if version < WireVersion::LEGACY_FIELDS_PRUNED {
            // Placeholder for the retired per-partition max-probability map.
            writer.write_empty_generic_map();
        }
        writer.write_seq(&self.partition_scores, version);
        if version >= WireVersion::SCHEDULED_EVENTS {
            writer.write_string_seq(&self.scheduled_events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket_at(millis: i64, span: i64) -> Bucket {
        Bucket::new(
            "job1".to_string(),
            DateTime::from_timestamp_millis(millis).unwrap(),
            span,
        )
    }

    #[test]
    fn id_matches_stored_key_format() {
        assert_eq!(bucket_at(60_000, 300).id(), "job1_bucket_60000_300");
    }

    #[test]
    fn epoch_is_whole_seconds() {
        let bucket = bucket_at(60_999, 300);
        assert_eq!(bucket.epoch(), 60);
        assert_eq!(bucket.timestamp_millis(), 60_999);
    }

    #[test]
    fn sub_millisecond_precision_is_dropped_at_construction() {
        let fine = DateTime::from_timestamp_millis(1_000)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(250))
            .unwrap();
        let bucket = Bucket::new("job1".to_string(), fine, 300);
        assert_eq!(bucket.timestamp_millis(), 1_000);
    }

    #[test]
    fn zero_scores_are_not_normalizable() {
        let bucket = bucket_at(0, 300);
        assert!(!bucket.is_normalizable());
    }

    #[test]
    fn positive_anomaly_score_is_normalizable() {
        let mut bucket = bucket_at(0, 300);
        bucket.anomaly_score = 0.1;
        assert!(bucket.is_normalizable());
    }

    #[test]
    fn positive_partition_score_is_normalizable() {
        let mut bucket = bucket_at(0, 300);
        bucket.partition_scores.push(PartitionScore::new(
            "part".to_string(),
            "v1".to_string(),
            2.0,
            5.0,
            0.01,
        ));
        assert!(bucket.is_normalizable());
    }

    #[test]
    fn non_positive_partition_scores_are_not_normalizable() {
        let mut bucket = bucket_at(0, 300);
        bucket.partition_scores.push(PartitionScore::new(
            "part".to_string(),
            "v1".to_string(),
            0.0,
            0.0,
            0.5,
        ));
        assert!(!bucket.is_normalizable());
    }

    #[test]
    fn partition_lookups_fall_back_to_zero() {
        let mut bucket = bucket_at(0, 300);
        bucket.partition_scores.push(PartitionScore::new(
            "part".to_string(),
            "present".to_string(),
            2.5,
            7.5,
            0.01,
        ));
        assert_eq!(bucket.partition_anomaly_score("present"), 7.5);
        assert_eq!(bucket.partition_initial_anomaly_score("present"), 2.5);
        assert_eq!(bucket.partition_anomaly_score("absent"), 0.0);
        assert_eq!(bucket.partition_initial_anomaly_score("absent"), 0.0);
    }

    #[test]
    fn add_bucket_influencer_appends() {
        let mut bucket = bucket_at(0, 300);
        bucket.add_bucket_influencer(BucketInfluencer::new(
            "job1".to_string(),
            bucket.timestamp(),
            300,
        ));
        assert_eq!(bucket.bucket_influencers.len(), 1);
    }
}

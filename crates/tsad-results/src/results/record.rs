//! Individual anomaly record attached to a bucket.

use bytes::{Buf, BufMut};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::doc::{self, DocDecode, DocEncode, DocError, ParseMode};
use crate::results::{fields, truncate_to_millis};
use crate::wire::{self, WireRead, WireReader, WireVersion, WireWrite, WireWriter};

/// Result-type tag written into every record document.
pub const RESULT_TYPE_VALUE: &str = "record";

pub const DETECTOR_INDEX: &str = "detector_index";

const ENTITY: &str = "record";

/// A single anomaly found within a bucket's span.
///
/// Records are not part of the bucket document itself; a bucket only carries
/// them in memory after an external query expanded it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRecord {
    job_id: String,
    timestamp: DateTime<Utc>,
    bucket_span: i64,
    pub detector_index: i32,
    pub probability: f64,
    pub record_score: f64,
    pub initial_record_score: f64,
    pub is_interim: bool,
}

impl AnomalyRecord {
    pub fn new(job_id: String, timestamp: DateTime<Utc>, bucket_span: i64) -> Self {
        Self {
            job_id,
            timestamp: truncate_to_millis(timestamp),
            bucket_span,
            detector_index: 0,
            probability: 0.0,
            record_score: 0.0,
            initial_record_score: 0.0,
            is_interim: false,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Span covered, in seconds.
    pub fn bucket_span(&self) -> i64 {
        self.bucket_span
    }
}

impl DocDecode for AnomalyRecord {
    fn from_doc(doc_value: &Value, mode: ParseMode) -> doc::Result<Self> {
        let object = doc_value.as_object().ok_or_else(|| DocError::NotAnObject {
            entity: ENTITY,
            token: doc::token_kind(doc_value),
        })?;

        let mut job_id = None;
        let mut timestamp = None;
        let mut bucket_span = None;
        let mut detector_index = 0i32;
        let mut probability = 0.0;
        let mut record_score = 0.0;
        let mut initial_record_score = 0.0;
        let mut is_interim = false;

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
                DETECTOR_INDEX => {
                    detector_index = doc::expect_i64(ENTITY, DETECTOR_INDEX, value)? as i32;
                }
                fields::PROBABILITY => {
                    probability = doc::expect_f64(ENTITY, fields::PROBABILITY, value)?;
                }
                fields::RECORD_SCORE => {
                    record_score = doc::expect_f64(ENTITY, fields::RECORD_SCORE, value)?;
                }
                fields::INITIAL_RECORD_SCORE => {
                    initial_record_score =
                        doc::expect_f64(ENTITY, fields::INITIAL_RECORD_SCORE, value)?;
                }
                fields::IS_INTERIM => {
                    is_interim = doc::expect_bool(ENTITY, fields::IS_INTERIM, value)?;
                }
                fields::RESULT_TYPE => {
                    // Type discriminator; read and discard.
                    doc::expect_str(ENTITY, fields::RESULT_TYPE, value)?;
                }
                _ => doc::on_unknown_field(ENTITY, key, mode)?,
            }
        }

        let missing = |field| DocError::MissingField {
            entity: ENTITY,
            field,
        };
        let mut record = AnomalyRecord::new(
            job_id.ok_or_else(|| missing(fields::JOB_ID))?,
            timestamp.ok_or_else(|| missing(fields::TIMESTAMP))?,
            bucket_span.ok_or_else(|| missing(fields::BUCKET_SPAN))?,
        );
        record.detector_index = detector_index;
        record.probability = probability;
        record.record_score = record_score;
        record.initial_record_score = initial_record_score;
        record.is_interim = is_interim;
        Ok(record)
    }
}

impl DocEncode for AnomalyRecord {
    fn to_doc(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            fields::JOB_ID.to_string(),
            Value::from(self.job_id.clone()),
        );
        doc.insert(
            fields::TIMESTAMP.to_string(),
            Value::from(self.timestamp.timestamp_millis()),
        );
        doc.insert(fields::PROBABILITY.to_string(), Value::from(self.probability));
        doc.insert(
            fields::RECORD_SCORE.to_string(),
            Value::from(self.record_score),
        );
        doc.insert(
            fields::INITIAL_RECORD_SCORE.to_string(),
            Value::from(self.initial_record_score),
        );
        doc.insert(
            fields::BUCKET_SPAN.to_string(),
            Value::from(self.bucket_span),
        );
        doc.insert(
            DETECTOR_INDEX.to_string(),
            Value::from(self.detector_index),
        );
        doc.insert(fields::IS_INTERIM.to_string(), Value::from(self.is_interim));
        doc.insert(
            fields::RESULT_TYPE.to_string(),
            Value::from(RESULT_TYPE_VALUE),
        );
        Value::Object(doc)
    }
}

impl WireRead for AnomalyRecord {
    fn read_from<B: Buf>(reader: &mut WireReader<B>, _version: WireVersion) -> wire::Result<Self> {
        let job_id = reader.read_string("record job id")?;
        let timestamp = wire::timestamp_from_millis(reader.read_i64("record timestamp")?)?;
        let bucket_span = reader.read_i64("record bucket span")?;
        let mut record = AnomalyRecord::new(job_id, timestamp, bucket_span);
        record.detector_index = reader.read_i32("detector index")?;
        record.probability = reader.read_f64("record probability")?;
        record.record_score = reader.read_f64("record score")?;
        record.initial_record_score = reader.read_f64("initial record score")?;
        record.is_interim = reader.read_bool("record interim flag")?;
        Ok(record)
    }
}

impl WireWrite for AnomalyRecord {
    fn write_to<B: BufMut>(&self, writer: &mut WireWriter<B>, _version: WireVersion) {
        writer.write_string(&self.job_id);
        writer.write_i64(self.timestamp.timestamp_millis());
        writer.write_i64(self.bucket_span);
        writer.write_i32(self.detector_index);
        writer.write_f64(self.probability);
        writer.write_f64(self.record_score);
        writer.write_f64(self.initial_record_score);
        writer.write_bool(self.is_interim);
    }
}

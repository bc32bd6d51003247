//! Bucket influencer: explains which field contributed to a bucket's score.

use bytes::{Buf, BufMut};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::doc::{self, DocDecode, DocEncode, DocError, ParseMode};
use crate::results::{fields, truncate_to_millis};
use crate::wire::{self, WireRead, WireReader, WireVersion, WireWrite, WireWriter};

/// Result-type tag written into every influencer document.
pub const RESULT_TYPE_VALUE: &str = "bucket_influencer";

pub const INFLUENCER_FIELD_NAME: &str = "influencer_field_name";
pub const RAW_ANOMALY_SCORE: &str = "raw_anomaly_score";

const ENTITY: &str = "bucket_influencer";

/// One influencing field for a bucket, with its share of the anomaly score.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketInfluencer {
    job_id: String,
    timestamp: DateTime<Utc>,
    bucket_span: i64,
    pub influencer_field_name: String,
    pub anomaly_score: f64,
    pub initial_anomaly_score: f64,
    pub raw_anomaly_score: f64,
    pub probability: f64,
    pub is_interim: bool,
}

impl BucketInfluencer {
    pub fn new(job_id: String, timestamp: DateTime<Utc>, bucket_span: i64) -> Self {
        Self {
            job_id,
            timestamp: truncate_to_millis(timestamp),
            bucket_span,
            influencer_field_name: String::new(),
            anomaly_score: 0.0,
            initial_anomaly_score: 0.0,
            raw_anomaly_score: 0.0,
            probability: 0.0,
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

impl DocDecode for BucketInfluencer {
    fn from_doc(doc_value: &Value, mode: ParseMode) -> doc::Result<Self> {
        let object = doc_value.as_object().ok_or_else(|| DocError::NotAnObject {
            entity: ENTITY,
            token: doc::token_kind(doc_value),
        })?;

        let mut job_id = None;
        let mut timestamp = None;
        let mut bucket_span = None;
        let mut influencer_field_name = String::new();
        let mut anomaly_score = 0.0;
        let mut initial_anomaly_score = 0.0;
        let mut raw_anomaly_score = 0.0;
        let mut probability = 0.0;
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
                INFLUENCER_FIELD_NAME => {
                    influencer_field_name =
                        doc::expect_str(ENTITY, INFLUENCER_FIELD_NAME, value)?;
                }
                fields::ANOMALY_SCORE => {
                    anomaly_score = doc::expect_f64(ENTITY, fields::ANOMALY_SCORE, value)?;
                }
                fields::INITIAL_ANOMALY_SCORE => {
                    initial_anomaly_score =
                        doc::expect_f64(ENTITY, fields::INITIAL_ANOMALY_SCORE, value)?;
                }
                RAW_ANOMALY_SCORE => {
                    raw_anomaly_score = doc::expect_f64(ENTITY, RAW_ANOMALY_SCORE, value)?;
                }
                fields::PROBABILITY => {
                    probability = doc::expect_f64(ENTITY, fields::PROBABILITY, value)?;
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
        let mut influencer = BucketInfluencer::new(
            job_id.ok_or_else(|| missing(fields::JOB_ID))?,
            timestamp.ok_or_else(|| missing(fields::TIMESTAMP))?,
            bucket_span.ok_or_else(|| missing(fields::BUCKET_SPAN))?,
        );
        influencer.influencer_field_name = influencer_field_name;
        influencer.anomaly_score = anomaly_score;
        influencer.initial_anomaly_score = initial_anomaly_score;
        influencer.raw_anomaly_score = raw_anomaly_score;
        influencer.probability = probability;
        influencer.is_interim = is_interim;
        Ok(influencer)
    }
}

impl DocEncode for BucketInfluencer {
    fn to_doc(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(fields::JOB_ID.to_string(), Value::from(self.job_id.clone()));
        doc.insert(
            fields::TIMESTAMP.to_string(),
            Value::from(self.timestamp.timestamp_millis()),
        );
        doc.insert(
            INFLUENCER_FIELD_NAME.to_string(),
            Value::from(self.influencer_field_name.clone()),
        );
        doc.insert(
            fields::ANOMALY_SCORE.to_string(),
            Value::from(self.anomaly_score),
        );
        doc.insert(
            fields::INITIAL_ANOMALY_SCORE.to_string(),
            Value::from(self.initial_anomaly_score),
        );
        doc.insert(
            RAW_ANOMALY_SCORE.to_string(),
            Value::from(self.raw_anomaly_score),
        );
        doc.insert(
            fields::PROBABILITY.to_string(),
            Value::from(self.probability),
        );
        doc.insert(
            fields::BUCKET_SPAN.to_string(),
            Value::from(self.bucket_span),
        );
        doc.insert(fields::IS_INTERIM.to_string(), Value::from(self.is_interim));
        doc.insert(
            fields::RESULT_TYPE.to_string(),
            Value::from(RESULT_TYPE_VALUE),
        );
        Value::Object(doc)
    }
}

impl WireRead for BucketInfluencer {
    fn read_from<B: Buf>(reader: &mut WireReader<B>, _version: WireVersion) -> wire::Result<Self> {
        let job_id = reader.read_string("influencer job id")?;
        let timestamp = wire::timestamp_from_millis(reader.read_i64("influencer timestamp")?)?;
        let bucket_span = reader.read_i64("influencer bucket span")?;
        let mut influencer = BucketInfluencer::new(job_id, timestamp, bucket_span);
        influencer.influencer_field_name = reader.read_string("influencer field name")?;
        influencer.anomaly_score = reader.read_f64("influencer anomaly score")?;
        influencer.initial_anomaly_score =
            reader.read_f64("influencer initial anomaly score")?;
        influencer.raw_anomaly_score = reader.read_f64("influencer raw anomaly score")?;
        influencer.probability = reader.read_f64("influencer probability")?;
        influencer.is_interim = reader.read_bool("influencer interim flag")?;
        Ok(influencer)
    }
}

impl WireWrite for BucketInfluencer {
    fn write_to<B: BufMut>(&self, writer: &mut WireWriter<B>, _version: WireVersion) {
        writer.write_string(&self.job_id);
        writer.write_i64(self.timestamp.timestamp_millis());
        writer.write_i64(self.bucket_span);
        writer.write_string(&self.influencer_field_name);
        writer.write_f64(self.anomaly_score);
        writer.write_f64(self.initial_anomaly_score);
        writer.write_f64(self.raw_anomaly_score);
        writer.write_f64(self.probability);
        writer.write_bool(self.is_interim);
    }
}

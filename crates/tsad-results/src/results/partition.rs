//! Per-partition score entry within a bucket.

use bytes::{Buf, BufMut};
use serde_json::{Map, Value};

use crate::doc::{self, DocDecode, DocEncode, DocError, ParseMode};
use crate::results::fields;
use crate::wire::{self, WireRead, WireReader, WireVersion, WireWrite, WireWriter};

pub const PARTITION_FIELD_NAME: &str = "partition_field_name";
pub const PARTITION_FIELD_VALUE: &str = "partition_field_value";

const ENTITY: &str = "partition_score";

/// Score of a single partition inside a bucket. All fields are present in
/// every document; there is no result-type tag and no timestamp of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionScore {
    pub partition_field_name: String,
    pub partition_field_value: String,
    pub initial_record_score: f64,
    pub record_score: f64,
    pub probability: f64,
}

impl PartitionScore {
    pub fn new(
        partition_field_name: String,
        partition_field_value: String,
        initial_record_score: f64,
        record_score: f64,
        probability: f64,
    ) -> Self {
        Self {
            partition_field_name,
            partition_field_value,
            initial_record_score,
            record_score,
            probability,
        }
    }
}

impl DocDecode for PartitionScore {
    fn from_doc(doc_value: &Value, mode: ParseMode) -> doc::Result<Self> {
        let object = doc_value.as_object().ok_or_else(|| DocError::NotAnObject {
            entity: ENTITY,
            token: doc::token_kind(doc_value),
        })?;

        let mut name = None;
        let mut value = None;
        let mut initial_record_score = None;
        let mut record_score = None;
        let mut probability = None;

        for (key, field_value) in object {
            match key.as_str() {
                PARTITION_FIELD_NAME => {
                    name = Some(doc::expect_str(ENTITY, PARTITION_FIELD_NAME, field_value)?);
                }
                PARTITION_FIELD_VALUE => {
                    value = Some(doc::expect_str(ENTITY, PARTITION_FIELD_VALUE, field_value)?);
                }
                fields::INITIAL_RECORD_SCORE => {
                    initial_record_score = Some(doc::expect_f64(
                        ENTITY,
                        fields::INITIAL_RECORD_SCORE,
                        field_value,
                    )?);
                }
                fields::RECORD_SCORE => {
                    record_score =
                        Some(doc::expect_f64(ENTITY, fields::RECORD_SCORE, field_value)?);
                }
                fields::PROBABILITY => {
                    probability =
                        Some(doc::expect_f64(ENTITY, fields::PROBABILITY, field_value)?);
                }
                _ => doc::on_unknown_field(ENTITY, key, mode)?,
            }
        }

        let missing = |field| DocError::MissingField {
            entity: ENTITY,
            field,
        };
        Ok(Self {
            partition_field_name: name.ok_or_else(|| missing(PARTITION_FIELD_NAME))?,
            partition_field_value: value.ok_or_else(|| missing(PARTITION_FIELD_VALUE))?,
            initial_record_score: initial_record_score
                .ok_or_else(|| missing(fields::INITIAL_RECORD_SCORE))?,
            record_score: record_score.ok_or_else(|| missing(fields::RECORD_SCORE))?,
            probability: probability.ok_or_else(|| missing(fields::PROBABILITY))?,
        })
    }
}

impl DocEncode for PartitionScore {
    fn to_doc(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            PARTITION_FIELD_NAME.to_string(),
            Value::from(self.partition_field_name.clone()),
        );
        doc.insert(
            PARTITION_FIELD_VALUE.to_string(),
            Value::from(self.partition_field_value.clone()),
        );
        doc.insert(
            fields::INITIAL_RECORD_SCORE.to_string(),
            Value::from(self.initial_record_score),
        );
        doc.insert(
            fields::RECORD_SCORE.to_string(),
            Value::from(self.record_score),
        );
        doc.insert(
            fields::PROBABILITY.to_string(),
            Value::from(self.probability),
        );
        Value::Object(doc)
    }
}

impl WireRead for PartitionScore {
    fn read_from<B: Buf>(reader: &mut WireReader<B>, _version: WireVersion) -> wire::Result<Self> {
        Ok(Self {
            partition_field_name: reader.read_string("partition field name")?,
            partition_field_value: reader.read_string("partition field value")?,
            initial_record_score: reader.read_f64("initial record score")?,
            record_score: reader.read_f64("record score")?,
            probability: reader.read_f64("probability")?,
        })
    }
}

impl WireWrite for PartitionScore {
    fn write_to<B: BufMut>(&self, writer: &mut WireWriter<B>, _version: WireVersion) {
        writer.write_string(&self.partition_field_name);
        writer.write_string(&self.partition_field_value);
        writer.write_f64(self.initial_record_score);
        writer.write_f64(self.record_score);
        writer.write_f64(self.probability);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PartitionScore {
        PartitionScore::new(
            "region".to_string(),
            "eu-west".to_string(),
            12.5,
            9.75,
            0.001,
        )
    }

    #[test]
    fn doc_roundtrip() {
        let score = sample();
        let doc = score.to_doc();
        let decoded = PartitionScore::from_doc(&doc, ParseMode::Strict).unwrap();
        assert_eq!(decoded, score);
    }

    #[test]
    fn missing_required_field_fails() {
        let doc = json!({
            "partition_field_name": "region",
            "partition_field_value": "eu-west",
            "record_score": 1.0,
            "probability": 0.5,
        });
        let err = PartitionScore::from_doc(&doc, ParseMode::Strict).unwrap_err();
        assert!(matches!(
            err,
            DocError::MissingField {
                field: "initial_record_score",
                ..
            }
        ));
    }

    #[test]
    fn wire_roundtrip() {
        let score = sample();
        let mut writer = WireWriter::new(Vec::new());
        score.write_to(&mut writer, WireVersion::CURRENT);
        let buf = writer.into_inner();

        let mut reader = WireReader::new(&buf[..]);
        let decoded = PartitionScore::read_from(&mut reader, WireVersion::CURRENT).unwrap();
        assert_eq!(decoded, score);
    }
}

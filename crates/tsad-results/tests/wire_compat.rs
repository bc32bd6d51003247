use chrono::DateTime;
use tsad_results::{
    AnomalyRecord, Bucket, BucketInfluencer, PartitionScore, WireError, WireVersion,
};

/// Bucket exercising every wire field, scheduled events included.
fn full_bucket() -> Bucket {
    let timestamp = DateTime::from_timestamp_millis(1_478_261_151_000).unwrap();
    let mut bucket = Bucket::new("farequote".to_string(), timestamp, 600);
    bucket.anomaly_score = 88.0;
    bucket.initial_anomaly_score = 42.0;
    bucket.event_count = 1_693;
    bucket.is_interim = true;
    bucket.processing_time_ms = 17;

    let mut record = AnomalyRecord::new("farequote".to_string(), timestamp, 600);
    record.detector_index = 1;
    record.record_score = 90.1;
    bucket.records.push(record);

    let mut influencer = BucketInfluencer::new("farequote".to_string(), timestamp, 600);
    influencer.influencer_field_name = "airline".to_string();
    influencer.anomaly_score = 88.0;
    bucket.add_bucket_influencer(influencer);

    bucket.partition_scores.push(PartitionScore::new(
        "airline".to_string(),
        "AAL".to_string(),
        51.0,
        63.5,
        0.000_4,
    ));
    bucket
        .scheduled_events
        .push("maintenance_window".to_string());
    bucket
}

fn without_scheduled_events(mut bucket: Bucket) -> Bucket {
    bucket.scheduled_events.clear();
    bucket
}

// ── Same-version round trips ────────────────────────────────────────────

#[test]
fn roundtrip_at_current_preserves_everything() {
    let bucket = full_bucket();
    let bytes = bucket.to_wire(WireVersion::CURRENT);
    let decoded = Bucket::from_wire(&bytes, WireVersion::CURRENT).unwrap();
    assert_eq!(decoded, bucket);
}

#[test]
fn roundtrip_at_scheduled_events_boundary_preserves_everything() {
    let bucket = full_bucket();
    let bytes = bucket.to_wire(WireVersion::SCHEDULED_EVENTS);
    let decoded = Bucket::from_wire(&bytes, WireVersion::SCHEDULED_EVENTS).unwrap();
    assert_eq!(decoded, bucket);
}

#[test]
fn roundtrip_at_pruned_boundary_loses_only_scheduled_events() {
    let bucket = full_bucket();
    let bytes = bucket.to_wire(WireVersion::LEGACY_FIELDS_PRUNED);
    let decoded = Bucket::from_wire(&bytes, WireVersion::LEGACY_FIELDS_PRUNED).unwrap();
    assert_eq!(decoded, without_scheduled_events(bucket));
}

#[test]
fn roundtrip_at_base_loses_only_scheduled_events() {
    let bucket = full_bucket();
    let bytes = bucket.to_wire(WireVersion::BASE);
    let decoded = Bucket::from_wire(&bytes, WireVersion::BASE).unwrap();
    assert_eq!(decoded, without_scheduled_events(bucket));
}

// ── Version gates ───────────────────────────────────────────────────────

#[test]
fn pre_v2_loss_of_scheduled_events_is_by_design() {
    // Old peers have no field position for scheduled events; they decode to
    // empty no matter what the newer writer held.
    let bucket = full_bucket();
    assert!(!bucket.scheduled_events.is_empty());

    let bytes = bucket.to_wire(WireVersion::LEGACY_FIELDS_PRUNED);
    let decoded = Bucket::from_wire(&bytes, WireVersion::LEGACY_FIELDS_PRUNED).unwrap();
    assert!(decoded.scheduled_events.is_empty());
}

#[test]
fn base_encoding_carries_retired_placeholders() {
    let bucket = without_scheduled_events(full_bucket());
    let pruned = bucket.to_wire(WireVersion::LEGACY_FIELDS_PRUNED);
    let base = bucket.to_wire(WireVersion::BASE);
    // i32 zero (4 bytes) plus empty generic map (tag + u32 count = 5 bytes).
    assert_eq!(base.len(), pruned.len() + 9);
}

#[test]
fn scheduled_events_add_bytes_only_at_v2() {
    let bucket = without_scheduled_events(full_bucket());
    let pruned = bucket.to_wire(WireVersion::LEGACY_FIELDS_PRUNED);
    let current = bucket.to_wire(WireVersion::CURRENT);
    // Empty sequence still writes its u32 count at V2.
    assert_eq!(current.len(), pruned.len() + 4);
}

// ── Corrupt and truncated input ─────────────────────────────────────────

#[test]
fn truncated_stream_reports_eof() {
    let bytes = full_bucket().to_wire(WireVersion::CURRENT);
    let err = Bucket::from_wire(&bytes[..bytes.len() / 2], WireVersion::CURRENT).unwrap_err();
    assert!(matches!(err, WireError::UnexpectedEof { .. }));
}

#[test]
fn empty_input_reports_eof() {
    assert!(matches!(
        Bucket::from_wire(&[], WireVersion::CURRENT),
        Err(WireError::UnexpectedEof { .. })
    ));
}

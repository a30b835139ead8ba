//! Unit tests for ingest timestamp resolution and the setpoints projection.
//!
//! Run with: cargo test --test ingest_unit_test

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use envhub::entity::nodes;
use envhub::error::AppError;
use envhub::routes::ingest::{
    resolve_ingest_datetime, IngestDatetime, SetpointsResponse, BACKUP_UTC_OFFSET_SECONDS,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
}

#[test]
fn live_readings_default_to_arrival_time() {
    let resolved = resolve_ingest_datetime(None, None, now()).unwrap();
    assert_eq!(resolved, now());

    // Anything but the exact flag value counts as live
    let resolved = resolve_ingest_datetime(Some("0"), None, now()).unwrap();
    assert_eq!(resolved, now());
}

#[test]
fn live_readings_honor_reported_timestamps() {
    // RFC 3339, offset normalized to UTC
    let resolved = resolve_ingest_datetime(
        None,
        Some(&IngestDatetime::Text("2026-01-15T06:30:00+05:30".to_string())),
        now(),
    )
    .unwrap();
    assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 1, 15, 1, 0, 0).unwrap());

    // Bare epoch seconds, no timezone correction
    let resolved =
        resolve_ingest_datetime(None, Some(&IngestDatetime::Number(1_700_000_000)), now()).unwrap();
    assert_eq!(resolved.timestamp(), 1_700_000_000);
}

#[test]
fn unparseable_live_timestamps_fall_back_to_arrival() {
    let resolved = resolve_ingest_datetime(
        None,
        Some(&IngestDatetime::Text("last tuesday".to_string())),
        now(),
    )
    .unwrap();
    assert_eq!(resolved, now());
}

#[test]
fn backup_readings_shift_device_clock_to_utc() {
    let device_seconds = 1_700_000_000;

    let resolved = resolve_ingest_datetime(
        Some("1"),
        Some(&IngestDatetime::Number(device_seconds)),
        now(),
    )
    .unwrap();

    assert_eq!(
        resolved.timestamp(),
        device_seconds - BACKUP_UTC_OFFSET_SECONDS
    );
    assert_eq!(resolved.timestamp(), device_seconds - 19_800);
}

#[test]
fn backup_accepts_stringly_typed_timestamps() {
    let resolved = resolve_ingest_datetime(
        Some("1"),
        Some(&IngestDatetime::Text(" 1700000000 ".to_string())),
        now(),
    )
    .unwrap();

    assert_eq!(resolved.timestamp(), 1_700_000_000 - 19_800);
}

#[test]
fn backup_without_usable_datetime_is_rejected() {
    assert!(resolve_ingest_datetime(Some("1"), None, now()).is_err());
    assert!(
        resolve_ingest_datetime(
            Some("1"),
            Some(&IngestDatetime::Text("yesterday".to_string())),
            now()
        )
        .is_err()
    );

    // Epoch extremes are rejected, not overflowed past the device-clock shift
    for seconds in [i64::MIN, i64::MAX] {
        let result =
            resolve_ingest_datetime(Some("1"), Some(&IngestDatetime::Number(seconds)), now());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}

fn node_with_ranges() -> nodes::Model {
    nodes::Model {
        id: Uuid::nil(),
        uid: "sensor-1".to_string(),
        location: "iiser-p".to_string(),
        machine_name: "Lab 3 monitor".to_string(),
        owner: "alice".to_string(),
        is_temperature: Some(true),
        is_humidity: None,
        is_co2: Some(true),
        temperature_min: Some(18.0),
        temperature_max: Some(27.5),
        humidity_min: None,
        humidity_max: Some(70.0),
        co2_min: None,
        co2_max: Some(1200.0),
        created_at: None,
    }
}

#[test]
fn setpoints_project_node_ranges() {
    let node = node_with_ranges();
    let setpoints = SetpointsResponse::for_node(Some(&node));

    assert_eq!(setpoints.temperaturemin, Some(18.0));
    assert_eq!(setpoints.temperaturemax, Some(27.5));
    assert_eq!(setpoints.humiditymin, None);
    assert_eq!(setpoints.humiditymax, Some(70.0));
    assert_eq!(setpoints.co2min, None);
    assert_eq!(setpoints.co2max, Some(1200.0));
}

#[test]
fn unknown_node_yields_all_null_setpoints() {
    let setpoints = SetpointsResponse::for_node(None);
    let value = serde_json::to_value(setpoints).unwrap();

    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 6);
    for key in [
        "co2min",
        "co2max",
        "temperaturemin",
        "temperaturemax",
        "humiditymin",
        "humiditymax",
    ] {
        assert!(object[key].is_null(), "{key} should be null");
    }
}

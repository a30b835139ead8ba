use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::common::AppState;
use crate::entity::{nodes, readings};
use crate::error::{AppError, AppResult};
use crate::services::notify;

/// Offset between the device fleet's local clock (UTC+05:30) and UTC,
/// applied to backfilled batch timestamps.
pub const BACKUP_UTC_OFFSET_SECONDS: i64 = 19_800;

/// Timestamp as devices report it: some firmware revisions emit a JSON
/// number (epoch seconds), others a string (epoch seconds or RFC 3339).
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum IngestDatetime {
    Number(i64),
    Text(String),
}

impl IngestDatetime {
    fn epoch_seconds(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Device ingest payload. Unknown fields are tolerated so firmware can ship
/// extra diagnostics without breaking older servers.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestBody {
    pub uid: Option<String>,
    pub user: Option<String>,
    /// "1" marks an offline-buffered batch whose datetime is epoch seconds
    /// in device-local time
    pub backup: Option<String>,
    pub datetime: Option<IngestDatetime>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestAck {
    pub msg: String,
}

/// Resolves the stored timestamp for an ingested reading.
///
/// Backfilled batches (`backup == "1"`) carry `datetime` as epoch seconds in
/// the device's local clock, 19800 seconds ahead of UTC; the offset is
/// subtracted before storing, and a batch without a usable number is
/// rejected. Live readings may report an RFC 3339 instant or bare epoch
/// seconds; anything else is stamped with the arrival time.
pub fn resolve_ingest_datetime(
    backup: Option<&str>,
    datetime: Option<&IngestDatetime>,
    now: DateTime<Utc>,
) -> AppResult<DateTime<Utc>> {
    if backup == Some("1") {
        let seconds = datetime.and_then(IngestDatetime::epoch_seconds).ok_or_else(|| {
            AppError::Validation("Backup readings need a numeric datetime".to_string())
        })?;

        return seconds
            .checked_sub(BACKUP_UTC_OFFSET_SECONDS)
            .and_then(|shifted| DateTime::from_timestamp(shifted, 0))
            .ok_or_else(|| AppError::Validation(format!("Backup datetime out of range: {seconds}")));
    }

    let reported = match datetime {
        Some(IngestDatetime::Number(seconds)) => DateTime::from_timestamp(*seconds, 0),
        Some(IngestDatetime::Text(text)) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        None => None,
    };

    Ok(reported.unwrap_or(now))
}

/// Append a reading
///
/// Unauthenticated device ingest. The reading is stored as reported; node
/// existence is not checked, so devices can buffer data before registration.
#[utoipa::path(
    post,
    path = "/write/reading",
    request_body = IngestBody,
    responses(
        (status = 201, description = "Reading stored", body = IngestAck),
        (status = 400, description = "Malformed payload"),
    ),
    tag = "ingest"
)]
pub async fn append_reading(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<(StatusCode, Json<IngestAck>)> {
    let body: IngestBody =
        serde_json::from_value(payload).map_err(|e| AppError::Validation(e.to_string()))?;

    let uid = body
        .uid
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| AppError::Validation("uid is required".to_string()))?;
    let datetime =
        resolve_ingest_datetime(body.backup.as_deref(), body.datetime.as_ref(), Utc::now())?;

    let reading = readings::ActiveModel {
        uid: Set(uid),
        owner: Set(body.user),
        datetime: Set(datetime.into()),
        pressure: Set(body.pressure),
        humidity: Set(body.humidity),
        co2: Set(body.co2),
        temperature: Set(body.temperature),
        ..Default::default()
    };
    let saved = reading.insert(&*state.db).await?;

    // Setpoint check runs off the hot path; ingest never waits on mail
    if let Some(mailer) = state.mailer.clone() {
        let db = state.db.clone();
        let window_hours = state.config.mail_alert_window_hours;
        tokio::spawn(async move {
            if let Err(err) = notify::check_reading(&db, &mailer, &saved, window_hours).await {
                tracing::warn!(error = %err, "Fault notification failed");
            }
        });
    }

    Ok((
        StatusCode::CREATED,
        Json(IngestAck {
            msg: "OK".to_string(),
        }),
    ))
}

/// Threshold ranges for one node, flattened for firmware consumption.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct SetpointsResponse {
    pub co2min: Option<f64>,
    pub co2max: Option<f64>,
    pub temperaturemin: Option<f64>,
    pub temperaturemax: Option<f64>,
    pub humiditymin: Option<f64>,
    pub humiditymax: Option<f64>,
}

impl SetpointsResponse {
    /// Projection of a node's alert ranges. A missing node yields the
    /// all-null response; devices cannot distinguish "unknown node" from "no
    /// thresholds configured", and do not need to.
    #[must_use]
    pub fn for_node(node: Option<&nodes::Model>) -> Self {
        match node {
            Some(node) => Self {
                co2min: node.co2_min,
                co2max: node.co2_max,
                temperaturemin: node.temperature_min,
                temperaturemax: node.temperature_max,
                humiditymin: node.humidity_min,
                humiditymax: node.humidity_max,
            },
            None => Self::default(),
        }
    }
}

fn json_bytes_response(bytes: Vec<u8>) -> AppResult<Response> {
    Response::builder()
        .header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Setpoints for a node
///
/// Unauthenticated threshold lookup polled by the devices themselves. An
/// unknown uid answers 200 with all-null fields rather than 404.
#[utoipa::path(
    get,
    path = "/write/setpoints/{uid}",
    params(
        ("uid" = String, Path, description = "Node uid"),
    ),
    responses(
        (status = 200, description = "Threshold ranges, all null when unknown", body = SetpointsResponse),
    ),
    tag = "ingest"
)]
pub async fn get_setpoints(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Response> {
    if let Some(cached) = state.setpoints_cache.get(&uid).await {
        return json_bytes_response(cached.to_vec());
    }

    let node = nodes::Entity::find()
        .filter(nodes::Column::Uid.eq(&uid))
        .one(&*state.db)
        .await?;

    let response = SetpointsResponse::for_node(node.as_ref());
    let bytes = serde_json::to_vec(&response).map_err(|e| AppError::Internal(e.to_string()))?;

    state
        .setpoints_cache
        .insert(uid, Arc::new(bytes.clone()))
        .await;

    json_bytes_response(bytes)
}

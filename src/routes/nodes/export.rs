use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::Response,
};
use chrono::Utc;
use futures::TryStreamExt;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::io;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_stream::wrappers::ReceiverStream;

use crate::common::AppState;
use crate::entity::readings;
use crate::error::{AppError, AppResult};

/// Global semaphore limiting concurrent CSV exports.
/// The export endpoint is unauthenticated, so this caps how much load bulk
/// pulls can put on the database.
/// Configurable via EXPORT_CONCURRENT_LIMIT env var (default: 5).
static EXPORT_SEMAPHORE: std::sync::LazyLock<Arc<Semaphore>> = std::sync::LazyLock::new(|| {
    let limit = std::env::var("EXPORT_CONCURRENT_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5);
    Arc::new(Semaphore::new(limit))
});

pub const CSV_HEADER: &str = "uid,user,datetime,pressure,humidity,co2,temperature\n";

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Fields of one export row, in header order. Missing values become empty
/// fields.
#[must_use]
pub fn csv_record(reading: &readings::Model) -> [String; 7] {
    [
        reading.uid.clone(),
        reading.owner.clone().unwrap_or_default(),
        reading.datetime.with_timezone(&Utc).to_rfc3339(),
        optional_number(reading.pressure),
        optional_number(reading.humidity),
        optional_number(reading.co2),
        optional_number(reading.temperature),
    ]
}

/// One encoded CSV line with quoting applied, newline included.
pub fn csv_line(record: &[String]) -> io::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(record).map_err(io::Error::other)?;
    let bytes = writer.into_inner().map_err(io::Error::other)?;
    String::from_utf8(bytes).map_err(io::Error::other)
}

/// Export a node's readings as CSV
///
/// Streams every reading for the uid in chronological order. Rows are
/// produced lazily as they come back from the database, so exports of large
/// histories do not buffer in memory. An unknown uid yields a header-only
/// file.
#[utoipa::path(
    get,
    path = "/node/getcsv/{uid}",
    params(
        ("uid" = String, Path, description = "Node uid"),
    ),
    responses(
        (status = 200, description = "CSV stream of readings for the uid"),
        (status = 503, description = "Too many concurrent exports"),
    ),
    tag = "nodes"
)]
pub async fn export_csv(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Response> {
    let permit = match EXPORT_SEMAPHORE.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!(uid = %uid, "export_rejected");
            return Err(AppError::ServiceUnavailable(
                "Too many concurrent exports. Please try again later.".to_string(),
            ));
        }
    };

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, io::Error>>(100);

    let db = state.db.clone();
    let stream_uid = uid.clone();
    tokio::spawn(async move {
        // The permit covers the whole stream, not just the handler
        let _permit = permit;

        if tx.send(Ok(CSV_HEADER.to_string())).await.is_err() {
            return;
        }

        let rows = readings::Entity::find()
            .filter(readings::Column::Uid.eq(&stream_uid))
            .order_by_asc(readings::Column::Datetime)
            .order_by_asc(readings::Column::Id)
            .stream(&*db)
            .await;

        let mut rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                let _ = tx.send(Err(io::Error::other(err))).await;
                return;
            }
        };

        loop {
            match rows.try_next().await {
                Ok(Some(reading)) => {
                    let line = match csv_line(&csv_record(&reading)) {
                        Ok(line) => line,
                        Err(err) => {
                            let _ = tx.send(Err(err)).await;
                            return;
                        }
                    };
                    // A failed send means the client went away; stop reading
                    if tx.send(Ok(line)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => return,
                Err(err) => {
                    let _ = tx.send(Err(io::Error::other(err))).await;
                    return;
                }
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    let body = Body::from_stream(stream);

    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"data.{uid}.csv\""),
        )
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

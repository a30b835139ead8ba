use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

/// Health check endpoint
///
/// Returns 200 OK if the service is running.
/// This endpoint is not rate-limited and suitable for Kubernetes probes.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "health"
)]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    pub version: String,
}

/// Running service version
///
/// Dashboards poll this to detect deploys.
#[utoipa::path(
    get,
    path = "/version",
    responses(
        (status = 200, description = "Version of the running service", body = VersionResponse),
    ),
    tag = "health"
)]
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub mod health;
pub mod ingest;
pub mod nodes;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::auth::require_principal;
use crate::common::AppState;
use crate::services::rate_limit::ClientIpKeyExtractor;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        health::version,
        nodes::list_nodes,
        nodes::latest_reading,
        nodes::all_readings,
        nodes::register_node,
        nodes::modify_node,
        nodes::delete_node,
        nodes::export_csv,
        ingest::append_reading,
        ingest::get_setpoints,
    ),
    components(
        schemas(
            health::VersionResponse,
            nodes::NodeResponse,
            nodes::ReadingResponse,
            nodes::SensorRange,
            nodes::RegisterNodeBody,
            nodes::ModifyNodeBody,
            nodes::RegisteredResponse,
            nodes::ModifiedResponse,
            nodes::DeleteResponse,
            ingest::IngestBody,
            ingest::IngestDatetime,
            ingest::IngestAck,
            ingest::SetpointsResponse,
        )
    ),
    tags(
        (name = "health", description = "Health and version endpoints"),
        (name = "nodes", description = "Node registry and reading queries"),
        (name = "ingest", description = "Unauthenticated device ingest"),
    ),
    info(
        title = "EnvHub API",
        description = "Telemetry ingestion and node registry for environmental sensor fleets",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
    } else {
        tracing::info!(
            api_rate = %format!("{}/s burst {}", config.rate_limit_api_per_second, config.rate_limit_api_burst),
            ingest_rate = %format!("{}/s burst {}", config.rate_limit_ingest_per_second, config.rate_limit_ingest_burst),
            export_concurrent = config.export_concurrent_limit,
            "Rate limiting configured"
        );
    }

    // Dashboard routes behind token auth
    let node_routes_base = Router::new()
        .route("/", get(nodes::list_nodes))
        .route("/readings/{uid}", get(nodes::latest_reading))
        .route("/readings/all/{uid}", get(nodes::all_readings))
        .route("/add", post(nodes::register_node))
        .route("/modify", post(nodes::modify_node))
        .route("/{uid}", delete(nodes::delete_node))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_principal,
        ))
        // CSV export stays public; download links are shared outside the dashboard
        .route("/getcsv/{uid}", get(nodes::export_csv));

    let ingest_routes_base = Router::new()
        .route("/reading", post(ingest::append_reading))
        .route("/setpoints/{uid}", get(ingest::get_setpoints));

    // Combine API routes, conditionally applying rate limiting
    let api_routes = if config.disable_rate_limiting {
        Router::new()
            .nest("/node", node_routes_base)
            .nest("/write", ingest_routes_base)
    } else {
        let api_limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor)
            .per_second(config.rate_limit_api_per_second)
            .burst_size(config.rate_limit_api_burst)
            .finish()
            .expect("Failed to create API rate limiter");

        let ingest_limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor)
            .per_second(config.rate_limit_ingest_per_second)
            .burst_size(config.rate_limit_ingest_burst)
            .finish()
            .expect("Failed to create ingest rate limiter");

        Router::new()
            .nest(
                "/node",
                node_routes_base.layer(GovernorLayer {
                    config: Arc::new(api_limiter),
                }),
            )
            .nest(
                "/write",
                ingest_routes_base.layer(GovernorLayer {
                    config: Arc::new(ingest_limiter),
                }),
            )
    }
    .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    // Health and version routes (NO rate limiting)
    let health_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/version", get(health::version));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Combine all routes
    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

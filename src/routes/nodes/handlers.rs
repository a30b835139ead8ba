use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::auth::Principal;
use crate::common::AppState;
use crate::entity::{nodes, readings};
use crate::error::{AppError, AppResult};

use super::types::{
    DeleteResponse, ModifiedResponse, ModifyNodeBody, NodeResponse, ReadingResponse,
    RegisterNodeBody, RegisteredResponse,
};

/// Resolve a node by uid within the principal's visibility scope.
async fn resolve_scoped_node(
    db: &DatabaseConnection,
    principal: &Principal,
    uid: &str,
) -> AppResult<nodes::Model> {
    nodes::Entity::find()
        .filter(principal.scope().condition())
        .filter(nodes::Column::Uid.eq(uid))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Node '{uid}' not found")))
}

fn map_duplicate_uid(err: sea_orm::DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Validation("A node with this uid already exists".to_string())
        }
        _ => AppError::Database(err),
    }
}

/// List nodes visible to the caller
///
/// Institute tiers see every node at their institute; everyone else sees
/// only the nodes they own.
#[utoipa::path(
    get,
    path = "/node/",
    responses(
        (status = 200, description = "Nodes retrieved successfully", body = Vec<NodeResponse>),
        (status = 401, description = "Missing or invalid token"),
    ),
    tag = "nodes"
)]
pub async fn list_nodes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<Json<Vec<NodeResponse>>> {
    let nodes_list = nodes::Entity::find()
        .filter(principal.scope().condition())
        .order_by_asc(nodes::Column::Uid)
        .all(&*state.db)
        .await?;

    let response: Vec<NodeResponse> = nodes_list.into_iter().map(NodeResponse::from).collect();

    Ok(Json(response))
}

/// Latest reading for a node
///
/// Returns the most recent reading by timestamp; ties broken by insertion
/// order.
#[utoipa::path(
    get,
    path = "/node/readings/{uid}",
    params(
        ("uid" = String, Path, description = "Node uid"),
    ),
    responses(
        (status = 200, description = "Latest reading retrieved successfully", body = ReadingResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "No readings recorded for this uid"),
    ),
    tag = "nodes"
)]
pub async fn latest_reading(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<ReadingResponse>> {
    let reading = readings::Entity::find()
        .filter(readings::Column::Uid.eq(&uid))
        .order_by_desc(readings::Column::Datetime)
        .order_by_asc(readings::Column::Id)
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No readings for node '{uid}'")))?;

    Ok(Json(reading.into()))
}

/// All readings for a node
///
/// Returns the node's full history in chronological order.
#[utoipa::path(
    get,
    path = "/node/readings/all/{uid}",
    params(
        ("uid" = String, Path, description = "Node uid"),
    ),
    responses(
        (status = 200, description = "Readings retrieved successfully", body = Vec<ReadingResponse>),
        (status = 401, description = "Missing or invalid token"),
    ),
    tag = "nodes"
)]
pub async fn all_readings(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<Vec<ReadingResponse>>> {
    let readings_list = readings::Entity::find()
        .filter(readings::Column::Uid.eq(&uid))
        .order_by_asc(readings::Column::Datetime)
        .order_by_asc(readings::Column::Id)
        .all(&*state.db)
        .await?;

    let response: Vec<ReadingResponse> = readings_list
        .into_iter()
        .map(ReadingResponse::from)
        .collect();

    Ok(Json(response))
}

/// Register a new node
///
/// Creates the node together with an empty seed reading in one transaction.
/// The owning user is taken from the token, never from the body.
#[utoipa::path(
    post,
    path = "/node/add",
    request_body = RegisterNodeBody,
    responses(
        (status = 201, description = "Node registered", body = RegisteredResponse),
        (status = 400, description = "Malformed body or duplicate uid"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller may not change nodes"),
    ),
    tag = "nodes"
)]
pub async fn register_node(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<(StatusCode, Json<RegisteredResponse>)> {
    if !principal.can_mutate_nodes() {
        return Err(AppError::Forbidden(
            "You are not allowed to change nodes".to_string(),
        ));
    }

    let body: RegisterNodeBody =
        serde_json::from_value(payload).map_err(|e| AppError::Validation(e.to_string()))?;

    let now = Utc::now();
    let node = nodes::ActiveModel {
        id: Set(Uuid::new_v4()),
        uid: Set(body.uid.clone()),
        location: Set(body.location),
        machine_name: Set(body.machine_name),
        owner: Set(principal.username.clone()),
        is_temperature: Set(body.is_temp),
        is_humidity: Set(body.is_hum),
        is_co2: Set(body.is_co2),
        temperature_min: Set(body.temperature_range.and_then(|r| r.min)),
        temperature_max: Set(body.temperature_range.and_then(|r| r.max)),
        humidity_min: Set(body.humidity_range.and_then(|r| r.min)),
        humidity_max: Set(body.humidity_range.and_then(|r| r.max)),
        co2_min: Set(body.co2_range.and_then(|r| r.min)),
        co2_max: Set(body.co2_range.and_then(|r| r.max)),
        created_at: Set(Some(now.into())),
    };

    let seed = readings::ActiveModel {
        uid: Set(body.uid),
        owner: Set(Some(principal.username.clone())),
        datetime: Set(now.into()),
        ..Default::default()
    };

    // One transaction so a failed seed insert cannot leave an orphaned node
    let txn = state.db.begin().await?;
    let node = node.insert(&txn).await.map_err(map_duplicate_uid)?;
    let reading = seed.insert(&txn).await?;
    txn.commit().await?;

    state.setpoints_cache.invalidate(&node.uid).await;
    tracing::info!(uid = %node.uid, user = %node.owner, "Registered node");

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            node: node.into(),
            reading: reading.into(),
        }),
    ))
}

/// Modify a registered node
///
/// Applies a partial update to a node the caller can see. Fields absent from
/// the body stay untouched; unknown fields are rejected.
#[utoipa::path(
    post,
    path = "/node/modify",
    request_body = ModifyNodeBody,
    responses(
        (status = 201, description = "Node updated", body = ModifiedResponse),
        (status = 400, description = "Malformed body or unknown field"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller may not change nodes"),
        (status = 404, description = "No visible node with this uid"),
    ),
    tag = "nodes"
)]
pub async fn modify_node(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<(StatusCode, Json<ModifiedResponse>)> {
    if !principal.can_mutate_nodes() {
        return Err(AppError::Forbidden(
            "You are not allowed to change nodes".to_string(),
        ));
    }

    let body: ModifyNodeBody =
        serde_json::from_value(payload).map_err(|e| AppError::Validation(e.to_string()))?;

    let node = resolve_scoped_node(&state.db, &principal, &body.uid).await?;

    let mut active: nodes::ActiveModel = node.into();
    // Re-setting the uid to its current value keeps the update non-empty
    // even when the body carries nothing but the selector
    active.uid = Set(body.uid);
    if let Some(location) = body.location {
        active.location = Set(location);
    }
    if let Some(machine_name) = body.machine_name {
        active.machine_name = Set(machine_name);
    }
    if let Some(flag) = body.is_temperature {
        active.is_temperature = Set(Some(flag));
    }
    if let Some(flag) = body.is_humidity {
        active.is_humidity = Set(Some(flag));
    }
    if let Some(flag) = body.is_co2 {
        active.is_co2 = Set(Some(flag));
    }
    if let Some(range) = body.temperature_range {
        active.temperature_min = Set(range.min);
        active.temperature_max = Set(range.max);
    }
    if let Some(range) = body.humidity_range {
        active.humidity_min = Set(range.min);
        active.humidity_max = Set(range.max);
    }
    if let Some(range) = body.co2_range {
        active.co2_min = Set(range.min);
        active.co2_max = Set(range.max);
    }

    let node = active.update(&*state.db).await?;

    state.setpoints_cache.invalidate(&node.uid).await;
    tracing::info!(uid = %node.uid, "Modified node");

    Ok((StatusCode::CREATED, Json(ModifiedResponse { node: node.into() })))
}

/// Delete a node
///
/// Removes the node and every reading sharing its uid in one transaction.
/// Admin tiers may delete any node by uid; owners only their own.
#[utoipa::path(
    delete,
    path = "/node/{uid}",
    params(
        ("uid" = String, Path, description = "Node uid"),
    ),
    responses(
        (status = 200, description = "Node and readings deleted", body = DeleteResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller may not change nodes"),
        (status = 404, description = "Nothing to delete"),
    ),
    tag = "nodes"
)]
pub async fn delete_node(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(uid): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    if !principal.can_mutate_nodes() {
        return Err(AppError::Forbidden(
            "You are not allowed to change nodes".to_string(),
        ));
    }

    let mut query = nodes::Entity::find().filter(nodes::Column::Uid.eq(&uid));
    if !principal.can_delete_any_node() {
        query = query.filter(nodes::Column::Owner.eq(&principal.username));
    }
    let node = query
        .one(&*state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Nothing to delete".to_string()))?;

    let txn = state.db.begin().await?;
    let removed = readings::Entity::delete_many()
        .filter(readings::Column::Uid.eq(&node.uid))
        .exec(&txn)
        .await?;
    nodes::Entity::delete_by_id(node.id).exec(&txn).await?;
    txn.commit().await?;

    state.setpoints_cache.invalidate(&node.uid).await;
    tracing::info!(
        uid = %node.uid,
        readings_removed = removed.rows_affected,
        "Deleted node"
    );

    Ok(Json(DeleteResponse {
        message: "Deleted Successfully".to_string(),
    }))
}

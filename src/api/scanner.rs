//! Scanner workflow endpoints
//!
//! The presentation layer drives the mode engine through these routes and
//! mirrors engine state from the snapshot stream at `/scanner/events`.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{EngineSnapshot, Mode},
    services::engine::{InventoryCompletion, LoanCompletion, ScanReport},
};

/// One decode event from the active scan source
#[derive(Deserialize, ToSchema)]
pub struct ScanRequest {
    /// Raw decoded code, unprocessed
    pub code: String,
}

/// Mode switch request
#[derive(Deserialize, ToSchema)]
pub struct ModeChangeRequest {
    pub mode: Mode,
    /// Acknowledge losing unsaved session progress
    #[serde(default)]
    pub confirm: bool,
}

/// Confirmation for destructive session operations
#[derive(Deserialize, ToSchema)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Current engine state
#[utoipa::path(
    get,
    path = "/scanner/state",
    tag = "scanner",
    responses(
        (status = 200, description = "Current engine snapshot", body = EngineSnapshot)
    )
)]
pub async fn get_state(State(state): State<crate::AppState>) -> Json<EngineSnapshot> {
    Json(state.services.engine.snapshot().await)
}

/// Server-sent snapshot stream; one event per engine mutation
#[utoipa::path(
    get,
    path = "/scanner/events",
    tag = "scanner",
    responses(
        (status = 200, description = "SSE stream of engine snapshots")
    )
)]
pub async fn events(
    State(state): State<crate::AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.services.engine.subscribe())
        .map(|snapshot| Event::default().event("snapshot").json_data(&snapshot));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Submit a decode event from the camera
#[utoipa::path(
    post,
    path = "/scanner/scan",
    tag = "scanner",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan processed (including dropped frames)", body = ScanReport),
        (status = 502, description = "Catalog backend unreachable")
    )
)]
pub async fn scan(
    State(state): State<crate::AppState>,
    Json(request): Json<ScanRequest>,
) -> AppResult<Json<ScanReport>> {
    let report = state.services.engine.scan(&request.code).await?;
    Ok(Json(report))
}

/// Submit a manually typed code
#[utoipa::path(
    post,
    path = "/scanner/manual",
    tag = "scanner",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Entry processed", body = ScanReport),
        (status = 400, description = "Empty code")
    )
)]
pub async fn manual_entry(
    State(state): State<crate::AppState>,
    Json(request): Json<ScanRequest>,
) -> AppResult<Json<ScanReport>> {
    let report = state.services.engine.manual_submit(&request.code).await?;
    Ok(Json(report))
}

/// Switch workflow mode
#[utoipa::path(
    put,
    path = "/scanner/mode",
    tag = "scanner",
    request_body = ModeChangeRequest,
    responses(
        (status = 200, description = "Mode switched", body = EngineSnapshot),
        (status = 409, description = "Unsaved session progress; retry with confirm")
    )
)]
pub async fn change_mode(
    State(state): State<crate::AppState>,
    Json(request): Json<ModeChangeRequest>,
) -> AppResult<Json<EngineSnapshot>> {
    let snapshot = state
        .services
        .engine
        .change_mode(request.mode, request.confirm)
        .await?;
    Ok(Json(snapshot))
}

/// Clear the displayed search result and resume scanning
#[utoipa::path(
    post,
    path = "/scanner/reset",
    tag = "scanner",
    responses(
        (status = 200, description = "Scanning resumed", body = EngineSnapshot)
    )
)]
pub async fn reset_scan(State(state): State<crate::AppState>) -> AppResult<Json<EngineSnapshot>> {
    let snapshot = state.services.engine.reset_scan().await?;
    Ok(Json(snapshot))
}

/// Finish the inventory session and export its report
#[utoipa::path(
    post,
    path = "/scanner/inventory/finish",
    tag = "scanner",
    responses(
        (status = 200, description = "Report exported, fresh session started", body = InventoryCompletion),
        (status = 400, description = "Not in inventory mode or nothing scanned")
    )
)]
pub async fn finish_inventory(
    State(state): State<crate::AppState>,
) -> AppResult<Json<InventoryCompletion>> {
    let completion = state.services.engine.finish_inventory().await?;
    Ok(Json(completion))
}

/// Discard the inventory session without exporting
#[utoipa::path(
    post,
    path = "/scanner/inventory/clear",
    tag = "scanner",
    request_body = ConfirmRequest,
    responses(
        (status = 200, description = "Session cleared", body = EngineSnapshot),
        (status = 409, description = "Confirmation required")
    )
)]
pub async fn clear_inventory(
    State(state): State<crate::AppState>,
    Json(request): Json<ConfirmRequest>,
) -> AppResult<Json<EngineSnapshot>> {
    let snapshot = state.services.engine.clear_inventory(request.confirm).await?;
    Ok(Json(snapshot))
}

/// Submit the loan cart as one batch
#[utoipa::path(
    post,
    path = "/scanner/loan/complete",
    tag = "scanner",
    responses(
        (status = 200, description = "Batch submitted; per-item counts inside", body = LoanCompletion),
        (status = 400, description = "No subject or empty cart"),
        (status = 502, description = "Whole batch rejected by the backend")
    )
)]
pub async fn complete_loan(
    State(state): State<crate::AppState>,
) -> AppResult<Json<LoanCompletion>> {
    let completion = state.services.engine.complete_loan().await?;
    Ok(Json(completion))
}

/// Abandon the current loan subject and cart
#[utoipa::path(
    delete,
    path = "/scanner/loan/subject",
    tag = "scanner",
    responses(
        (status = 200, description = "Back to the subject phase", body = EngineSnapshot),
        (status = 400, description = "Not in loan mode")
    )
)]
pub async fn reset_loan_subject(
    State(state): State<crate::AppState>,
) -> AppResult<Json<EngineSnapshot>> {
    let snapshot = state.services.engine.reset_loan_subject().await?;
    Ok(Json(snapshot))
}

/// Remove one item from the loan cart
#[utoipa::path(
    delete,
    path = "/scanner/loan/items/{id}",
    tag = "scanner",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item removed", body = EngineSnapshot),
        (status = 404, description = "Item not in the cart")
    )
)]
pub async fn remove_loan_item(
    State(state): State<crate::AppState>,
    Path(item_id): Path<i32>,
) -> AppResult<Json<EngineSnapshot>> {
    let snapshot = state.services.engine.remove_loan_item(item_id).await?;
    Ok(Json(snapshot))
}

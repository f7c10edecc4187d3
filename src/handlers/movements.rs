//! HTTP handlers for the stock movement ledger

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{
    ImportSummary, InboundRecorded, MovementPage, MovementWithReagent, OutboundRecorded,
    RecordInboundInput, RecordOutboundInput,
};
use crate::services::inventory::CSV_TEMPLATE;
use crate::services::InventoryService;
use crate::AppState;

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Record an inbound movement
pub async fn record_inbound(
    State(state): State<AppState>,
    Json(input): Json<RecordInboundInput>,
) -> AppResult<Json<InboundRecorded>> {
    let service = InventoryService::new(state.db);
    let recorded = service.record_inbound(input).await?;
    Ok(Json(recorded))
}

/// Record an outbound movement
pub async fn record_outbound(
    State(state): State<AppState>,
    Json(input): Json<RecordOutboundInput>,
) -> AppResult<Json<OutboundRecorded>> {
    let service = InventoryService::new(state.db);
    let recorded = service.record_outbound(input).await?;
    Ok(Json(recorded))
}

/// Newest movements across all reagents
pub async fn list_recent_movements(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> AppResult<Json<MovementPage>> {
    let service = InventoryService::new(state.db);
    let page = service.recent_movements(query.limit).await?;
    Ok(Json(page))
}

/// Substring search across reagent name, batch number and supplier
pub async fn search_movements(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<MovementWithReagent>>> {
    let service = InventoryService::new(state.db);
    let movements = service
        .search_movements(query.q.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(movements))
}

/// Import inbound receipt rows from a CSV request body
pub async fn import_csv(
    State(state): State<AppState>,
    body: String,
) -> AppResult<Json<ImportSummary>> {
    let service = InventoryService::new(state.db);
    let summary = service.import_csv(&body).await?;
    Ok(Json(summary))
}

/// Download the CSV import template
pub async fn csv_template() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"reagent_import_template.csv\"",
            ),
        ],
        CSV_TEMPLATE,
    )
}

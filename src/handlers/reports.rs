//! HTTP handlers for PDF report downloads
//!
//! These are the only routes that return raw bytes; everything else is JSON.
//! The render itself is a pure function of the snapshot fetched here, so a
//! failed render never returns partial bytes.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::{report, InventoryService};
use crate::AppState;

#[derive(Deserialize)]
pub struct StockReportQuery {
    pub title: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize)]
pub struct ReceiptQuery {
    pub copies: Option<i64>,
}

/// Download the current stock list as a PDF
pub async fn stock_report_pdf(
    State(state): State<AppState>,
    Query(query): Query<StockReportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = InventoryService::new(state.db);

    let from = query.from.and_then(|s| s.parse().ok());
    let to = query.to.and_then(|s| s.parse().ok());
    // The rendered quantities are the stock as of the end of the period;
    // the from/to pair is the reporting period shown in the header.
    let rows = service.stock_snapshot(to).await?;

    let title = query.title.unwrap_or_else(|| "Reagent Stock Report".to_string());
    let range = from.zip(to);
    let bytes = report::stock_report(&rows, &title, range)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"stock_report.pdf\"",
            ),
        ],
        bytes,
    ))
}

/// Download the receipt labels for an inbound movement as a PDF
pub async fn receipt_pdf(
    State(state): State<AppState>,
    Path(movement_id): Path<i64>,
    Query(query): Query<ReceiptQuery>,
) -> AppResult<impl IntoResponse> {
    let service = InventoryService::new(state.db);

    let (snapshot, default_copies) = service.receipt_snapshot(movement_id).await?;
    let copies = query.copies.unwrap_or(default_copies);
    let bytes = report::receipt_labels(&snapshot, copies)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"receipt-{}.pdf\"", movement_id),
            ),
        ],
        bytes,
    ))
}

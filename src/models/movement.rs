//! Stock movement ledger entities

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// An immutable ledger entry.
///
/// Inbound movements carry the receiving fields (batch, expiry, supplier);
/// outbound movements leave them empty.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockMovement {
    pub id: i64,
    pub reagent_id: i64,
    pub direction: String,
    pub quantity: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub operator: Option<String>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// A ledger entry joined with its reagent's name and spec, for list views
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementWithReagent {
    pub id: i64,
    pub reagent_id: i64,
    pub reagent_name: String,
    pub reagent_spec: String,
    pub direction: String,
    pub quantity: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub operator: Option<String>,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Input for recording an inbound movement
#[derive(Debug, Deserialize)]
pub struct RecordInboundInput {
    pub reagent_id: i64,
    pub quantity: i64,
    pub batch_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub operator: Option<String>,
    pub note: Option<String>,
}

/// Input for recording an outbound movement
#[derive(Debug, Deserialize)]
pub struct RecordOutboundInput {
    pub reagent_id: i64,
    pub quantity: i64,
    pub operator: Option<String>,
    pub note: Option<String>,
}

/// Response for a recorded inbound movement
#[derive(Debug, Serialize)]
pub struct InboundRecorded {
    pub movement: StockMovement,
    pub on_hand: i64,
    /// True when this batch number has never been received for the reagent
    /// before.
    pub new_batch: bool,
}

/// Response for a recorded outbound movement
#[derive(Debug, Serialize)]
pub struct OutboundRecorded {
    pub movement: StockMovement,
    pub on_hand: i64,
}

/// A page of recent movements with the total ledger size
#[derive(Debug, Serialize)]
pub struct MovementPage {
    pub movements: Vec<MovementWithReagent>,
    pub total: i64,
    /// True when the page does not cover the whole ledger.
    pub limited: bool,
}

/// A distinct batch received for a reagent
#[derive(Debug, Serialize, FromRow)]
pub struct BatchSummary {
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub last_received: DateTime<Utc>,
}

/// Outcome of a CSV import
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

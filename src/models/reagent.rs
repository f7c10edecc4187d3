//! Reagent catalog entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog entry for a tracked reagent.
///
/// Never physically deleted once the ledger references it; `active` is
/// cleared instead so movement history stays intact.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reagent {
    pub id: i64,
    pub name: String,
    /// Specification/unit, e.g. "500 mL bottle".
    pub spec: String,
    pub category: Option<String>,
    /// Minimum-stock threshold; `None` disables low-stock reporting.
    pub min_stock: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a reagent
#[derive(Debug, Deserialize)]
pub struct RegisterReagentInput {
    pub name: String,
    pub spec: String,
    pub category: Option<String>,
    pub min_stock: Option<i64>,
}

/// Input for editing a reagent; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateReagentInput {
    pub name: Option<String>,
    pub spec: Option<String>,
    pub category: Option<String>,
    pub min_stock: Option<i64>,
}

/// Listing filter
#[derive(Debug, Default, Deserialize)]
pub struct ReagentFilter {
    /// Substring match on name or category.
    pub q: Option<String>,
    /// Include deactivated reagents.
    pub include_inactive: Option<bool>,
}

/// Current on-hand quantity for a reagent
#[derive(Debug, Serialize)]
pub struct StockLevel {
    pub reagent_id: i64,
    pub on_hand: i64,
}

/// A reagent at or below its minimum-stock threshold
#[derive(Debug, Serialize, FromRow)]
pub struct LowStockReagent {
    pub id: i64,
    pub name: String,
    pub spec: String,
    pub category: Option<String>,
    pub min_stock: i64,
    pub on_hand: i64,
}

/// Form pre-fill data derived from past inbound movements
#[derive(Debug, Serialize)]
pub struct ReceivingDefaults {
    pub supplier: Option<String>,
    pub supplier_usage_count: i64,
}

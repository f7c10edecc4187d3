//! Stock movement ledger service
//!
//! The ledger is the source of truth: on-hand quantities are always derived
//! from it, never from a separately maintained counter. Outbound appends are
//! guarded inside a single SQL statement so concurrent requests can never
//! jointly drive stock negative.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{
    BatchSummary, Direction, ImportSummary, InboundRecorded, LowStockReagent, MovementPage,
    MovementWithReagent, OutboundRecorded, RecordInboundInput, RecordOutboundInput, StockMovement,
};
use crate::services::report::{ReceiptSnapshot, StockReportRow};

const MOVEMENT_COLUMNS: &str =
    "id, reagent_id, direction, quantity, batch_number, expiry_date, supplier, operator, note, recorded_at";

const JOINED_COLUMNS: &str = "m.id, m.reagent_id, r.name AS reagent_name, r.spec AS reagent_spec, \
     m.direction, m.quantity, m.batch_number, m.expiry_date, m.supplier, m.operator, m.note, m.recorded_at";

/// Default page size for the recent-movements view
pub const DEFAULT_RECENT_LIMIT: i64 = 50;

/// Header and sample rows for the CSV import format
pub const CSV_TEMPLATE: &str = "\
name,spec,batch_number,expiry_date,quantity,supplier,received_at
GOT,kit,GOT001,2025-12-31,10,Abbott,2025-08-22 09:00:00
GPT,kit,GPT001,2025-12-31,5,Roche,2025-08-22 10:00:00
";

/// Inventory service for the append-only movement ledger
#[derive(Clone)]
pub struct InventoryService {
    db: SqlitePool,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    name: String,
    spec: String,
    batch_number: String,
    expiry_date: String,
    quantity: String,
    supplier: String,
    received_at: String,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an inbound movement and return the updated on-hand quantity
    pub async fn record_inbound(&self, input: RecordInboundInput) -> AppResult<InboundRecorded> {
        if input.quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        self.require_active_reagent(input.reagent_id).await?;

        let batch_number = non_empty(input.batch_number);
        let supplier = non_empty(input.supplier);
        let operator = non_empty(input.operator);

        let new_batch = match &batch_number {
            Some(batch) => !self.batch_seen(input.reagent_id, batch).await?,
            None => false,
        };

        // The EXISTS guard re-checks activity inside the same statement, so
        // a concurrent deactivation cannot slip a movement in behind it.
        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            INSERT INTO stock_movement
                (reagent_id, direction, quantity, batch_number, expiry_date, supplier, operator, note, recorded_at)
            SELECT ?, 'in', ?, ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM reagent WHERE id = ? AND active = 1)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(input.reagent_id)
        .bind(input.quantity)
        .bind(&batch_number)
        .bind(input.expiry_date)
        .bind(&supplier)
        .bind(&operator)
        .bind(&input.note)
        .bind(Utc::now())
        .bind(input.reagent_id)
        .fetch_optional(&self.db)
        .await?;

        let movement = match movement {
            Some(m) => m,
            None => return Err(self.classify_rejection(input.reagent_id).await?),
        };

        let on_hand = self.ledger_sum(input.reagent_id).await?;
        Ok(InboundRecorded {
            movement,
            on_hand,
            new_batch,
        })
    }

    /// Record an outbound movement; fails if it would drive stock negative
    pub async fn record_outbound(&self, input: RecordOutboundInput) -> AppResult<OutboundRecorded> {
        if input.quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        self.require_active_reagent(input.reagent_id).await?;

        let operator = non_empty(input.operator);

        // Single guarded statement: the balance check and the append are one
        // transaction, so two concurrent outbounds can never jointly
        // under-run stock.
        let movement = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            INSERT INTO stock_movement (reagent_id, direction, quantity, operator, note, recorded_at)
            SELECT ?, 'out', ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM reagent WHERE id = ? AND active = 1)
              AND (SELECT COALESCE(SUM(CASE WHEN direction = 'in' THEN quantity ELSE -quantity END), 0)
                   FROM stock_movement WHERE reagent_id = ?) >= ?
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(input.reagent_id)
        .bind(input.quantity)
        .bind(&operator)
        .bind(&input.note)
        .bind(Utc::now())
        .bind(input.reagent_id)
        .bind(input.reagent_id)
        .bind(input.quantity)
        .fetch_optional(&self.db)
        .await?;

        let movement = match movement {
            Some(m) => m,
            None => {
                self.require_active_reagent(input.reagent_id).await?;
                let available = self.ledger_sum(input.reagent_id).await?;
                return Err(AppError::InsufficientStock {
                    requested: input.quantity,
                    available,
                });
            }
        };

        let on_hand = self.ledger_sum(input.reagent_id).await?;
        Ok(OutboundRecorded { movement, on_hand })
    }

    /// Current on-hand quantity, recomputed from the full ledger
    pub async fn current_stock(&self, reagent_id: i64) -> AppResult<i64> {
        self.require_reagent(reagent_id).await?;
        self.ledger_sum(reagent_id).await
    }

    /// Active reagents at or below their minimum-stock threshold
    ///
    /// Recomputed per call; nothing is cached between calls.
    pub async fn low_stock_reagents(&self) -> AppResult<Vec<LowStockReagent>> {
        let reagents = sqlx::query_as::<_, LowStockReagent>(
            r#"
            SELECT r.id, r.name, r.spec, r.category, r.min_stock,
                   COALESCE((SELECT SUM(CASE WHEN m.direction = 'in' THEN m.quantity ELSE -m.quantity END)
                             FROM stock_movement m WHERE m.reagent_id = r.id), 0) AS on_hand
            FROM reagent r
            WHERE r.active = 1 AND r.min_stock IS NOT NULL
              AND COALESCE((SELECT SUM(CASE WHEN m.direction = 'in' THEN m.quantity ELSE -m.quantity END)
                            FROM stock_movement m WHERE m.reagent_id = r.id), 0) <= r.min_stock
            ORDER BY r.name, r.spec
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(reagents)
    }

    /// Ledger slice for one reagent, newest first, optionally date-bounded
    pub async fn list_movements(
        &self,
        reagent_id: i64,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<StockMovement>> {
        self.require_reagent(reagent_id).await?;

        let lower = from.map(start_of_day);
        let upper = to.and_then(|d| d.succ_opt()).map(start_of_day);

        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movement
            WHERE reagent_id = ?
              AND (? IS NULL OR recorded_at >= ?)
              AND (? IS NULL OR recorded_at < ?)
            ORDER BY recorded_at DESC, id DESC
            "#
        ))
        .bind(reagent_id)
        .bind(lower)
        .bind(lower)
        .bind(upper)
        .bind(upper)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Newest movements across all reagents plus the total ledger size
    pub async fn recent_movements(&self, limit: Option<i64>) -> AppResult<MovementPage> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT).clamp(1, 500);

        let movements = sqlx::query_as::<_, MovementWithReagent>(&format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM stock_movement m
            JOIN reagent r ON r.id = m.reagent_id
            ORDER BY m.recorded_at DESC, m.id DESC
            LIMIT ?
            "#
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stock_movement")
            .fetch_one(&self.db)
            .await?;

        let limited = total > movements.len() as i64;
        Ok(MovementPage {
            movements,
            total,
            limited,
        })
    }

    /// Substring search across reagent name, batch number and supplier
    pub async fn search_movements(&self, query: &str) -> AppResult<Vec<MovementWithReagent>> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }

        let movements = sqlx::query_as::<_, MovementWithReagent>(&format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM stock_movement m
            JOIN reagent r ON r.id = m.reagent_id
            WHERE r.name LIKE '%' || ? || '%'
               OR COALESCE(m.batch_number, '') LIKE '%' || ? || '%'
               OR COALESCE(m.supplier, '') LIKE '%' || ? || '%'
            ORDER BY m.recorded_at DESC, m.id DESC
            "#
        ))
        .bind(q)
        .bind(q)
        .bind(q)
        .fetch_all(&self.db)
        .await?;

        Ok(movements)
    }

    /// Distinct batch numbers received for a reagent, newest first
    pub async fn batch_history(&self, reagent_id: i64) -> AppResult<Vec<BatchSummary>> {
        self.require_reagent(reagent_id).await?;

        let batches = sqlx::query_as::<_, BatchSummary>(
            r#"
            SELECT m.batch_number,
                   (SELECT m2.expiry_date FROM stock_movement m2
                    WHERE m2.reagent_id = m.reagent_id AND m2.batch_number = m.batch_number
                      AND m2.expiry_date IS NOT NULL
                    ORDER BY m2.recorded_at DESC, m2.id DESC
                    LIMIT 1) AS expiry_date,
                   MAX(m.recorded_at) AS last_received
            FROM stock_movement m
            WHERE m.reagent_id = ? AND m.batch_number IS NOT NULL
            GROUP BY m.batch_number
            ORDER BY last_received DESC
            "#,
        )
        .bind(reagent_id)
        .fetch_all(&self.db)
        .await?;

        Ok(batches)
    }

    /// Snapshot of active reagents with their on-hand quantities for the
    /// stock report.
    ///
    /// `as_of` bounds the ledger at the end of that day. Every ledger prefix
    /// is non-negative (the outbound guard saw the full prefix when it
    /// accepted each movement), so the snapshot never contains negative
    /// quantities.
    pub async fn stock_snapshot(&self, as_of: Option<NaiveDate>) -> AppResult<Vec<StockReportRow>> {
        let upper = as_of.and_then(|d| d.succ_opt()).map(start_of_day);

        let rows = sqlx::query_as::<_, (String, String, i64, Option<i64>)>(
            r#"
            SELECT r.name, r.spec,
                   COALESCE((SELECT SUM(CASE WHEN m.direction = 'in' THEN m.quantity ELSE -m.quantity END)
                             FROM stock_movement m
                             WHERE m.reagent_id = r.id
                               AND (? IS NULL OR m.recorded_at < ?)), 0) AS on_hand,
                   r.min_stock
            FROM reagent r
            WHERE r.active = 1
            ORDER BY r.name, r.spec
            "#,
        )
        .bind(upper)
        .bind(upper)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(reagent, spec, on_hand, min_stock)| StockReportRow {
                reagent,
                spec,
                on_hand,
                min_stock,
            })
            .collect())
    }

    /// Look up a single ledger entry with its reagent
    pub async fn get_movement(&self, movement_id: i64) -> AppResult<MovementWithReagent> {
        sqlx::query_as::<_, MovementWithReagent>(&format!(
            r#"
            SELECT {JOINED_COLUMNS}
            FROM stock_movement m
            JOIN reagent r ON r.id = m.reagent_id
            WHERE m.id = ?
            "#
        ))
        .bind(movement_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Movement".to_string()))
    }

    /// Build the snapshot for an inbound receipt label, plus the default
    /// number of copies (one label per received unit)
    pub async fn receipt_snapshot(&self, movement_id: i64) -> AppResult<(ReceiptSnapshot, i64)> {
        let movement = self.get_movement(movement_id).await?;
        if movement.direction != Direction::In.as_str() {
            return Err(AppError::validation(
                "movement_id",
                "Receipts can only be generated for inbound movements",
            ));
        }

        // The earliest ledger entry for this reagent+batch pair is the one
        // that introduced the batch.
        let new_batch = match &movement.batch_number {
            Some(batch) => {
                let first: i64 = sqlx::query_scalar(
                    r#"
                    SELECT id FROM stock_movement
                    WHERE reagent_id = ? AND batch_number = ?
                    ORDER BY recorded_at ASC, id ASC
                    LIMIT 1
                    "#,
                )
                .bind(movement.reagent_id)
                .bind(batch)
                .fetch_one(&self.db)
                .await?;
                first == movement.id
            }
            None => false,
        };

        let snapshot = ReceiptSnapshot {
            reagent_name: movement.reagent_name,
            spec: movement.reagent_spec,
            batch_number: movement.batch_number,
            expiry_date: movement.expiry_date,
            supplier: movement.supplier,
            received_at: movement.recorded_at,
            new_batch,
        };
        Ok((snapshot, movement.quantity))
    }

    /// Import inbound receipt rows from CSV data.
    ///
    /// Row-tolerant: a bad row is reported in the summary and skipped, the
    /// rest of the file is still processed. Unknown reagents are registered
    /// on the fly. Every valid row appends to the ledger; nothing is
    /// updated in place.
    pub async fn import_csv(&self, data: &str) -> AppResult<ImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes());

        let mut imported = 0usize;
        let mut errors = Vec::new();

        for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
            // Header is row 1.
            let row = index + 2;
            match record {
                Err(e) => errors.push(format!("row {}: {}", row, e)),
                Ok(entry) => match self.import_row(&entry).await {
                    Ok(()) => imported += 1,
                    Err(e) => errors.push(format!("row {}: {}", row, e)),
                },
            }
        }

        Ok(ImportSummary {
            imported,
            failed: errors.len(),
            errors,
        })
    }

    async fn import_row(&self, entry: &CsvRow) -> AppResult<()> {
        if entry.name.is_empty() {
            return Err(AppError::validation("name", "Name must not be empty"));
        }
        if entry.spec.is_empty() {
            return Err(AppError::validation("spec", "Specification must not be empty"));
        }
        let quantity: i64 = entry
            .quantity
            .parse()
            .map_err(|_| AppError::validation("quantity", "Quantity must be an integer"))?;
        if quantity <= 0 {
            return Err(AppError::validation("quantity", "Quantity must be positive"));
        }
        let expiry_date = if entry.expiry_date.is_empty() {
            None
        } else {
            Some(parse_csv_date(&entry.expiry_date).ok_or_else(|| {
                AppError::validation("expiry_date", "Expected YYYY-MM-DD or YYYY/MM/DD")
            })?)
        };
        let recorded_at = if entry.received_at.is_empty() {
            Utc::now()
        } else {
            parse_csv_datetime(&entry.received_at).ok_or_else(|| {
                AppError::validation("received_at", "Expected YYYY-MM-DD HH:MM:SS or YYYY-MM-DD")
            })?
        };

        let reagent = sqlx::query_as::<_, (i64, bool)>(
            "SELECT id, active FROM reagent WHERE name = ? AND spec = ?",
        )
        .bind(&entry.name)
        .bind(&entry.spec)
        .fetch_optional(&self.db)
        .await?;

        let reagent_id = match reagent {
            Some((_, false)) => {
                return Err(AppError::validation("name", "Reagent is deactivated"));
            }
            Some((id, true)) => id,
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO reagent (name, spec, active, created_at)
                    VALUES (?, ?, 1, ?)
                    RETURNING id
                    "#,
                )
                .bind(&entry.name)
                .bind(&entry.spec)
                .bind(Utc::now())
                .fetch_one(&self.db)
                .await?
            }
        };

        sqlx::query(
            r#"
            INSERT INTO stock_movement
                (reagent_id, direction, quantity, batch_number, expiry_date, supplier, recorded_at)
            VALUES (?, 'in', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(reagent_id)
        .bind(quantity)
        .bind(non_empty(Some(entry.batch_number.clone())))
        .bind(expiry_date)
        .bind(non_empty(Some(entry.supplier.clone())))
        .bind(recorded_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn ledger_sum(&self, reagent_id: i64) -> AppResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE WHEN direction = 'in' THEN quantity ELSE -quantity END), 0)
            FROM stock_movement
            WHERE reagent_id = ?
            "#,
        )
        .bind(reagent_id)
        .fetch_one(&self.db)
        .await?;
        Ok(sum)
    }

    async fn batch_seen(&self, reagent_id: i64, batch: &str) -> AppResult<bool> {
        let seen: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM stock_movement WHERE reagent_id = ? AND batch_number = ?)",
        )
        .bind(reagent_id)
        .bind(batch)
        .fetch_one(&self.db)
        .await?;
        Ok(seen)
    }

    async fn require_reagent(&self, reagent_id: i64) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT active FROM reagent WHERE id = ?")
            .bind(reagent_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Reagent".to_string()))
    }

    async fn require_active_reagent(&self, reagent_id: i64) -> AppResult<()> {
        if !self.require_reagent(reagent_id).await? {
            return Err(AppError::validation(
                "reagent_id",
                "Reagent is deactivated",
            ));
        }
        Ok(())
    }

    async fn classify_rejection(&self, reagent_id: i64) -> AppResult<AppError> {
        // The guarded insert matched no row; find out why for the caller.
        match self.require_active_reagent(reagent_id).await {
            Err(e) => Ok(e),
            Ok(()) => Ok(AppError::NotFound("Reagent".to_string())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0).unwrap(), Utc)
}

fn parse_csv_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .ok()
}

fn parse_csv_datetime(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| parse_csv_date(value).and_then(|d| d.and_hms_opt(0, 0, 0)));
    naive.map(|n| DateTime::from_naive_utc_and_offset(n, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_date_accepts_both_separators() {
        assert!(parse_csv_date("2025-12-31").is_some());
        assert!(parse_csv_date("2025/12/31").is_some());
        assert!(parse_csv_date("31.12.2025").is_none());
    }

    #[test]
    fn csv_datetime_falls_back_to_midnight() {
        let full = parse_csv_datetime("2025-08-22 09:30:00").unwrap();
        assert_eq!(full.to_rfc3339(), "2025-08-22T09:30:00+00:00");

        let date_only = parse_csv_datetime("2025-08-22").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2025-08-22T00:00:00+00:00");
    }

    #[test]
    fn blank_optionals_become_null() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" A1 ".to_string())), Some("A1".to_string()));
        assert_eq!(non_empty(None), None);
    }
}

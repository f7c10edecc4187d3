//! Supplier directory service

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::Supplier;

#[derive(Clone)]
pub struct SupplierService {
    db: SqlitePool,
}

impl SupplierService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List all suppliers, ordered by name
    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, created_at FROM supplier ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(suppliers)
    }

    /// Add a supplier; adding an existing name returns the existing row
    pub async fn add_supplier(&self, name: &str) -> AppResult<Supplier> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "Name must not be empty"));
        }

        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        let inserted = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO supplier (name, created_at)
            VALUES (?, ?)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(supplier) => Ok(supplier),
            // Lost the race against a concurrent insert of the same name.
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => self
                .find_by_name(name)
                .await?
                .ok_or_else(|| AppError::NotFound("Supplier".to_string())),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, created_at FROM supplier WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(supplier)
    }
}

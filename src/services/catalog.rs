//! Reagent catalog service: registration, edits, lookup and suggestions

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{
    Reagent, ReagentFilter, ReceivingDefaults, RegisterReagentInput, UpdateReagentInput,
};

const REAGENT_COLUMNS: &str = "id, name, spec, category, min_stock, active, created_at";

/// Catalog service for managing reagent entries
#[derive(Clone)]
pub struct CatalogService {
    db: SqlitePool,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a new reagent
    pub async fn register_reagent(&self, input: RegisterReagentInput) -> AppResult<Reagent> {
        let name = input.name.trim().to_string();
        let spec = input.spec.trim().to_string();
        validate_reagent_fields(&name, &spec, input.min_stock)?;

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reagent WHERE name = ? AND spec = ?)",
        )
        .bind(&name)
        .bind(&spec)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::Conflict(format!(
                "Reagent '{}' ({}) is already registered",
                name, spec
            )));
        }

        let reagent = sqlx::query_as::<_, Reagent>(&format!(
            r#"
            INSERT INTO reagent (name, spec, category, min_stock, active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            RETURNING {REAGENT_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(&spec)
        .bind(&input.category)
        .bind(input.min_stock)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            // Lost the pre-check race; report it the same way.
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "Reagent '{}' ({}) is already registered",
                        name, spec
                    ));
                }
            }
            AppError::Database(e)
        })?;

        Ok(reagent)
    }

    /// Get a reagent by id
    pub async fn get_reagent(&self, id: i64) -> AppResult<Reagent> {
        sqlx::query_as::<_, Reagent>(&format!(
            "SELECT {REAGENT_COLUMNS} FROM reagent WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reagent".to_string()))
    }

    /// List reagents matching a filter
    pub async fn list_reagents(&self, filter: &ReagentFilter) -> AppResult<Vec<Reagent>> {
        let q = filter.q.as_ref().map(|q| q.trim().to_string());
        let include_inactive = filter.include_inactive.unwrap_or(false);

        let reagents = sqlx::query_as::<_, Reagent>(&format!(
            r#"
            SELECT {REAGENT_COLUMNS}
            FROM reagent
            WHERE (? IS NULL OR name LIKE '%' || ? || '%' OR COALESCE(category, '') LIKE '%' || ? || '%')
              AND (? OR active = 1)
            ORDER BY name, spec
            "#
        ))
        .bind(&q)
        .bind(&q)
        .bind(&q)
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(reagents)
    }

    /// Edit a reagent; absent fields keep their current values
    pub async fn update_reagent(&self, id: i64, input: UpdateReagentInput) -> AppResult<Reagent> {
        let existing = self.get_reagent(id).await?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let spec = input
            .spec
            .map(|s| s.trim().to_string())
            .unwrap_or(existing.spec);
        let category = input.category.or(existing.category);
        let min_stock = input.min_stock.or(existing.min_stock);
        validate_reagent_fields(&name, &spec, min_stock)?;

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reagent WHERE name = ? AND spec = ? AND id != ?)",
        )
        .bind(&name)
        .bind(&spec)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::Conflict(format!(
                "Reagent '{}' ({}) is already registered",
                name, spec
            )));
        }

        let reagent = sqlx::query_as::<_, Reagent>(&format!(
            r#"
            UPDATE reagent
            SET name = ?, spec = ?, category = ?, min_stock = ?
            WHERE id = ?
            RETURNING {REAGENT_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(&spec)
        .bind(&category)
        .bind(min_stock)
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(reagent)
    }

    /// Soft-deactivate a reagent, preserving its movement history
    pub async fn deactivate_reagent(&self, id: i64) -> AppResult<Reagent> {
        sqlx::query_as::<_, Reagent>(&format!(
            "UPDATE reagent SET active = 0 WHERE id = ? RETURNING {REAGENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reagent".to_string()))
    }

    /// Suggest reagent names for a partial query, best matches first
    pub async fn name_suggestions(&self, query: &str) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>("SELECT DISTINCT name FROM reagent")
            .fetch_all(&self.db)
            .await?;

        Ok(rank_matches(names.iter().map(String::as_str), query, 8))
    }

    /// Most frequently used supplier on past inbound movements, for form
    /// pre-fill
    pub async fn receiving_defaults(&self, reagent_id: i64) -> AppResult<ReceivingDefaults> {
        self.get_reagent(reagent_id).await?;

        let top = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT supplier, COUNT(*) AS uses
            FROM stock_movement
            WHERE reagent_id = ? AND direction = 'in' AND supplier IS NOT NULL
            GROUP BY supplier
            ORDER BY uses DESC, supplier
            LIMIT 1
            "#,
        )
        .bind(reagent_id)
        .fetch_optional(&self.db)
        .await?;

        let (supplier, supplier_usage_count) = match top {
            Some((s, n)) => (Some(s), n),
            None => (None, 0),
        };

        Ok(ReceivingDefaults {
            supplier,
            supplier_usage_count,
        })
    }
}

fn validate_reagent_fields(name: &str, spec: &str, min_stock: Option<i64>) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::validation("name", "Name must not be empty"));
    }
    if spec.is_empty() {
        return Err(AppError::validation("spec", "Specification must not be empty"));
    }
    if let Some(threshold) = min_stock {
        if threshold < 0 {
            return Err(AppError::validation(
                "min_stock",
                "Minimum-stock threshold must not be negative",
            ));
        }
    }
    Ok(())
}

/// Rank catalog names against a partial query.
///
/// Scoring tiers: exact match, prefix, substring, then in-order character
/// match covering at least 70% of the query. Shorter names win within a
/// tier. Recomputed per call; nothing is cached.
pub fn rank_matches<'a, I>(names: I, query: &str, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let q = query.trim().to_uppercase();
    if q.is_empty() {
        return Vec::new();
    }
    let q_len = q.chars().count() as i64;

    let mut scored: Vec<(i64, String)> = Vec::new();
    for name in names {
        let upper = name.to_uppercase();
        let len = name.chars().count() as i64;

        let score = if upper == q {
            Some(1000)
        } else if upper.starts_with(&q) {
            Some(900 - len + if q_len > 1 { 10 } else { 0 })
        } else if let Some(pos) = upper.find(&q) {
            Some(800 - (pos as i64) * 10 - len)
        } else {
            let name_chars: Vec<char> = upper.chars().collect();
            let mut matched: i64 = 0;
            let mut idx = 0usize;
            for qc in q.chars() {
                if let Some(pos) = name_chars[idx..].iter().position(|&c| c == qc) {
                    matched += 1;
                    idx += pos + 1;
                }
            }
            if matched * 10 >= q_len * 7 {
                Some(700 - len + matched * 10)
            } else {
                None
            }
        };

        if let Some(score) = score {
            scored.push((score, name.to_string()));
        }
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().take(limit).map(|(_, n)| n).collect()
}

#[cfg(test)]
mod tests {
    use super::rank_matches;

    #[test]
    fn exact_match_ranks_first() {
        let names = ["GOT", "GPT", "GOT-HS"];
        let ranked = rank_matches(names.iter().copied(), "GOT", 8);
        assert_eq!(ranked[0], "GOT");
    }

    #[test]
    fn prefix_beats_substring() {
        let names = ["Methanol", "Ethanol"];
        let ranked = rank_matches(names.iter().copied(), "Eth", 8);
        assert_eq!(ranked[0], "Ethanol");
    }

    #[test]
    fn unrelated_names_are_excluded() {
        let names = ["Acetone", "Xylene"];
        let ranked = rank_matches(names.iter().copied(), "zzz", 8);
        assert!(ranked.is_empty());
    }

    #[test]
    fn empty_query_yields_nothing() {
        let names = ["Acetone"];
        assert!(rank_matches(names.iter().copied(), "  ", 8).is_empty());
    }

    #[test]
    fn limit_is_honored() {
        let names: Vec<String> = (0..20).map(|i| format!("Buffer-{i}")).collect();
        let ranked = rank_matches(names.iter().map(String::as_str), "Buffer", 8);
        assert_eq!(ranked.len(), 8);
    }
}

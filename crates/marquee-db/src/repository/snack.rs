//! # Snack Repository
//!
//! Snack catalog and stock levels.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  NEVER: read stock, compute, write back                             │
//! │     UPDATE snacks SET stock_quantity = 7 WHERE id = ?               │
//! │                                                                     │
//! │  ALWAYS: guarded relative update                                    │
//! │     UPDATE snacks SET stock_quantity = stock_quantity - 3           │
//! │     WHERE id = ? AND stock_quantity >= 3                            │
//! │                                                                     │
//! │  rows_affected = 0  →  not enough stock, nothing changed            │
//! │  CHECK (stock_quantity >= 0) backs this up in the schema            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use marquee_core::Snack;

/// Repository for snack database operations.
#[derive(Debug, Clone)]
pub struct SnackRepository {
    pool: SqlitePool,
}

impl SnackRepository {
    /// Creates a new SnackRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SnackRepository { pool }
    }

    /// Inserts a snack.
    pub async fn insert(&self, snack: &Snack) -> DbResult<()> {
        debug!(id = %snack.id, name = %snack.name, stock = snack.stock_quantity, "Inserting snack");

        sqlx::query(
            r#"
            INSERT INTO snacks (
                id, name, category, price_cents,
                stock_quantity, min_stock_level, is_available
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&snack.id)
        .bind(&snack.name)
        .bind(&snack.category)
        .bind(snack.price_cents)
        .bind(snack.stock_quantity)
        .bind(snack.min_stock_level)
        .bind(snack.is_available)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a snack by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Snack>> {
        fetch_snack(&self.pool, id).await
    }

    /// Snacks offered for sale, grouped by category.
    pub async fn list_available(&self) -> DbResult<Vec<Snack>> {
        let snacks = sqlx::query_as::<_, Snack>(
            r#"
            SELECT id, name, category, price_cents, stock_quantity, min_stock_level, is_available
            FROM snacks
            WHERE is_available = 1
            ORDER BY category, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(snacks)
    }

    /// Snacks at or below their restock threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Snack>> {
        let snacks = sqlx::query_as::<_, Snack>(
            r#"
            SELECT id, name, category, price_cents, stock_quantity, min_stock_level, is_available
            FROM snacks
            WHERE stock_quantity <= min_stock_level
            ORDER BY stock_quantity, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(snacks)
    }

    /// Adds delivered units to stock. Returns the updated snack.
    pub async fn restock(&self, id: &str, quantity: i64) -> DbResult<Snack> {
        if quantity <= 0 {
            return Err(DbError::CheckViolation {
                message: format!("restock quantity must be positive, got {quantity}"),
            });
        }

        let mut conn = self.pool.acquire().await?;
        return_stock(&mut conn, id, quantity).await?;

        let snack = fetch_snack(&mut *conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Snack", id))?;

        info!(id = %id, added = quantity, stock = snack.stock_quantity, "Snack restocked");
        Ok(snack)
    }

    /// Takes a snack off (or puts it back on) the menu.
    pub async fn set_available(&self, id: &str, available: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE snacks SET is_available = ?2 WHERE id = ?1")
            .bind(id)
            .bind(available)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Snack", id));
        }

        Ok(())
    }

    /// Counts snacks (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snacks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Shared Queries
// =============================================================================

pub(crate) async fn fetch_snack<'c>(
    executor: impl SqliteExecutor<'c>,
    id: &str,
) -> DbResult<Option<Snack>> {
    let snack = sqlx::query_as::<_, Snack>(
        r#"
        SELECT id, name, category, price_cents, stock_quantity, min_stock_level, is_available
        FROM snacks
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(snack)
}

/// Decrements stock only if enough is left. Returns `false` (and changes
/// nothing) when it isn't.
pub(crate) async fn take_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE snacks
        SET stock_quantity = stock_quantity - ?2
        WHERE id = ?1 AND stock_quantity >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Adds units back to stock (cancellation, restock).
pub(crate) async fn return_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE snacks SET stock_quantity = stock_quantity + ?2 WHERE id = ?1")
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Snack", id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Customer Repository
//!
//! Customers are labels attached to reservations, keyed by normalized email.
//! They are created on first use by the reservation transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use marquee_core::Customer;

/// Repository for customer lookups.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Finds a customer by email. Matching ignores case and surrounding
    /// whitespace.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        fetch_by_email(&self.pool, &email.trim().to_lowercase()).await
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, email, phone, created_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }
}

async fn fetch_by_email<'c>(
    executor: impl SqliteExecutor<'c>,
    email: &str,
) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        "SELECT id, email, phone, created_at FROM customers WHERE email = ?1",
    )
    .bind(email)
    .fetch_optional(executor)
    .await?;

    Ok(customer)
}

/// Looks up the customer for an already-normalized email, creating it if
/// needed. Must run inside the reservation's write transaction.
pub(crate) async fn find_or_create(
    conn: &mut SqliteConnection,
    email: &str,
    now: DateTime<Utc>,
) -> DbResult<Customer> {
    if let Some(existing) = fetch_by_email(&mut *conn, email).await? {
        return Ok(existing);
    }

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        phone: None,
        created_at: now,
    };

    debug!(id = %customer.id, "Creating customer");

    sqlx::query("INSERT INTO customers (id, email, phone, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&customer.id)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&mut *conn)
        .await?;

    Ok(customer)
}

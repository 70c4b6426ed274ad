//! Customer-profile repository.
//!
//! Profiles are strictly 1:1 with users (`customers.user_id` is unique).
//! Creation is always find-or-create: the profile may already exist from
//! registration, a staff edit, or an earlier checkout.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use clover_core::{CustomerId, UserId};

use super::RepositoryError;
use crate::models::Customer;

const CUSTOMER_COLUMNS: &str =
    "id, user_id, phone, address, city, state, postal_code, country, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    user_id: i64,
    phone: String,
    address: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId::new(row.id),
            user_id: UserId::new(row.user_id),
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for customer-profile database operations.
pub struct CustomerRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the profile belonging to a user, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user_id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = ?"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    /// Get the existing profile for a user, or create an empty one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_or_create(&self, user_id: UserId) -> Result<Customer, RepositoryError> {
        if let Some(existing) = self.get_by_user(user_id).await? {
            return Ok(existing);
        }
        match create_empty(self.pool, user_id).await {
            Ok(created) => Ok(created),
            // Lost a race with a concurrent creation; the unique index on
            // user_id guarantees the row we re-read is the only one.
            Err(RepositoryError::Conflict(_)) => self
                .get_by_user(user_id)
                .await?
                .ok_or(RepositoryError::NotFound),
            Err(other) => Err(other),
        }
    }

    /// Update every profile field. Partial-merge semantics live in the
    /// callers, which fill absent form fields from the existing profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn update(&self, customer: &Customer) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customers \
             SET phone = ?, address = ?, city = ?, state = ?, postal_code = ?, country = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.postal_code)
        .bind(&customer.country)
        .bind(Utc::now())
        .bind(customer.id.as_i64())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Transaction-scoped variant of [`Self::find_or_create`], used by
    /// checkout so the customer upsert rolls back with the rest of the order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_or_create_tx(
        conn: &mut SqliteConnection,
        user_id: UserId,
    ) -> Result<Customer, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE user_id = ?"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = row {
            return Ok(Customer::from(row));
        }

        let now = Utc::now();
        let row: CustomerRow = sqlx::query_as(&format!(
            "INSERT INTO customers (user_id, created_at, updated_at) VALUES (?, ?, ?) \
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(user_id.as_i64())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Customer::from(row))
    }

    /// Transaction-scoped variant of [`Self::update`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn update_tx(
        conn: &mut SqliteConnection,
        customer: &Customer,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customers \
             SET phone = ?, address = ?, city = ?, state = ?, postal_code = ?, country = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.city)
        .bind(&customer.state)
        .bind(&customer.postal_code)
        .bind(&customer.country)
        .bind(Utc::now())
        .bind(customer.id.as_i64())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}

async fn create_empty(pool: &SqlitePool, user_id: UserId) -> Result<Customer, RepositoryError> {
    let now = Utc::now();
    let row: CustomerRow = sqlx::query_as(&format!(
        "INSERT INTO customers (user_id, created_at, updated_at) VALUES (?, ?, ?) \
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(user_id.as_i64())
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::from_unique_violation(e, "customer profile already exists"))?;

    Ok(Customer::from(row))
}

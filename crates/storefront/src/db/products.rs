//! Product repository.
//!
//! Prices travel through SQLite as TEXT decimal strings; rows failing to
//! parse surface as `DataCorruption` rather than silently losing cents.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};

use clover_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::Product;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: String,
    description: String,
    stock: i64,
    category_id: Option<i64>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Decimal::from_str(&row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            description: row.description,
            stock: row.stock,
            category_id: row.category_id.map(CategoryId::new),
        })
    }
}

/// Catalog listing filter: category match and/or substring search.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Exact category match.
    pub category: Option<CategoryId>,
    /// Case-insensitive substring match against name OR description.
    pub search: Option<String>,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List products matching the filter, by name. No ranking, no pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut sql =
            String::from("SELECT id, name, price, description, stock, category_id FROM products");

        let mut clauses: Vec<&str> = Vec::new();
        if query.category.is_some() {
            clauses.push("category_id = ?");
        }
        if query.search.is_some() {
            clauses.push("(LOWER(name) LIKE ? OR LOWER(description) LIKE ?)");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY name");

        let mut q = sqlx::query_as::<_, ProductRow>(&sql);
        if let Some(category) = query.category {
            q = q.bind(category.as_i64());
        }
        if let Some(search) = &query.search {
            let pattern = format!("%{}%", search.to_lowercase());
            q = q.bind(pattern.clone()).bind(pattern);
        }

        let rows = q.fetch_all(self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored price is invalid.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price, description, stock, category_id FROM products WHERE id = ?",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Create a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        price: Decimal,
        description: &str,
        stock: i64,
        category_id: Option<CategoryId>,
    ) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(
            "INSERT INTO products (name, price, description, stock, category_id) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id, name, price, description, stock, category_id",
        )
        .bind(name)
        .bind(format!("{price:.2}"))
        .bind(description)
        .bind(stock)
        .bind(category_id.map(|id| id.as_i64()))
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "product name already exists"))?;

        Product::try_from(row)
    }

    /// Update an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is already taken.
    pub async fn update(
        &self,
        id: ProductId,
        name: &str,
        price: Decimal,
        description: &str,
        stock: i64,
        category_id: Option<CategoryId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET name = ?, price = ?, description = ?, stock = ?, category_id = ? \
             WHERE id = ?",
        )
        .bind(name)
        .bind(format!("{price:.2}"))
        .bind(description)
        .bind(stock)
        .bind(category_id.map(|id| id.as_i64()))
        .bind(id.as_i64())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "product name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Current stock of a product, inside an open transaction.
    ///
    /// Returns `None` if the product no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_tx(
        conn: &mut SqliteConnection,
        id: ProductId,
    ) -> Result<Option<i64>, RepositoryError> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&mut *conn)
            .await?;

        Ok(stock)
    }

    /// Conditionally decrement stock, inside an open transaction.
    ///
    /// The decrement only applies when at least `quantity` units remain
    /// (`stock >= quantity`), which is what makes concurrent checkouts for
    /// the same product safe: the guard and the write are one statement.
    ///
    /// # Returns
    ///
    /// Returns `true` if the stock was decremented, `false` if the product
    /// is missing or has insufficient stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn decrement_stock_tx(
        conn: &mut SqliteConnection,
        id: ProductId,
        quantity: i64,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
                .bind(quantity)
                .bind(id.as_i64())
                .bind(quantity)
                .execute(&mut *conn)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

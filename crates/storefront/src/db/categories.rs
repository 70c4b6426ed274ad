//! Category repository.

use sqlx::SqlitePool;

use clover_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all categories, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM categories ORDER BY name")
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Get a category by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM categories WHERE id = ?")
                .bind(id.as_i64())
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Category::from))
    }

    /// Create a new category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO categories (name, description) VALUES (?, ?) \
             RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "category name already exists"))?;

        Ok(Category::from(row))
    }

    /// Update an existing category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new name is already taken.
    pub async fn update(
        &self,
        id: CategoryId,
        name: &str,
        description: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE categories SET name = ?, description = ? WHERE id = ?")
            .bind(name)
            .bind(description)
            .bind(id.as_i64())
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_unique_violation(e, "category name already exists")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a category. Products in the category are cascade-deleted.
    ///
    /// # Returns
    ///
    /// Returns `true` if the category was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use domains::{Category, CategoryId, CategoryRepository, CategorySummary, DomainError, DomainResult};

use super::{map_sqlx, PgStore};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: i64,
    name: String,
    card_count: i64,
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn list(&self) -> DomainResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn list_with_counts(&self) -> DomainResult<Vec<CategorySummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT cat.id, cat.name, COUNT(c.id) AS card_count \
             FROM categories cat LEFT JOIN cards c ON c.category_id = cat.id \
             GROUP BY cat.id, cat.name ORDER BY cat.name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows
            .into_iter()
            .map(|row| CategorySummary {
                category: Category {
                    id: row.id,
                    name: row.name,
                },
                card_count: row.card_count,
            })
            .collect())
    }

    async fn find(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Category::from))
    }

    async fn create(&self, name: &str) -> DomainResult<Category> {
        let row: CategoryRow =
            sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.into())
    }

    /// Cards and their `card_tags` rows go with the category through
    /// `ON DELETE CASCADE`; tag rows stay.
    async fn delete(&self, id: CategoryId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("category", id));
        }
        Ok(())
    }
}

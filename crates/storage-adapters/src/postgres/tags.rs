use async_trait::async_trait;
use domains::{CardId, DomainError, DomainResult, Tag, TagId, TagRepository};

use super::{is_foreign_key_violation, map_sqlx, PgStore};

#[derive(sqlx::FromRow)]
struct TagRow {
    id: i64,
    name: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Tag {
            id: row.id,
            name: row.name,
        }
    }
}

#[async_trait]
impl TagRepository for PgStore {
    async fn find(&self, id: TagId) -> DomainResult<Option<Tag>> {
        let row: Option<TagRow> = sqlx::query_as("SELECT id, name FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Tag::from))
    }

    async fn tags_for_card(&self, card_id: CardId) -> DomainResult<Vec<Tag>> {
        let rows: Vec<TagRow> = sqlx::query_as(
            "SELECT t.id, t.name FROM tags t \
             JOIN card_tags ct ON ct.tag_id = t.id \
             WHERE ct.card_id = $1 ORDER BY t.name",
        )
        .bind(card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    /// The unique index on `tags.name` makes concurrent creation of the same
    /// name collapse to one row.
    async fn get_or_create(&self, name: &str) -> DomainResult<Tag> {
        sqlx::query("INSERT INTO tags (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        let row: TagRow = sqlx::query_as("SELECT id, name FROM tags WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn link(&self, card_id: CardId, tag_id: TagId) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO card_tags (card_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(card_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                DomainError::not_found("card", card_id)
            } else {
                map_sqlx(err)
            }
        })?;
        Ok(())
    }

    async fn unlink(&self, card_id: CardId, tag_id: TagId) -> DomainResult<()> {
        sqlx::query("DELETE FROM card_tags WHERE card_id = $1 AND tag_id = $2")
            .bind(card_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(())
    }
}

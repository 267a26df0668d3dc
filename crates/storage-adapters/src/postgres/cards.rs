use async_trait::async_trait;
use domains::{
    check_page_number, Card, CardChanges, CardDetail, CardId, CardQuery, CardRepository,
    CardStatus, DomainError, DomainResult, NewCard, Page,
};
use tracing::debug;

use super::catalog::{self, CardRow, CARD_SELECT};
use super::{map_sqlx, PgStore};

const CARD_RETURNING: &str =
    "RETURNING id, question, answer, category_id, upload_date, views, favorites, status, author_id";

#[derive(sqlx::FromRow)]
struct PlainCardRow {
    id: i64,
    question: String,
    answer: String,
    category_id: i64,
    upload_date: chrono::DateTime<chrono::Utc>,
    views: i64,
    favorites: i64,
    status: bool,
    author_id: Option<i64>,
}

impl From<PlainCardRow> for Card {
    fn from(row: PlainCardRow) -> Self {
        Card {
            id: row.id,
            question: row.question,
            answer: row.answer,
            category_id: row.category_id,
            upload_date: row.upload_date,
            views: row.views,
            favorites: row.favorites,
            status: CardStatus::from_checked(row.status),
            author_id: row.author_id,
        }
    }
}

impl PgStore {
    async fn details(&self, rows: Vec<CardRow>) -> DomainResult<Vec<CardDetail>> {
        let ids: Vec<CardId> = rows.iter().map(|r| r.id()).collect();
        let mut tags = catalog::load_tags(&self.pool, &ids).await.map_err(map_sqlx)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let (card, category, author) = row.into_parts();
                CardDetail {
                    tags: tags.remove(&card.id).unwrap_or_default(),
                    card,
                    category,
                    author,
                }
            })
            .collect())
    }
}

#[async_trait]
impl CardRepository for PgStore {
    async fn create(&self, card: NewCard) -> DomainResult<Card> {
        let row: PlainCardRow = sqlx::query_as(&format!(
            "INSERT INTO cards (question, answer, category_id, author_id) \
             VALUES ($1, $2, $3, $4) {CARD_RETURNING}"
        ))
        .bind(&card.question)
        .bind(&card.answer)
        .bind(card.category_id)
        .bind(card.author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn update(&self, id: CardId, changes: CardChanges) -> DomainResult<Card> {
        let row: Option<PlainCardRow> = sqlx::query_as(&format!(
            "UPDATE cards SET question = $2, answer = $3, category_id = $4, \
             status = COALESCE($5, status) WHERE id = $1 {CARD_RETURNING}"
        ))
        .bind(id)
        .bind(&changes.question)
        .bind(&changes.answer)
        .bind(changes.category_id)
        .bind(changes.status.map(CardStatus::is_checked))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Card::from)
            .ok_or_else(|| DomainError::not_found("card", id))
    }

    async fn delete(&self, id: CardId) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("card", id));
        }
        Ok(())
    }

    async fn find(&self, id: CardId) -> DomainResult<Option<Card>> {
        let row: Option<PlainCardRow> = sqlx::query_as(
            "SELECT id, question, answer, category_id, upload_date, views, favorites, status, author_id \
             FROM cards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Card::from))
    }

    async fn find_detail(&self, id: CardId) -> DomainResult<Option<CardDetail>> {
        let row: Option<CardRow> = sqlx::query_as(&format!("{CARD_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        match row {
            Some(row) => Ok(self.details(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn increment_views(&self, id: CardId) -> DomainResult<i64> {
        let views: Option<i64> =
            sqlx::query_scalar("UPDATE cards SET views = views + 1 WHERE id = $1 RETURNING views")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        views.ok_or_else(|| DomainError::not_found("card", id))
    }

    async fn list(&self, query: &CardQuery) -> DomainResult<Page<CardDetail>> {
        let total: i64 = catalog::count_sql(query)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| catalog::map_list_error(query, e))?;
        let total_items = u64::try_from(total).unwrap_or_default();
        check_page_number(query.page, total_items, query.per_page)?;

        let rows: Vec<CardRow> = catalog::page_sql(query)
            .build_query_as::<CardRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| catalog::map_list_error(query, e))?;
        debug!(total_items, rows = rows.len(), page = query.page, "card page loaded");
        Ok(Page {
            items: self.details(rows).await?,
            number: query.page,
            per_page: query.per_page,
            total_items,
        })
    }

    async fn count(&self) -> DomainResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cards")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn set_status(&self, ids: &[CardId], status: CardStatus) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE cards SET status = $1 WHERE id = ANY($2) AND status <> $1",
        )
        .bind(status.is_checked())
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }
}

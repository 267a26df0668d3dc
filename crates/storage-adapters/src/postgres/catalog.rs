//! SQL for card listings.
//!
//! Every listing is two statements plus one batch: a `COUNT(*)` with the
//! filters, the page rows joined with category and author, then all tags
//! of the page's cards in a single `ANY($1)` query. Search over tag names
//! uses `EXISTS`, so rows are never duplicated and need no `DISTINCT`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use domains::{
    Card, CardId, CardQuery, CardStatus, Category, DomainError, Tag, TextSearch, CODE_FENCE,
};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{map_sqlx, sqlstate, INVALID_REGULAR_EXPRESSION};

pub(crate) const CARD_SELECT: &str = "SELECT c.id, c.question, c.answer, c.category_id, \
     c.upload_date, c.views, c.favorites, c.status, c.author_id, \
     cat.name AS category_name, u.username AS author_name \
     FROM cards c \
     JOIN categories cat ON cat.id = c.category_id \
     LEFT JOIN users u ON u.id = c.author_id";

#[derive(Debug, FromRow)]
pub(crate) struct CardRow {
    id: i64,
    question: String,
    answer: String,
    category_id: i64,
    upload_date: DateTime<Utc>,
    views: i64,
    favorites: i64,
    status: bool,
    author_id: Option<i64>,
    category_name: String,
    author_name: Option<String>,
}

impl CardRow {
    pub(crate) fn id(&self) -> CardId {
        self.id
    }

    pub(crate) fn into_parts(self) -> (Card, Category, Option<String>) {
        let card = Card {
            id: self.id,
            question: self.question,
            answer: self.answer,
            category_id: self.category_id,
            upload_date: self.upload_date,
            views: self.views,
            favorites: self.favorites,
            status: CardStatus::from_checked(self.status),
            author_id: self.author_id,
        };
        let category = Category {
            id: self.category_id,
            name: self.category_name,
        };
        (card, category, self.author_name)
    }
}

#[derive(Debug, FromRow)]
struct CardTagRow {
    card_id: i64,
    id: i64,
    name: String,
}

/// `COUNT(*)` of the cards matching the query's filters and search.
pub fn count_sql(query: &CardQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM cards c");
    push_conditions(&mut qb, query);
    qb
}

/// One page of matching rows, ordered and limited.
pub fn page_sql(query: &CardQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(CARD_SELECT);
    push_conditions(&mut qb, query);
    // sort column comes from a closed enum, never from raw input
    let direction = query.direction.as_sql();
    qb.push(format!(
        " ORDER BY c.{} {direction}, c.id {direction}",
        query.sort.as_str()
    ));
    qb.push(" LIMIT ")
        .push_bind(i64::from(query.per_page))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
    qb
}

fn push_conditions(qb: &mut QueryBuilder<'static, Postgres>, query: &CardQuery) {
    qb.push(" WHERE TRUE");
    let filter = &query.filter;
    if let Some(id) = filter.category_id {
        qb.push(" AND c.category_id = ").push_bind(id);
    }
    if let Some(id) = filter.tag_id {
        qb.push(" AND EXISTS (SELECT 1 FROM card_tags ct WHERE ct.card_id = c.id AND ct.tag_id = ")
            .push_bind(id)
            .push(")");
    }
    if let Some(id) = filter.author_id {
        qb.push(" AND c.author_id = ").push_bind(id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND c.status = ").push_bind(status.is_checked());
    }
    if let Some(flag) = filter.has_code {
        qb.push(" AND (strpos(c.answer, ")
            .push_bind(CODE_FENCE)
            .push(") > 0) = ")
            .push_bind(flag);
    }
    if let Some(since) = filter.uploaded_since {
        qb.push(" AND c.upload_date >= ").push_bind(since);
    }
    match &query.search {
        Some(TextSearch::Pattern(pattern)) => {
            let source = pattern.as_str().to_string();
            qb.push(" AND (c.question ~* ")
                .push_bind(source.clone())
                .push(" OR c.answer ~* ")
                .push_bind(source.clone())
                .push(
                    " OR EXISTS (SELECT 1 FROM card_tags ct JOIN tags t ON t.id = ct.tag_id \
                     WHERE ct.card_id = c.id AND t.name ~* ",
                )
                .push_bind(source)
                .push("))");
        }
        Some(TextSearch::Contains(needle)) => {
            let like = format!("%{}%", escape_like(needle));
            qb.push(" AND (c.question ILIKE ")
                .push_bind(like.clone())
                .push(" OR c.answer ILIKE ")
                .push_bind(like)
                .push(")");
        }
        None => {}
    }
}

/// Error mapping for listing statements.
///
/// `~*` runs Postgres' own regex dialect, which rejects some patterns the
/// `regex` crate accepts (`\z`, inline flags, `\p{..}` classes). Those fail
/// with SQLSTATE 2201B and are reported against the search field.
pub(crate) fn map_list_error(query: &CardQuery, err: sqlx::Error) -> DomainError {
    match rejected_pattern(query, sqlstate(&err).as_deref()) {
        Some(invalid) => {
            debug!(error = %err, "search pattern rejected by the database");
            invalid
        }
        None => map_sqlx(err),
    }
}

fn rejected_pattern(query: &CardQuery, code: Option<&str>) -> Option<DomainError> {
    match (&query.search, code) {
        (Some(TextSearch::Pattern(pattern)), Some(INVALID_REGULAR_EXPRESSION)) => {
            Some(DomainError::invalid(
                "search_query",
                format!("'{}' is not a valid search pattern", pattern.as_str()),
            ))
        }
        _ => None,
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Tags for every card in `card_ids`, grouped by card and sorted by name.
pub(crate) async fn load_tags(
    pool: &PgPool,
    card_ids: &[CardId],
) -> Result<HashMap<CardId, Vec<Tag>>, sqlx::Error> {
    let mut grouped: HashMap<CardId, Vec<Tag>> = HashMap::new();
    if card_ids.is_empty() {
        return Ok(grouped);
    }
    let rows: Vec<CardTagRow> = sqlx::query_as(
        "SELECT ct.card_id, t.id, t.name FROM card_tags ct \
         JOIN tags t ON t.id = ct.tag_id \
         WHERE ct.card_id = ANY($1) ORDER BY t.name",
    )
    .bind(card_ids)
    .fetch_all(pool)
    .await?;
    for row in rows {
        grouped.entry(row.card_id).or_default().push(Tag {
            id: row.id,
            name: row.name,
        });
    }
    Ok(grouped)
}

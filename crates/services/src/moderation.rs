//! Moderation back-office: card review list, bulk status changes,
//! moderator edits and category management.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use domains::{
    CardChanges, CardDetail, CardFilter, CardId, CardQuery, CardRepository, CardStatus, Category,
    CategoryId, CategoryRepository, DomainError, DomainResult, Page, SortDirection, SortField,
    TextSearch, User, ValidationErrors, ANSWER_MAX_LEN, CATEGORY_NAME_MAX_LEN,
    MODERATION_PAGE_SIZE, QUESTION_MAX_LEN,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::parse_page;

/// Bulk actions offered on the review list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    SetChecked,
    SetUnchecked,
}

impl ModerationAction {
    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "set_checked" => Ok(Self::SetChecked),
            "set_unchecked" => Ok(Self::SetUnchecked),
            other => Err(DomainError::invalid("action", format!("unknown action '{other}'"))),
        }
    }

    pub fn target(self) -> CardStatus {
        match self {
            Self::SetChecked => CardStatus::Checked,
            Self::SetUnchecked => CardStatus::Unchecked,
        }
    }
}

/// Upload-date buckets of the review list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadWindow {
    Today,
    PastWeek,
    ThisMonth,
    ThisYear,
}

impl UploadWindow {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "today" => Some(Self::Today),
            "week" => Some(Self::PastWeek),
            "month" => Some(Self::ThisMonth),
            "year" => Some(Self::ThisYear),
            _ => None,
        }
    }

    /// Earliest upload time inside the window, relative to `now`.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = |y: i32, m: u32, d: u32| {
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
                .single()
                .unwrap_or(now)
        };
        match self {
            Self::Today => midnight(now.year(), now.month(), now.day()),
            Self::PastWeek => now - Duration::days(7),
            Self::ThisMonth => midnight(now.year(), now.month(), 1),
            Self::ThisYear => midnight(now.year(), 1, 1),
        }
    }
}

/// Review-list query-string parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationParams {
    /// Substring searched in question and answer
    pub q: Option<String>,
    pub category: Option<String>,
    /// `checked` or `unchecked`
    pub status: Option<String>,
    /// `yes` or `no`
    pub has_code: Option<String>,
    /// `today`, `week`, `month` or `year`
    pub uploaded: Option<String>,
    pub page: Option<String>,
}

impl ModerationParams {
    /// Builds the review query; unrecognised filter values are ignored.
    pub fn to_query(&self, now: DateTime<Utc>) -> DomainResult<CardQuery> {
        let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        let filter = CardFilter {
            category_id: non_empty(&self.category).and_then(|c| c.parse().ok()),
            status: match non_empty(&self.status).as_deref() {
                Some("checked") => Some(CardStatus::Checked),
                Some("unchecked") => Some(CardStatus::Unchecked),
                _ => None,
            },
            has_code: match non_empty(&self.has_code).as_deref() {
                Some("yes") => Some(true),
                Some("no") => Some(false),
                _ => None,
            },
            uploaded_since: non_empty(&self.uploaded)
                .and_then(|u| UploadWindow::parse(&u))
                .map(|w| w.since(now)),
            ..CardFilter::default()
        };
        Ok(CardQuery {
            sort: SortField::UploadDate,
            direction: SortDirection::Descending,
            search: non_empty(&self.q).map(TextSearch::Contains),
            filter,
            page: parse_page(self.page.as_deref())?,
            per_page: MODERATION_PAGE_SIZE,
        })
    }
}

/// Moderator edit form; unlike the public form it carries the status and
/// leaves tags alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModeratorCardForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub category: String,
    /// Checkbox: present when checked
    pub status: Option<String>,
}

impl ModeratorCardForm {
    pub fn from_detail(detail: &CardDetail) -> Self {
        Self {
            question: detail.card.question.clone(),
            answer: detail.card.answer.clone(),
            category: detail.category.id.to_string(),
            status: detail.card.status.is_checked().then(|| "on".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone)]
pub struct ModerationService {
    cards: Arc<dyn CardRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl ModerationService {
    pub fn new(cards: Arc<dyn CardRepository>, categories: Arc<dyn CategoryRepository>) -> Self {
        Self { cards, categories }
    }

    pub async fn review_list(&self, actor: &User, params: &ModerationParams) -> DomainResult<Page<CardDetail>> {
        ensure_moderator(actor)?;
        let query = params.to_query(Utc::now())?;
        self.cards.list(&query).await
    }

    /// Applies a bulk action and returns the number of cards changed.
    pub async fn apply(&self, actor: &User, action: ModerationAction, ids: &[CardId]) -> DomainResult<u64> {
        ensure_moderator(actor)?;
        if ids.is_empty() {
            return Err(DomainError::invalid("ids", "select at least one card"));
        }
        let changed = self.cards.set_status(ids, action.target()).await?;
        info!(actor = %actor.username, ?action, changed, "moderation action applied");
        Ok(changed)
    }

    pub async fn card(&self, actor: &User, id: CardId) -> DomainResult<CardDetail> {
        ensure_moderator(actor)?;
        self.cards
            .find_detail(id)
            .await?
            .ok_or_else(|| DomainError::not_found("card", id))
    }

    pub async fn edit(&self, actor: &User, id: CardId, form: &ModeratorCardForm) -> DomainResult<CardDetail> {
        self.card(actor, id).await?;

        let mut errors = ValidationErrors::new();
        let question = form.question.trim();
        if question.is_empty() || question.chars().count() > QUESTION_MAX_LEN {
            errors.push("question", format!("between 1 and {QUESTION_MAX_LEN} characters required"));
        }
        let answer = form.answer.trim();
        if answer.is_empty() || answer.chars().count() > ANSWER_MAX_LEN {
            errors.push("answer", format!("between 1 and {ANSWER_MAX_LEN} characters required"));
        }
        let category = match form.category.trim().parse::<CategoryId>() {
            Ok(cid) => self.categories.find(cid).await?,
            Err(_) => None,
        };
        if category.is_none() {
            errors.push("category", "select a valid category");
        }
        errors.into_result()?;
        let category = category.ok_or_else(|| DomainError::invalid("category", "select a valid category"))?;

        let status = CardStatus::from_checked(form.status.is_some());
        self.cards
            .update(
                id,
                CardChanges {
                    question: question.to_string(),
                    answer: answer.to_string(),
                    category_id: category.id,
                    status: Some(status),
                },
            )
            .await?;
        info!(card_id = id, actor = %actor.username, status = status.label(), "card moderated");
        self.card(actor, id).await
    }

    pub async fn categories(&self, actor: &User) -> DomainResult<Vec<Category>> {
        ensure_moderator(actor)?;
        self.categories.list().await
    }

    pub async fn create_category(&self, actor: &User, form: &CategoryForm) -> DomainResult<Category> {
        ensure_moderator(actor)?;
        let name = form.name.trim();
        if name.is_empty() || name.chars().count() > CATEGORY_NAME_MAX_LEN {
            return Err(DomainError::invalid(
                "name",
                format!("between 1 and {CATEGORY_NAME_MAX_LEN} characters required"),
            ));
        }
        let category = self.categories.create(name).await?;
        info!(category_id = category.id, actor = %actor.username, "category created");
        Ok(category)
    }

    /// Deletes a category and, through the cascade, every card in it.
    pub async fn delete_category(&self, actor: &User, id: CategoryId) -> DomainResult<()> {
        ensure_moderator(actor)?;
        self.categories.delete(id).await?;
        warn!(category_id = id, actor = %actor.username, "category deleted with its cards");
        Ok(())
    }
}

fn ensure_moderator(actor: &User) -> DomainResult<()> {
    if actor.role.can_moderate() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "{} is not a moderator",
            actor.username
        )))
    }
}

//! Card lifecycle: create, read (with view counting), edit, delete.

use std::collections::BTreeSet;
use std::sync::Arc;

use domains::{
    CardChanges, CardCreated, CardDetail, CardId, CardRepository, Category,
    CategoryId, CategoryRepository, DomainError, DomainResult, NewCard, Notifier, User,
    ValidationErrors, ANSWER_MAX_LEN, QUESTION_MAX_LEN,
};
use serde::Deserialize;
use tracing::info;

use crate::tags::{parse_tag_input, TagReconciler};

/// Card submission as it arrives from the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    /// Selected category id; empty when nothing was chosen
    #[serde(default)]
    pub category: String,
    /// Comma-separated tag names
    #[serde(default)]
    pub tags: String,
}

impl CardForm {
    /// Pre-fills the form from an existing card.
    pub fn from_detail(detail: &CardDetail) -> Self {
        Self {
            question: detail.card.question.clone(),
            answer: detail.card.answer.clone(),
            category: detail.category.id.to_string(),
            tags: detail.tag_names().join(","),
        }
    }
}

/// A card form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCard {
    pub question: String,
    pub answer: String,
    pub category_id: CategoryId,
    pub tags: BTreeSet<String>,
}

/// Checks every field without touching storage except the category lookup.
pub async fn validate_card_form(
    form: &CardForm,
    categories: &dyn CategoryRepository,
) -> DomainResult<(ValidCard, Category)> {
    let mut errors = ValidationErrors::new();

    let question = form.question.trim();
    if question.is_empty() {
        errors.push("question", "this field is required");
    } else if question.chars().count() > QUESTION_MAX_LEN {
        errors.push(
            "question",
            format!("at most {QUESTION_MAX_LEN} characters allowed"),
        );
    }

    let answer = form.answer.trim();
    if answer.is_empty() {
        errors.push("answer", "this field is required");
    } else if answer.chars().count() > ANSWER_MAX_LEN {
        errors.push("answer", format!("at most {ANSWER_MAX_LEN} characters allowed"));
    }

    let tags = match parse_tag_input(&form.tags) {
        Ok(tags) => tags,
        Err(DomainError::Validation(tag_errors)) => {
            for err in tag_errors.iter() {
                errors.push("tags", err.message.clone());
            }
            BTreeSet::new()
        }
        Err(other) => return Err(other),
    };

    let category = match form.category.trim().parse::<CategoryId>() {
        Ok(id) => categories.find(id).await?,
        Err(_) => None,
    };
    if category.is_none() {
        errors.push("category", "select a valid category");
    }

    errors.into_result()?;
    let category = category.ok_or_else(|| DomainError::invalid("category", "select a valid category"))?;
    Ok((
        ValidCard {
            question: question.to_string(),
            answer: answer.to_string(),
            category_id: category.id,
            tags,
        },
        category,
    ))
}

#[derive(Clone)]
pub struct CardService {
    cards: Arc<dyn CardRepository>,
    categories: Arc<dyn CategoryRepository>,
    reconciler: TagReconciler,
    notifier: Arc<dyn Notifier>,
}

impl CardService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        categories: Arc<dyn CategoryRepository>,
        reconciler: TagReconciler,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cards,
            categories,
            reconciler,
            notifier,
        }
    }

    /// Categories offered by the card form.
    pub async fn categories(&self) -> DomainResult<Vec<Category>> {
        self.categories.list().await
    }

    /// Validates, stores the card, links its tags and notifies.
    pub async fn create(&self, author: &User, form: &CardForm) -> DomainResult<CardDetail> {
        let (valid, category) = validate_card_form(form, self.categories.as_ref()).await?;

        let card = self
            .cards
            .create(NewCard {
                question: valid.question,
                answer: valid.answer,
                category_id: valid.category_id,
                author_id: Some(author.id),
            })
            .await?;
        let tags = self.reconciler.reconcile(card.id, &valid.tags).await?;
        info!(card_id = card.id, author = %author.username, "card created");

        self.notifier.card_created(CardCreated {
            card_id: card.id,
            author: Some(author.username.clone()),
            category: category.name.clone(),
            question: card.question.clone(),
        });

        Ok(CardDetail {
            card,
            category,
            tags,
            author: Some(author.username.clone()),
        })
    }

    /// Detail read: bumps the view counter, then loads the card.
    pub async fn view(&self, id: CardId) -> DomainResult<CardDetail> {
        self.cards.increment_views(id).await?;
        self.load(id).await
    }

    /// Loads a card for editing, enforcing ownership.
    pub async fn for_edit(&self, actor: &User, id: CardId) -> DomainResult<CardDetail> {
        let detail = self.load(id).await?;
        ensure_can_manage(actor, &detail)?;
        Ok(detail)
    }

    pub async fn update(&self, actor: &User, id: CardId, form: &CardForm) -> DomainResult<CardDetail> {
        self.for_edit(actor, id).await?;
        let (valid, _) = validate_card_form(form, self.categories.as_ref()).await?;

        self.cards
            .update(
                id,
                CardChanges {
                    question: valid.question,
                    answer: valid.answer,
                    category_id: valid.category_id,
                    status: None,
                },
            )
            .await?;
        self.reconciler.reconcile(id, &valid.tags).await?;
        info!(card_id = id, actor = %actor.username, "card updated");
        self.load(id).await
    }

    pub async fn delete(&self, actor: &User, id: CardId) -> DomainResult<()> {
        let detail = self.for_edit(actor, id).await?;
        self.cards.delete(detail.card.id).await?;
        info!(card_id = id, actor = %actor.username, "card deleted");
        Ok(())
    }

    async fn load(&self, id: CardId) -> DomainResult<CardDetail> {
        self.cards
            .find_detail(id)
            .await?
            .ok_or_else(|| DomainError::not_found("card", id))
    }
}

fn ensure_can_manage(actor: &User, detail: &CardDetail) -> DomainResult<()> {
    if actor.can_manage(&detail.card) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "{} may not change card {}",
            actor.username, detail.card.id
        )))
    }
}

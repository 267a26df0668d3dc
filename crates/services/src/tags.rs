//! Tag input parsing and card/tag reconciliation.

use std::collections::BTreeSet;
use std::sync::Arc;

use domains::{
    CardId, CardRepository, DomainError, DomainResult, Tag, TagRepository, TAG_NAME_MAX_LEN,
};
use tracing::info;

/// Splits a comma-separated tag field into normalized tag names.
///
/// Tokens are trimmed and lowercased, empty tokens are dropped and duplicates
/// collapse. A token with whitespace inside it is rejected outright.
pub fn parse_tag_input(raw: &str) -> DomainResult<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid(
                "tags",
                format!("tags must not contain spaces: '{token}'"),
            ));
        }
        if token.chars().count() > TAG_NAME_MAX_LEN {
            return Err(DomainError::invalid(
                "tags",
                format!("tag '{token}' is longer than {TAG_NAME_MAX_LEN} characters"),
            ));
        }
        names.insert(token.to_lowercase());
    }
    Ok(names)
}

/// Brings a card's tag links to exactly a target set of names.
#[derive(Clone)]
pub struct TagReconciler {
    cards: Arc<dyn CardRepository>,
    tags: Arc<dyn TagRepository>,
}

impl TagReconciler {
    pub fn new(cards: Arc<dyn CardRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { cards, tags }
    }

    /// Unlinks every tag missing from `desired`, then get-or-creates and links
    /// each desired name. Tag rows are never deleted, so tags that lose their
    /// last card stay behind. Returns the card's tags sorted by name.
    ///
    /// An unknown card is [`DomainError::NotFound`] and touches no tag rows.
    pub async fn reconcile(&self, card_id: CardId, desired: &BTreeSet<String>) -> DomainResult<Vec<Tag>> {
        if self.cards.find(card_id).await?.is_none() {
            return Err(DomainError::not_found("card", card_id));
        }
        let desired: BTreeSet<String> = desired.iter().map(|n| n.to_lowercase()).collect();
        let existing = self.tags.tags_for_card(card_id).await?;

        let mut removed = 0usize;
        for tag in existing.iter().filter(|t| !desired.contains(&t.name)) {
            self.tags.unlink(card_id, tag.id).await?;
            removed += 1;
        }

        let mut linked = Vec::with_capacity(desired.len());
        for name in &desired {
            let tag = self.tags.get_or_create(name).await?;
            self.tags.link(card_id, tag.id).await?;
            linked.push(tag);
        }

        info!(card_id, removed, total = linked.len(), "card tags reconciled");
        Ok(linked)
    }
}

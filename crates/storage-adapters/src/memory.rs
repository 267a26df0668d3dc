//! In-memory implementation of every repository port.
//!
//! All state sits behind one `tokio::sync::RwLock`, so each write (view
//! increments included) is atomic with respect to every other operation.
//! Used by the test suites and by the database-less demo mode.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domains::{
    check_page_number, Card, CardChanges, CardDetail, CardId, CardQuery, CardRepository,
    CardStatus, Category, CategoryId, CategoryRepository, CategorySummary, DomainError,
    DomainResult, NewCard, NewUser, Page, ProfileChanges, Tag, TagId, TagRepository, User,
    UserId, UserRepository,
};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    cards: BTreeMap<CardId, Card>,
    tags: BTreeMap<TagId, Tag>,
    card_tags: BTreeSet<(CardId, TagId)>,
    categories: BTreeMap<CategoryId, Category>,
    users: BTreeMap<UserId, User>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Tags of one card, sorted by name.
    fn tags_of(&self, card_id: CardId) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self
            .card_tags
            .range((card_id, TagId::MIN)..=(card_id, TagId::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    fn detail(&self, card: &Card) -> DomainResult<CardDetail> {
        let category = self
            .categories
            .get(&card.category_id)
            .cloned()
            .ok_or_else(|| DomainError::internal(format!("card {} has no category", card.id)))?;
        Ok(CardDetail {
            card: card.clone(),
            category,
            tags: self.tags_of(card.id),
            author: card
                .author_id
                .and_then(|id| self.users.get(&id))
                .map(|u| u.username.clone()),
        })
    }

    fn ensure_category(&self, id: CategoryId) -> DomainResult<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(DomainError::invalid("category", "select a valid category"))
        }
    }

    fn remove_card(&mut self, id: CardId) {
        self.cards.remove(&id);
        self.card_tags.retain(|(card_id, _)| *card_id != id);
    }

    fn ensure_unique_user(&self, username: &str, email: Option<&str>, except: Option<UserId>) -> DomainResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.username == username {
                return Err(DomainError::Conflict(format!("username '{username}' is taken")));
            }
            if email.is_some() && user.email.as_deref() == email {
                return Err(DomainError::Conflict("that e-mail address is already in use".into()));
            }
        }
        Ok(())
    }
}

/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRepository for MemoryStore {
    async fn create(&self, card: NewCard) -> DomainResult<Card> {
        let mut state = self.state.write().await;
        state.ensure_category(card.category_id)?;
        let id = state.next_id();
        let card = Card {
            id,
            question: card.question,
            answer: card.answer,
            category_id: card.category_id,
            upload_date: Utc::now(),
            views: 0,
            favorites: 0,
            status: CardStatus::Unchecked,
            author_id: card.author_id,
        };
        state.cards.insert(id, card.clone());
        Ok(card)
    }

    async fn update(&self, id: CardId, changes: CardChanges) -> DomainResult<Card> {
        let mut state = self.state.write().await;
        state.ensure_category(changes.category_id)?;
        let card = state
            .cards
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("card", id))?;
        card.question = changes.question;
        card.answer = changes.answer;
        card.category_id = changes.category_id;
        if let Some(status) = changes.status {
            card.status = status;
        }
        Ok(card.clone())
    }

    async fn delete(&self, id: CardId) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if !state.cards.contains_key(&id) {
            return Err(DomainError::not_found("card", id));
        }
        state.remove_card(id);
        Ok(())
    }

    async fn find(&self, id: CardId) -> DomainResult<Option<Card>> {
        Ok(self.state.read().await.cards.get(&id).cloned())
    }

    async fn find_detail(&self, id: CardId) -> DomainResult<Option<CardDetail>> {
        let state = self.state.read().await;
        state.cards.get(&id).map(|card| state.detail(card)).transpose()
    }

    async fn increment_views(&self, id: CardId) -> DomainResult<i64> {
        let mut state = self.state.write().await;
        let card = state
            .cards
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("card", id))?;
        card.views += 1;
        Ok(card.views)
    }

    async fn list(&self, query: &CardQuery) -> DomainResult<Page<CardDetail>> {
        let state = self.state.read().await;
        let mut matching: Vec<&Card> = state
            .cards
            .values()
            .filter(|card| query.matches(card, &state.tags_of(card.id)))
            .collect();
        let total_items = matching.len() as u64;
        check_page_number(query.page, total_items, query.per_page)?;

        matching.sort_by(|a, b| query.compare(a, b));
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.per_page as usize)
            .map(|card| state.detail(card))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Page {
            items,
            number: query.page,
            per_page: query.per_page,
            total_items,
        })
    }

    async fn count(&self) -> DomainResult<i64> {
        Ok(self.state.read().await.cards.len() as i64)
    }

    async fn set_status(&self, ids: &[CardId], status: CardStatus) -> DomainResult<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for id in ids {
            if let Some(card) = state.cards.get_mut(id) {
                if card.status != status {
                    card.status = status;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn find(&self, id: TagId) -> DomainResult<Option<Tag>> {
        Ok(self.state.read().await.tags.get(&id).cloned())
    }

    async fn tags_for_card(&self, card_id: CardId) -> DomainResult<Vec<Tag>> {
        Ok(self.state.read().await.tags_of(card_id))
    }

    async fn get_or_create(&self, name: &str) -> DomainResult<Tag> {
        let mut state = self.state.write().await;
        if let Some(tag) = state.tags.values().find(|t| t.name == name) {
            return Ok(tag.clone());
        }
        let id = state.next_id();
        let tag = Tag {
            id,
            name: name.to_string(),
        };
        state.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn link(&self, card_id: CardId, tag_id: TagId) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if !state.cards.contains_key(&card_id) {
            return Err(DomainError::not_found("card", card_id));
        }
        if !state.tags.contains_key(&tag_id) {
            return Err(DomainError::not_found("tag", tag_id));
        }
        state.card_tags.insert((card_id, tag_id));
        Ok(())
    }

    async fn unlink(&self, card_id: CardId, tag_id: TagId) -> DomainResult<()> {
        self.state.write().await.card_tags.remove(&(card_id, tag_id));
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list(&self) -> DomainResult<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_with_counts(&self) -> DomainResult<Vec<CategorySummary>> {
        let state = self.state.read().await;
        let mut summaries: Vec<CategorySummary> = state
            .categories
            .values()
            .map(|category| CategorySummary {
                category: category.clone(),
                card_count: state
                    .cards
                    .values()
                    .filter(|c| c.category_id == category.id)
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(summaries)
    }

    async fn find(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn create(&self, name: &str) -> DomainResult<Category> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let category = Category {
            id,
            name: name.to_string(),
        };
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete(&self, id: CategoryId) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Err(DomainError::not_found("category", id));
        }
        let doomed: Vec<CardId> = state
            .cards
            .values()
            .filter(|c| c.category_id == id)
            .map(|c| c.id)
            .collect();
        for card_id in doomed {
            state.remove_card(card_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> DomainResult<User> {
        let mut state = self.state.write().await;
        state.ensure_unique_user(&user.username, user.email.as_deref(), None)?;
        let id = state.next_id();
        let user = User {
            id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            role: user.role,
            date_joined: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<User> {
        let mut state = self.state.write().await;
        let username = state
            .users
            .get(&id)
            .map(|u| u.username.clone())
            .ok_or_else(|| DomainError::not_found("user", id))?;
        state.ensure_unique_user(&username, changes.email.as_deref(), Some(id))?;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("user", id))?;
        user.email = changes.email;
        user.first_name = changes.first_name;
        user.last_name = changes.last_name;
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("user", id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn count(&self) -> DomainResult<i64> {
        Ok(self.state.read().await.users.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{CardFilter, SearchPattern, SortField, TextSearch};

    async fn seeded() -> (MemoryStore, Category) {
        let store = MemoryStore::new();
        let category = CategoryRepository::create(&store, "Rust").await.unwrap();
        (store, category)
    }

    async fn add_card(store: &MemoryStore, category: &Category, question: &str) -> Card {
        CardRepository::create(
            store,
            NewCard {
                question: question.into(),
                answer: "answer".into(),
                category_id: category.id,
                author_id: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_requires_existing_category() {
        let store = MemoryStore::new();
        let err = CardRepository::create(
            &store,
            NewCard {
                question: "q".into(),
                answer: "a".into(),
                category_id: 99,
                author_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn get_or_create_reuses_existing_tag() {
        let store = MemoryStore::new();
        let first = store.get_or_create("rust").await.unwrap();
        let second = store.get_or_create("rust").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn link_is_idempotent() {
        let (store, category) = seeded().await;
        let card = add_card(&store, &category, "q").await;
        let tag = store.get_or_create("rust").await.unwrap();
        store.link(card.id, tag.id).await.unwrap();
        store.link(card.id, tag.id).await.unwrap();
        assert_eq!(store.tags_for_card(card.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn link_to_missing_card_is_not_found() {
        let store = MemoryStore::new();
        let tag = store.get_or_create("rust").await.unwrap();
        let err = store.link(404, tag.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "card", .. }));
    }

    #[tokio::test]
    async fn list_pages_and_rejects_out_of_range() {
        let (store, category) = seeded().await;
        for i in 0..35 {
            add_card(&store, &category, &format!("question {i}")).await;
        }
        let mut query = CardQuery {
            sort: SortField::Id,
            ..CardQuery::default()
        };
        let first = CardRepository::list(&store, &query).await.unwrap();
        assert_eq!(first.items.len(), 30);
        assert_eq!(first.total_pages(), 2);

        query.page = 2;
        assert_eq!(CardRepository::list(&store, &query).await.unwrap().items.len(), 5);

        query.page = 3;
        assert!(matches!(
            CardRepository::list(&store, &query).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_catalog_has_a_first_page() {
        let store = MemoryStore::new();
        let page = CardRepository::list(&store, &CardQuery::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.number, 1);
    }

    #[tokio::test]
    async fn search_over_tags_is_distinct() {
        let (store, category) = seeded().await;
        let card = add_card(&store, &category, "recursion basics").await;
        add_card(&store, &category, "loops").await;
        for name in ["recursion", "recursive"] {
            let tag = store.get_or_create(name).await.unwrap();
            store.link(card.id, tag.id).await.unwrap();
        }
        let query = CardQuery {
            search: Some(TextSearch::Pattern(SearchPattern::parse("recurs").unwrap())),
            ..CardQuery::default()
        };
        let page = CardRepository::list(&store, &query).await.unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].card.id, card.id);
        assert_eq!(page.items[0].tag_names(), vec!["recursion", "recursive"]);
    }

    #[tokio::test]
    async fn set_status_counts_changed_rows() {
        let (store, category) = seeded().await;
        let a = add_card(&store, &category, "a").await;
        let b = add_card(&store, &category, "b").await;
        assert_eq!(store.set_status(&[a.id], CardStatus::Checked).await.unwrap(), 1);
        assert_eq!(
            store.set_status(&[a.id, b.id, 999], CardStatus::Checked).await.unwrap(),
            1
        );
        let checked = CardQuery {
            filter: CardFilter {
                status: Some(CardStatus::Checked),
                ..CardFilter::default()
            },
            ..CardQuery::default()
        };
        assert_eq!(CardRepository::list(&store, &checked).await.unwrap().total_items, 2);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryStore::new();
        let new_user = |name: &str| NewUser {
            username: name.into(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "x".into(),
            role: Default::default(),
        };
        UserRepository::create(&store, new_user("alice")).await.unwrap();
        let err = UserRepository::create(&store, new_user("alice")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}

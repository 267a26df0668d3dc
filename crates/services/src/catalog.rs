//! The catalog: sortable, searchable, paginated card listings.

use std::sync::Arc;

use domains::{
    CardDetail, CardFilter, CardQuery, CardRepository, CatalogListing, Category, CategoryId,
    CategoryRepository, CategorySummary, DomainError, DomainResult, Page, SearchPattern,
    SortDirection, SortField, Tag, TagId, TagRepository, TextSearch, UserId, CATALOG_PAGE_SIZE,
};
use serde::Deserialize;
use tracing::debug;

/// Raw catalog query-string parameters, exactly as the client sent them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogParams {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub search_query: Option<String>,
    pub page: Option<String>,
}

/// Parses a 1-based page number. A missing value means the first page;
/// anything that is not a positive integer is `NotFound`.
pub fn parse_page(raw: Option<&str>) -> DomainResult<u32> {
    match raw.map(str::trim) {
        None | Some("") => Ok(1),
        Some(value) => value
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| DomainError::not_found("page", value)),
    }
}

/// Translates catalog parameters into a typed query.
///
/// Missing sort means upload date; direction is descending unless `asc`
/// is given; a non-empty search string must be a valid regular expression.
pub fn build_query(params: &CatalogParams, filter: CardFilter) -> DomainResult<CardQuery> {
    let sort = match params.sort.as_deref() {
        None | Some("") => SortField::default(),
        Some(name) => name.parse()?,
    };
    let search = match params.search_query.as_deref() {
        None | Some("") => None,
        Some(text) => Some(TextSearch::Pattern(SearchPattern::parse(text)?)),
    };
    Ok(CardQuery {
        sort,
        direction: SortDirection::from_param(params.order.as_deref()),
        search,
        filter,
        page: parse_page(params.page.as_deref())?,
        per_page: CATALOG_PAGE_SIZE,
    })
}

#[derive(Clone)]
pub struct CatalogService {
    cards: Arc<dyn CardRepository>,
    tags: Arc<dyn TagRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl CatalogService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        tags: Arc<dyn TagRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            cards,
            tags,
            categories,
        }
    }

    /// The main catalog listing.
    pub async fn build_listing(&self, params: &CatalogParams) -> DomainResult<CatalogListing> {
        self.listing(params, CardFilter::default()).await
    }

    /// Catalog restricted to one tag.
    pub async fn listing_for_tag(
        &self,
        tag_id: TagId,
        params: &CatalogParams,
    ) -> DomainResult<(Tag, CatalogListing)> {
        let tag = self
            .tags
            .find(tag_id)
            .await?
            .ok_or_else(|| DomainError::not_found("tag", tag_id))?;
        let filter = CardFilter {
            tag_id: Some(tag.id),
            ..CardFilter::default()
        };
        Ok((tag, self.listing(params, filter).await?))
    }

    /// Catalog restricted to one category.
    pub async fn listing_for_category(
        &self,
        category_id: CategoryId,
        params: &CatalogParams,
    ) -> DomainResult<(Category, CatalogListing)> {
        let category = self
            .categories
            .find(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("category", category_id))?;
        let filter = CardFilter {
            category_id: Some(category.id),
            ..CardFilter::default()
        };
        Ok((category, self.listing(params, filter).await?))
    }

    pub async fn categories(&self) -> DomainResult<Vec<CategorySummary>> {
        self.categories.list_with_counts().await
    }

    /// Cards written by one user, newest first.
    pub async fn cards_by_author(&self, author_id: UserId, page: Option<&str>) -> DomainResult<Page<CardDetail>> {
        let query = CardQuery {
            filter: CardFilter {
                author_id: Some(author_id),
                ..CardFilter::default()
            },
            page: parse_page(page)?,
            ..CardQuery::default()
        };
        self.cards.list(&query).await
    }

    async fn listing(&self, params: &CatalogParams, filter: CardFilter) -> DomainResult<CatalogListing> {
        let query = build_query(params, filter)?;
        debug!(
            sort = %query.sort,
            order = query.direction.as_param(),
            page = query.page,
            "building catalog listing"
        );
        let page = self.cards.list(&query).await?;
        Ok(CatalogListing {
            page,
            sort: query.sort,
            direction: query.direction,
            search_text: query
                .search
                .as_ref()
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        })
    }
}

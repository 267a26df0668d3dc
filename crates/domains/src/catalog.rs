//! # Catalog queries
//!
//! Typed description of a card listing: which cards, in which order, which
//! page. Storage adapters translate a [`CardQuery`] into their own query
//! language; the in-memory adapter evaluates it with [`CardQuery::matches`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};

use crate::errors::{DomainError, DomainResult};
use crate::models::{Card, CardDetail, CardStatus, CategoryId, Tag, TagId, UserId};

pub const CATALOG_PAGE_SIZE: u32 = 30;
pub const MODERATION_PAGE_SIZE: u32 = 10;

/// Card fields a listing may be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    UploadDate,
    Views,
    Question,
    Id,
    Favorites,
    Status,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::UploadDate,
        SortField::Views,
        SortField::Question,
        SortField::Id,
        SortField::Favorites,
        SortField::Status,
    ];

    /// Name used in query strings; doubles as the column name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UploadDate => "upload_date",
            Self::Views => "views",
            Self::Question => "question",
            Self::Id => "id",
            Self::Favorites => "favorites",
            Self::Status => "status",
        }
    }

    /// Natural (ascending) order of two cards on this field.
    pub fn compare(self, a: &Card, b: &Card) -> Ordering {
        match self {
            Self::UploadDate => a.upload_date.cmp(&b.upload_date),
            Self::Views => a.views.cmp(&b.views),
            Self::Question => a.question.cmp(&b.question),
            Self::Id => a.id.cmp(&b.id),
            Self::Favorites => a.favorites.cmp(&b.favorites),
            Self::Status => a.status.is_checked().cmp(&b.status.is_checked()),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| DomainError::invalid("sort", format!("cannot sort by '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// `asc` selects ascending order; anything else, including nothing,
    /// falls back to descending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("asc") => Self::Ascending,
            _ => Self::Descending,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// A validated, case-insensitive regular expression.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    source: String,
    regex: Regex,
}

impl SearchPattern {
    /// Compiles `source`; a malformed expression is a validation error.
    pub fn parse(source: &str) -> DomainResult<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                DomainError::invalid(
                    "search_query",
                    format!("'{source}' is not a valid search pattern: {e}"),
                )
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for SearchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Free-text restriction on a listing.
#[derive(Debug, Clone, PartialEq)]
pub enum TextSearch {
    /// Regular expression over question, answer and tag names
    Pattern(SearchPattern),
    /// Case-insensitive substring over question and answer
    Contains(String),
}

impl TextSearch {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pattern(p) => p.as_str(),
            Self::Contains(s) => s,
        }
    }

    pub fn matches(&self, card: &Card, tags: &[Tag]) -> bool {
        match self {
            Self::Pattern(p) => {
                p.is_match(&card.question)
                    || p.is_match(&card.answer)
                    || tags.iter().any(|t| p.is_match(&t.name))
            }
            Self::Contains(needle) => {
                let needle = needle.to_lowercase();
                card.question.to_lowercase().contains(&needle)
                    || card.answer.to_lowercase().contains(&needle)
            }
        }
    }
}

/// Exact-match restrictions, all optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFilter {
    pub category_id: Option<CategoryId>,
    pub tag_id: Option<TagId>,
    pub author_id: Option<UserId>,
    pub status: Option<CardStatus>,
    pub has_code: Option<bool>,
    pub uploaded_since: Option<DateTime<Utc>>,
}

impl CardFilter {
    pub fn matches(&self, card: &Card, tags: &[Tag]) -> bool {
        self.category_id.map_or(true, |id| card.category_id == id)
            && self.tag_id.map_or(true, |id| tags.iter().any(|t| t.id == id))
            && self.author_id.map_or(true, |id| card.author_id == Some(id))
            && self.status.map_or(true, |s| card.status == s)
            && self.has_code.map_or(true, |flag| card.has_code() == flag)
            && self.uploaded_since.map_or(true, |since| card.upload_date >= since)
    }
}

/// One page of a card listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CardQuery {
    pub sort: SortField,
    pub direction: SortDirection,
    pub search: Option<TextSearch>,
    pub filter: CardFilter,
    /// 1-based
    pub page: u32,
    pub per_page: u32,
}

impl Default for CardQuery {
    fn default() -> Self {
        Self {
            sort: SortField::UploadDate,
            direction: SortDirection::Descending,
            search: None,
            filter: CardFilter::default(),
            page: 1,
            per_page: CATALOG_PAGE_SIZE,
        }
    }
}

impl CardQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn matches(&self, card: &Card, tags: &[Tag]) -> bool {
        self.filter.matches(card, tags)
            && self.search.as_ref().map_or(true, |s| s.matches(card, tags))
    }

    /// Listing order, with the id as tie-breaker in the same direction so
    /// that flipping the direction reverses the whole sequence.
    pub fn compare(&self, a: &Card, b: &Card) -> Ordering {
        let primary = self.sort.compare(a, b).then_with(|| a.id.cmp(&b.id));
        self.direction.apply(primary)
    }
}

/// A slice of a larger result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based
    pub number: u32,
    pub per_page: u32,
    pub total_items: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_items, self.per_page)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages()
    }

    pub fn previous_number(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> u32 {
        self.number + 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_items: self.total_items,
        }
    }
}

/// Number of pages needed for `total_items`; an empty set still has page 1.
pub fn total_pages(total_items: u64, per_page: u32) -> u32 {
    let per_page = u64::from(per_page.max(1));
    let pages = total_items.div_ceil(per_page).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Rejects page numbers outside `1..=total_pages`.
pub fn check_page_number(number: u32, total_items: u64, per_page: u32) -> DomainResult<()> {
    if number == 0 || number > total_pages(total_items, per_page) {
        return Err(DomainError::not_found("page", number));
    }
    Ok(())
}

/// Output of the catalog query builder: the page plus the state that
/// produced it, so pages can render sort and search controls.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogListing {
    pub page: Page<CardDetail>,
    pub sort: SortField,
    pub direction: SortDirection,
    pub search_text: String,
}

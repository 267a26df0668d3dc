//! Askama page templates and the view models they render.
//!
//! Handlers turn domain values into these flat structs; templates only
//! print fields and loop, they never compute.

use askama::Template;
use domains::{
    CardDetail, Category, CategorySummary, Page, SortDirection, SortField, User, ValidationErrors,
};
use services::{
    CardForm, MenuItem, ModerationParams, ModeratorCardForm, PageContext, PasswordChangeForm,
    ProfileForm, RegistrationForm,
};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `path?k=v&...` with empty values dropped. Falls back to the bare path if
/// the pairs cannot be encoded.
pub fn query_url(path: &str, params: &[(&str, String)]) -> String {
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (*k, v.as_str()))
        .collect();
    if pairs.is_empty() {
        return path.to_string();
    }
    match serde_urlencoded::to_string(&pairs) {
        Ok(query) => format!("{path}?{query}"),
        Err(_) => path.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct UserBadge {
    pub username: String,
    pub is_moderator: bool,
}

/// Everything `base.html` needs.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    pub menu: Vec<MenuItem>,
    pub cards_count: i64,
    pub users_count: i64,
    pub user: Option<UserBadge>,
    pub notice: Option<String>,
}

impl Layout {
    pub fn new(title: impl Into<String>, ctx: PageContext, user: Option<&User>) -> Self {
        Self {
            title: title.into(),
            menu: ctx.menu.to_vec(),
            cards_count: ctx.cards_count,
            users_count: ctx.users_count,
            user: user.map(|u| UserBadge {
                username: u.username.clone(),
                is_moderator: u.role.can_moderate(),
            }),
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TagLink {
    pub id: i64,
    pub name: String,
}

/// One row of any card list.
#[derive(Debug, Clone)]
pub struct CardSummary {
    pub id: i64,
    pub question: String,
    pub category_id: i64,
    pub category: String,
    pub views: i64,
    pub favorites: i64,
    pub uploaded: String,
    pub checked: bool,
    pub has_code: bool,
    pub author: String,
    pub tags: Vec<TagLink>,
}

impl CardSummary {
    pub fn from_detail(detail: &CardDetail) -> Self {
        Self {
            id: detail.card.id,
            question: detail.card.question.clone(),
            category_id: detail.category.id,
            category: detail.category.name.clone(),
            views: detail.card.views,
            favorites: detail.card.favorites,
            uploaded: detail.card.upload_date.format(DATE_FORMAT).to_string(),
            checked: detail.card.status.is_checked(),
            has_code: detail.card.has_code(),
            author: detail.author.clone().unwrap_or_else(|| "anonymous".into()),
            tags: detail
                .tags
                .iter()
                .map(|t| TagLink {
                    id: t.id,
                    name: t.name.clone(),
                })
                .collect(),
        }
    }

    pub fn list(page: &Page<CardDetail>) -> Vec<Self> {
        page.items.iter().map(Self::from_detail).collect()
    }
}

/// Previous/next links that keep the other query parameters.
#[derive(Debug, Clone)]
pub struct Pager {
    pub number: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl Pager {
    pub fn new<T>(page: &Page<T>, path: &str, params: &[(&str, String)]) -> Self {
        let link = |n: u32| {
            let mut all = params.to_vec();
            all.push(("page", n.to_string()));
            query_url(path, &all)
        };
        Self {
            number: page.number,
            total_pages: page.total_pages(),
            total_items: page.total_items,
            prev_url: page.has_previous().then(|| link(page.previous_number())),
            next_url: page.has_next().then(|| link(page.next_number())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortLink {
    pub label: &'static str,
    pub url: String,
    pub active: bool,
    pub arrow: &'static str,
}

/// Column headers of the catalog: clicking the active one flips direction.
pub fn sort_links(path: &str, active: SortField, direction: SortDirection, search: &str) -> Vec<SortLink> {
    const LABELS: [(SortField, &str); 4] = [
        (SortField::UploadDate, "Date"),
        (SortField::Views, "Views"),
        (SortField::Question, "Question"),
        (SortField::Favorites, "Favorites"),
    ];
    LABELS
        .iter()
        .map(|(field, label)| {
            let is_active = *field == active;
            let order = match (is_active, direction) {
                (true, SortDirection::Descending) => "asc",
                _ => "desc",
            };
            SortLink {
                label: *label,
                url: query_url(
                    path,
                    &[
                        ("sort", field.as_str().to_string()),
                        ("order", order.to_string()),
                        ("search_query", search.to_string()),
                    ],
                ),
                active: is_active,
                arrow: match (is_active, direction) {
                    (false, _) => "",
                    (true, SortDirection::Ascending) => "▲",
                    (true, SortDirection::Descending) => "▼",
                },
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

/// Current review-list filter values, echoed back into the filter form.
#[derive(Debug, Clone, Default)]
pub struct AdminFilters {
    pub q: String,
    pub category: String,
    pub status: String,
    pub has_code: String,
    pub uploaded: String,
}

impl AdminFilters {
    pub fn from_params(params: &ModerationParams) -> Self {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            q: value(&params.q),
            category: value(&params.category),
            status: value(&params.status),
            has_code: value(&params.has_code),
            uploaded: value(&params.uploaded),
        }
    }

    pub fn as_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.q.clone()),
            ("category", self.category.clone()),
            ("status", self.status.clone()),
            ("has_code", self.has_code.clone()),
            ("uploaded", self.uploaded.clone()),
        ]
    }
}

pub fn category_options(categories: &[Category], selected: &str) -> Vec<CategoryOption> {
    categories
        .iter()
        .map(|c| CategoryOption {
            id: c.id,
            name: c.name.clone(),
            selected: c.id.to_string() == selected.trim(),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutPage {
    pub layout: Layout,
}

#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogPage {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub cards: Vec<CardSummary>,
    pub pager: Pager,
    pub sort_links: Vec<SortLink>,
    pub sort: String,
    pub order: String,
    pub search_text: String,
}

#[derive(Template)]
#[template(path = "categories.html")]
pub struct CategoriesPage {
    pub layout: Layout,
    pub categories: Vec<CategorySummary>,
}

#[derive(Template)]
#[template(path = "card_detail.html")]
pub struct CardDetailPage {
    pub layout: Layout,
    pub card: CardSummary,
    pub answer_html: String,
    pub can_manage: bool,
}

#[derive(Template)]
#[template(path = "card_form.html")]
pub struct CardFormPage {
    pub layout: Layout,
    pub heading: String,
    pub action: String,
    pub form: CardForm,
    pub categories: Vec<CategoryOption>,
    pub errors: ValidationErrors,
}

#[derive(Template)]
#[template(path = "card_delete.html")]
pub struct CardDeletePage {
    pub layout: Layout,
    pub card: CardSummary,
}

#[derive(Template)]
#[template(path = "my_cards.html")]
pub struct MyCardsPage {
    pub layout: Layout,
    pub cards: Vec<CardSummary>,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub layout: Layout,
    pub username: String,
    pub next: String,
    pub errors: ValidationErrors,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub layout: Layout,
    pub form: RegistrationForm,
    pub errors: ValidationErrors,
}

#[derive(Template)]
#[template(path = "message.html")]
pub struct MessagePage {
    pub layout: Layout,
    pub message: String,
    pub link_url: String,
    pub link_text: String,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfilePage {
    pub layout: Layout,
    pub username: String,
    pub is_moderator: bool,
    pub joined: String,
    pub form: ProfileForm,
    pub errors: ValidationErrors,
}

#[derive(Template)]
#[template(path = "password_change.html")]
pub struct PasswordChangePage {
    pub layout: Layout,
    pub form: PasswordChangeForm,
    pub errors: ValidationErrors,
}

#[derive(Template)]
#[template(path = "admin_cards.html")]
pub struct AdminCardsPage {
    pub layout: Layout,
    pub cards: Vec<CardSummary>,
    pub pager: Pager,
    pub filters: AdminFilters,
    pub categories: Vec<CategoryOption>,
}

#[derive(Template)]
#[template(path = "admin_card_form.html")]
pub struct AdminCardFormPage {
    pub layout: Layout,
    pub card_id: i64,
    pub form: ModeratorCardForm,
    pub checked: bool,
    pub categories: Vec<CategoryOption>,
    pub errors: ValidationErrors,
}

#[derive(Template)]
#[template(path = "admin_categories.html")]
pub struct AdminCategoriesPage {
    pub layout: Layout,
    pub categories: Vec<Category>,
    pub name: String,
    pub errors: ValidationErrors,
}

/// Standalone so it renders even when the page context is unavailable.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status: u16,
    pub reason: String,
    pub message: String,
}

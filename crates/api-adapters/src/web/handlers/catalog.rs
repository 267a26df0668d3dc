//! Public catalog pages: the full listing, per category, per tag.

use axum::extract::{Path, Query, State};
use axum::response::Html;
use domains::{CatalogListing, CategoryId, TagId};
use services::CatalogParams;

use super::layout;
use crate::views::{sort_links, CardSummary, CatalogPage, CategoriesPage, Layout, Pager};
use crate::web::error::{render, ApiError};
use crate::web::session::MaybeUser;
use crate::web::AppState;

fn catalog_page(layout: Layout, heading: String, path: &str, listing: CatalogListing) -> CatalogPage {
    let sort = listing.sort.as_str().to_string();
    let order = listing.direction.as_param().to_string();
    let pager = Pager::new(
        &listing.page,
        path,
        &[
            ("sort", sort.clone()),
            ("order", order.clone()),
            ("search_query", listing.search_text.clone()),
        ],
    );
    CatalogPage {
        layout,
        heading,
        action: path.to_string(),
        cards: CardSummary::list(&listing.page),
        pager,
        sort_links: sort_links(path, listing.sort, listing.direction, &listing.search_text),
        sort,
        order,
        search_text: listing.search_text,
    }
}

pub async fn catalog(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<CatalogParams>,
) -> Result<Html<String>, ApiError> {
    let listing = state.catalog.build_listing(&params).await?;
    let layout = layout(&state, "Catalog", user.as_ref()).await?;
    render(&catalog_page(layout, "Catalog".into(), "/cards/catalog/", listing))
}

pub async fn categories(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    let categories = state.catalog.categories().await?;
    let layout = layout(&state, "Categories", user.as_ref()).await?;
    render(&CategoriesPage { layout, categories })
}

pub async fn category(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<CategoryId>,
    Query(params): Query<CatalogParams>,
) -> Result<Html<String>, ApiError> {
    let (category, listing) = state.catalog.listing_for_category(id, &params).await?;
    let title = format!("Category: {}", category.name);
    let layout = layout(&state, &title, user.as_ref()).await?;
    let path = format!("/cards/categories/{id}/");
    render(&catalog_page(layout, title, &path, listing))
}

pub async fn tag(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<TagId>,
    Query(params): Query<CatalogParams>,
) -> Result<Html<String>, ApiError> {
    let (tag, listing) = state.catalog.listing_for_tag(id, &params).await?;
    let title = format!("Tag: {}", tag.name);
    let layout = layout(&state, &title, user.as_ref()).await?;
    let path = format!("/cards/tags/{id}/");
    render(&catalog_page(layout, title, &path, listing))
}

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use crate::repositories::{ListingKind, PAGE_SIZE};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{success, ListMeta};

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Deserialize)]
pub struct CatalogQuery {
    pub page: Option<i64>,
    pub search: Option<String>,
    pub genre: Option<String>,
}

/// Upper bound on the page parameter. Keeps the OFFSET arithmetic far away
/// from i64 overflow on hostile input; no real catalog comes close.
const MAX_PAGE: i64 = 100_000;

fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).clamp(1, MAX_PAGE)
}

pub async fn upcoming_movies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page = normalize_page(query.page);
    let (movies, total) = state
        .movies
        .listing_page(ListingKind::Upcoming, page)
        .await?;
    let meta = ListMeta::new(page, PAGE_SIZE, total);

    Ok(success(
        json!({ "movies": movies, "meta": meta }),
        "Get upcoming movies successfully",
    )
    .into_response())
}

pub async fn popular_movies(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page = normalize_page(query.page);
    let (movies, total) = state
        .movies
        .listing_page(ListingKind::Popular, page)
        .await?;
    let meta = ListMeta::new(page, PAGE_SIZE, total);

    Ok(success(
        json!({ "movies": movies, "meta": meta }),
        "Get popular movies successfully",
    )
    .into_response())
}

pub async fn catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Response, AppError> {
    let page = normalize_page(query.page);
    // An absent or empty genre param means no genre filter.
    let genre_id = query
        .genre
        .as_deref()
        .and_then(|raw| raw.parse::<i32>().ok())
        .filter(|id| *id > 0);

    let (movies, total) = state
        .movies
        .search(page, query.search.as_deref(), genre_id)
        .await?;
    let meta = ListMeta::new(page, PAGE_SIZE, total);

    Ok(success(
        json!({ "movies": movies, "meta": meta }),
        "Get movies successfully",
    )
    .into_response())
}

pub async fn movie_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let movie = state.movies.detail(id).await?;
    Ok(success(movie, "Get movie detail successfully").into_response())
}

pub async fn all_genres(State(state): State<AppState>) -> Result<Response, AppError> {
    let genres = state.movies.all_genres().await?;
    Ok(success(genres, "Get genres successfully").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page_defaults_and_clamps() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(5)), 5);
    }

    #[test]
    fn test_normalize_page_bounds_hostile_input() {
        use crate::repositories::PAGE_SIZE;

        assert_eq!(normalize_page(Some(i64::MAX)), MAX_PAGE);
        assert_eq!(normalize_page(Some(i64::MIN)), 1);

        // The resulting OFFSET must never overflow or go negative.
        let offset = (normalize_page(Some(i64::MAX)) - 1).checked_mul(PAGE_SIZE);
        assert!(matches!(offset, Some(o) if o >= 0));
    }
}

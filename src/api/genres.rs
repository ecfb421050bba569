use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::Role;

use super::auth::AuthContext;
use super::{ApiError, ApiResponse, AppState, GenreDto, Page, validation};

#[derive(Deserialize)]
pub struct GenreListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct GenrePayload {
    pub name: String,
    pub slug: String,
}

/// GET /genres
pub async fn list_genres(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenreListQuery>,
) -> Result<Json<ApiResponse<Page<GenreDto>>>, ApiError> {
    let (page, page_size) = state.page_params(query.page, query.page_size);

    let (rows, count) = state
        .store()
        .list_genres(query.search.as_deref(), page, page_size)
        .await?;

    let mut filters = Vec::new();
    if let Some(search) = query.search {
        filters.push(("search", search));
    }

    let results = rows.into_iter().map(GenreDto::from).collect();
    Ok(Json(ApiResponse::success(Page::new(
        "/api/v1/genres",
        &filters,
        page,
        page_size,
        count,
        results,
    ))))
}

/// POST /genres
pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<GenrePayload>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    validation::validate_name(&payload.name)?;
    validation::validate_slug(&payload.slug)?;

    if state
        .store()
        .get_genre_by_slug(&payload.slug)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(format!(
            "Genre with slug '{}' already exists",
            payload.slug
        )));
    }

    let genre = state
        .store()
        .create_genre(&payload.name, &payload.slug)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(GenreDto::from(genre))),
    ))
}

/// DELETE /genres/{slug}
pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    if !state.store().delete_genre(&slug).await? {
        return Err(ApiError::not_found("Genre", &slug));
    }

    Ok(StatusCode::NO_CONTENT)
}

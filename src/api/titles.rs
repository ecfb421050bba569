use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::Role;
use crate::db::{NewTitle, TitleFilters, TitlePatch};

use super::auth::AuthContext;
use super::{ApiError, ApiResponse, AppState, Page, TitleDto, validation};

#[derive(Deserialize)]
pub struct TitleListQuery {
    /// Substring filter on the title name.
    pub name: Option<String>,
    /// Genre slug; exact match.
    pub genre: Option<String>,
    /// Category slug; exact match.
    pub category: Option<String>,
    pub year: Option<i32>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct CreateTitleRequest {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub slug: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    /// Genre slugs.
    #[serde(default)]
    pub genre: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateTitleRequest {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub category: Option<String>,
    pub genre: Option<Vec<String>>,
}

/// GET /titles
pub async fn list_titles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TitleListQuery>,
) -> Result<Json<ApiResponse<Page<TitleDto>>>, ApiError> {
    let (page, page_size) = state.page_params(query.page, query.page_size);

    let filters = TitleFilters {
        name: query.name,
        genre: query.genre,
        category: query.category,
        year: query.year,
    };

    let (rows, count) = state.store().list_titles(&filters, page, page_size).await?;

    let mut link_filters = Vec::new();
    if let Some(name) = filters.name {
        link_filters.push(("name", name));
    }
    if let Some(genre) = filters.genre {
        link_filters.push(("genre", genre));
    }
    if let Some(category) = filters.category {
        link_filters.push(("category", category));
    }
    if let Some(year) = filters.year {
        link_filters.push(("year", year.to_string()));
    }

    let results = rows.into_iter().map(TitleDto::from).collect();
    Ok(Json(ApiResponse::success(Page::new(
        "/api/v1/titles",
        &link_filters,
        page,
        page_size,
        count,
        results,
    ))))
}

/// GET /titles/{id}
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    let record = state
        .store()
        .get_title(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Title", id))?;

    Ok(Json(ApiResponse::success(TitleDto::from(record))))
}

/// POST /titles
pub async fn create_title(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    validation::validate_name(&payload.name)?;
    validation::validate_year(payload.year)?;
    if let Some(slug) = &payload.slug {
        validation::validate_slug(slug)?;
    }

    let category_id = resolve_category(&state, payload.category.as_deref()).await?;
    let genre_ids = resolve_genres(&state, &payload.genre).await?;

    let id = state
        .store()
        .create_title(NewTitle {
            name: payload.name,
            year: payload.year,
            description: payload.description,
            slug: payload.slug,
            category_id,
            genre_ids,
        })
        .await?;

    let record = state
        .store()
        .get_title(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Title", id))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(TitleDto::from(record))),
    ))
}

/// PATCH /titles/{id}
pub async fn update_title(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<Json<ApiResponse<TitleDto>>, ApiError> {
    ctx.require(Role::Admin)?;

    if let Some(name) = &payload.name {
        validation::validate_name(name)?;
    }
    if let Some(year) = payload.year {
        validation::validate_year(year)?;
    }
    if let Some(slug) = &payload.slug {
        validation::validate_slug(slug)?;
    }

    let category_id = resolve_category(&state, payload.category.as_deref()).await?;

    let genre_ids = match &payload.genre {
        Some(slugs) => Some(resolve_genres(&state, slugs).await?),
        None => None,
    };

    let updated = state
        .store()
        .update_title(
            id,
            TitlePatch {
                name: payload.name,
                year: payload.year,
                description: payload.description,
                slug: payload.slug,
                category_id,
                genre_ids,
            },
        )
        .await?;

    if !updated {
        return Err(ApiError::not_found("Title", id));
    }

    let record = state
        .store()
        .get_title(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Title", id))?;

    Ok(Json(ApiResponse::success(TitleDto::from(record))))
}

/// DELETE /titles/{id}
pub async fn delete_title(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    if !state.store().delete_title(id).await? {
        return Err(ApiError::not_found("Title", id));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve a category slug to its id; an unknown slug is a 404.
async fn resolve_category(
    state: &AppState,
    slug: Option<&str>,
) -> Result<Option<i32>, ApiError> {
    let Some(slug) = slug else {
        return Ok(None);
    };

    let category = state
        .store()
        .get_category_by_slug(slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", slug))?;

    Ok(Some(category.id))
}

/// Resolve genre slugs to ids. Unknown slugs are dropped silently, so a
/// title can be created while a genre list is still being curated.
async fn resolve_genres(state: &AppState, slugs: &[String]) -> Result<Vec<i32>, ApiError> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let genres = state.store().get_genres_by_slugs(slugs).await?;
    Ok(genres.into_iter().map(|g| g.id).collect())
}

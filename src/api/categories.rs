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
use super::{ApiError, ApiResponse, AppState, CategoryDto, Page, validation};

#[derive(Deserialize)]
pub struct CategoryListQuery {
    /// Exact-match filter on the category name.
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub slug: String,
}

/// GET /categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<ApiResponse<Page<CategoryDto>>>, ApiError> {
    let (page, page_size) = state.page_params(query.page, query.page_size);

    let (rows, count) = state
        .store()
        .list_categories(query.search.as_deref(), page, page_size)
        .await?;

    let mut filters = Vec::new();
    if let Some(search) = query.search {
        filters.push(("search", search));
    }

    let results = rows.into_iter().map(CategoryDto::from).collect();
    Ok(Json(ApiResponse::success(Page::new(
        "/api/v1/categories",
        &filters,
        page,
        page_size,
        count,
        results,
    ))))
}

/// POST /categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<CategoryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    validation::validate_name(&payload.name)?;
    validation::validate_slug(&payload.slug)?;

    if state
        .store()
        .get_category_by_slug(&payload.slug)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(format!(
            "Category with slug '{}' already exists",
            payload.slug
        )));
    }

    let category = state
        .store()
        .create_category(&payload.name, &payload.slug)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CategoryDto::from(category))),
    ))
}

/// DELETE /categories/{slug}
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    if !state.store().delete_category(&slug).await? {
        return Err(ApiError::not_found("Category", &slug));
    }

    Ok(StatusCode::NO_CONTENT)
}

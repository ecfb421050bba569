use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::Role;
use crate::entities::{reviews, users};

use super::auth::AuthContext;
use super::{ApiError, ApiResponse, AppState, Page, PageQuery, ReviewDto, validation};

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub text: String,
    pub score: i32,
}

#[derive(Deserialize)]
pub struct UpdateReviewRequest {
    pub text: Option<String>,
    pub score: Option<i32>,
}

/// GET /titles/{title_id}/reviews
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(title_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<ReviewDto>>>, ApiError> {
    ensure_title(&state, title_id).await?;

    let (page, page_size) = state.page_params(query.page, query.page_size);
    let (rows, count) = state.store().list_reviews(title_id, page, page_size).await?;

    let results = hydrate_authors(&state, rows).await?;
    Ok(Json(ApiResponse::success(Page::new(
        &format!("/api/v1/titles/{title_id}/reviews"),
        &[],
        page,
        page_size,
        count,
        results,
    ))))
}

/// GET /titles/{title_id}/reviews/{review_id}
pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    ensure_title(&state, title_id).await?;

    let review = find_review(&state, title_id, review_id).await?;
    let author = author_of(&state, &review).await?;

    Ok(Json(ApiResponse::success(ReviewDto::new(review, &author))))
}

/// POST /titles/{title_id}/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(title_id): Path<i32>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require(Role::User)?;

    ensure_title(&state, title_id).await?;
    validation::validate_text(&payload.text)?;
    validation::validate_score(payload.score)?;

    if state
        .store()
        .find_review_by_author(title_id, user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(
            "You have already reviewed this title",
        ));
    }

    let review = state
        .store()
        .create_review(title_id, user.id, payload.text, payload.score)
        .await?;
    let author = author_of(&state, &review).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReviewDto::new(review, &author))),
    ))
}

/// PATCH /titles/{title_id}/reviews/{review_id}
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewDto>>, ApiError> {
    ensure_title(&state, title_id).await?;

    let review = find_review(&state, title_id, review_id).await?;
    ctx.require_author_or(review.author_id, Role::Staff)?;

    if let Some(text) = &payload.text {
        validation::validate_text(text)?;
    }
    if let Some(score) = payload.score {
        validation::validate_score(score)?;
    }

    let review = state
        .store()
        .update_review(review, payload.text, payload.score)
        .await?;
    let author = author_of(&state, &review).await?;

    Ok(Json(ApiResponse::success(ReviewDto::new(review, &author))))
}

/// DELETE /titles/{title_id}/reviews/{review_id}
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path((title_id, review_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_title(&state, title_id).await?;

    let review = find_review(&state, title_id, review_id).await?;
    ctx.require_author_or(review.author_id, Role::Staff)?;

    state.store().delete_review(review).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

async fn ensure_title(state: &AppState, title_id: i32) -> Result<(), ApiError> {
    state
        .store()
        .get_title(title_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Title", title_id))?;
    Ok(())
}

async fn find_review(
    state: &AppState,
    title_id: i32,
    review_id: i32,
) -> Result<reviews::Model, ApiError> {
    state
        .store()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review", review_id))
}

async fn author_of(state: &AppState, review: &reviews::Model) -> Result<users::Model, ApiError> {
    state
        .store()
        .get_user_by_id(review.author_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Review author record missing".to_string()))
}

/// Resolve authors for a page of reviews with one batch query.
async fn hydrate_authors(
    state: &AppState,
    rows: Vec<reviews::Model>,
) -> Result<Vec<ReviewDto>, ApiError> {
    let author_ids: Vec<i32> = rows.iter().map(|r| r.author_id).collect();
    let authors: HashMap<i32, users::Model> = state
        .store()
        .get_users_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    rows.into_iter()
        .map(|review| {
            let author = authors
                .get(&review.author_id)
                .ok_or_else(|| ApiError::InternalError("Review author record missing".to_string()))?;
            Ok(ReviewDto::new(review, author))
        })
        .collect()
}

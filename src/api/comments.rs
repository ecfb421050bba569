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
use crate::entities::{comments, users};

use super::auth::AuthContext;
use super::{ApiError, ApiResponse, AppState, CommentDto, Page, PageQuery, validation};

#[derive(Deserialize)]
pub struct CommentPayload {
    pub text: String,
}

#[derive(Deserialize)]
pub struct UpdateCommentRequest {
    pub text: Option<String>,
}

/// GET /titles/{title_id}/reviews/{review_id}/comments
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<CommentDto>>>, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let (page, page_size) = state.page_params(query.page, query.page_size);
    let (rows, count) = state
        .store()
        .list_comments(review_id, page, page_size)
        .await?;

    let results = hydrate_authors(&state, rows).await?;
    Ok(Json(ApiResponse::success(Page::new(
        &format!("/api/v1/titles/{title_id}/reviews/{review_id}/comments"),
        &[],
        page,
        page_size,
        count,
        results,
    ))))
}

/// GET /titles/{title_id}/reviews/{review_id}/comments/{comment_id}
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let comment = find_comment(&state, review_id, comment_id).await?;
    let author = author_of(&state, &comment).await?;

    Ok(Json(ApiResponse::success(CommentDto::new(comment, &author))))
}

/// POST /titles/{title_id}/reviews/{review_id}/comments
pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path((title_id, review_id)): Path<(i32, i32)>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let user = ctx.require(Role::User)?;

    ensure_review(&state, title_id, review_id).await?;
    validation::validate_text(&payload.text)?;

    let comment = state
        .store()
        .create_comment(review_id, user.id, payload.text)
        .await?;
    let author = author_of(&state, &comment).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CommentDto::new(comment, &author))),
    ))
}

/// PATCH /titles/{title_id}/reviews/{review_id}/comments/{comment_id}
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<ApiResponse<CommentDto>>, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let comment = find_comment(&state, review_id, comment_id).await?;
    ctx.require_author_or(comment.author_id, Role::Staff)?;

    let Some(text) = payload.text else {
        let author = author_of(&state, &comment).await?;
        return Ok(Json(ApiResponse::success(CommentDto::new(comment, &author))));
    };
    validation::validate_text(&text)?;

    let comment = state.store().update_comment(comment, text).await?;
    let author = author_of(&state, &comment).await?;

    Ok(Json(ApiResponse::success(CommentDto::new(comment, &author))))
}

/// DELETE /titles/{title_id}/reviews/{review_id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path((title_id, review_id, comment_id)): Path<(i32, i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_review(&state, title_id, review_id).await?;

    let comment = find_comment(&state, review_id, comment_id).await?;
    ctx.require_author_or(comment.author_id, Role::Staff)?;

    state.store().delete_comment(comment).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

/// The target review is addressed by both path segments; a mismatch on
/// either one is a 404.
async fn ensure_review(state: &AppState, title_id: i32, review_id: i32) -> Result<(), ApiError> {
    state
        .store()
        .get_review(title_id, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review", review_id))?;
    Ok(())
}

async fn find_comment(
    state: &AppState,
    review_id: i32,
    comment_id: i32,
) -> Result<comments::Model, ApiError> {
    state
        .store()
        .get_comment(review_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Comment", comment_id))
}

async fn author_of(state: &AppState, comment: &comments::Model) -> Result<users::Model, ApiError> {
    state
        .store()
        .get_user_by_id(comment.author_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Comment author record missing".to_string()))
}

async fn hydrate_authors(
    state: &AppState,
    rows: Vec<comments::Model>,
) -> Result<Vec<CommentDto>, ApiError> {
    let author_ids: Vec<i32> = rows.iter().map(|c| c.author_id).collect();
    let authors: HashMap<i32, users::Model> = state
        .store()
        .get_users_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    rows.into_iter()
        .map(|comment| {
            let author = authors.get(&comment.author_id).ok_or_else(|| {
                ApiError::InternalError("Comment author record missing".to_string())
            })?;
            Ok(CommentDto::new(comment, author))
        })
        .collect()
}

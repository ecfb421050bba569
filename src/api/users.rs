use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::Role;
use crate::db::UserPatch;
use crate::entities::users;

use super::auth::AuthContext;
use super::{ApiError, ApiResponse, AppState, Page, PageQuery, UserDto, validation};

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<UserDto>>>, ApiError> {
    ctx.require(Role::Admin)?;

    let (page, page_size) = state.page_params(query.page, query.page_size);
    let (rows, count) = state.store().list_users(page, page_size).await?;

    let results = rows.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(Page::new(
        "/api/v1/users",
        &[],
        page,
        page_size,
        count,
        results,
    ))))
}

/// GET /users/{username}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    ctx.require(Role::Admin)?;

    let user = find_user(&state, &username).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PATCH /users/{username}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    ctx.require(Role::Admin)?;

    let user = find_user(&state, &username).await?;
    let patch = build_patch(&state, &user, payload, true).await?;

    let user = state.store().update_user(user, patch).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// DELETE /users/{username}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.require(Role::Admin)?;

    if !state.store().delete_user(&username).await? {
        return Err(ApiError::not_found("User", &username));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/me
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let current = ctx.require(Role::User)?;

    let user = state
        .store()
        .get_user_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PATCH /users/me
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<AuthContext>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let current = ctx.require(Role::User)?;

    let user = state
        .store()
        .get_user_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

    let patch = build_patch(&state, &user, payload, false).await?;

    let user = state.store().update_user(user, patch).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

// ============================================================================
// Helpers
// ============================================================================

async fn find_user(state: &AppState, username: &str) -> Result<users::Model, ApiError> {
    state
        .store()
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::not_found("User", username))
}

/// Validate an update payload against the current record. `allow_role` is
/// false on the self-service path: users cannot change their own role.
async fn build_patch(
    state: &AppState,
    user: &users::Model,
    payload: UpdateUserRequest,
    allow_role: bool,
) -> Result<UserPatch, ApiError> {
    let role = match payload.role {
        None => None,
        Some(_) if !allow_role => {
            return Err(ApiError::validation("Role cannot be changed here"));
        }
        Some(value) => Some(
            Role::parse(&value)
                .ok_or_else(|| ApiError::validation(format!("Unknown role: {value}")))?,
        ),
    };

    if let Some(email) = &payload.email {
        validation::validate_email(email)?;
        if *email != user.email
            && state.store().get_user_by_email(email).await?.is_some()
        {
            return Err(ApiError::validation("A user with this email already exists"));
        }
    }

    if let Some(username) = &payload.username {
        validation::validate_username(username)?;
        let taken = state
            .store()
            .get_user_by_username(username)
            .await?
            .is_some_and(|other| other.id != user.id);
        if taken {
            return Err(ApiError::validation(
                "A user with this username already exists",
            ));
        }
    }

    Ok(UserPatch {
        email: payload.email,
        username: payload.username,
        role,
        first_name: payload.first_name,
        last_name: payload.last_name,
        bio: payload.bio,
    })
}

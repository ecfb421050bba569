use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{Role, TokenPair};
use crate::clients::mail::OutboundEmail;

use super::{ApiError, ApiResponse, AppState, validation};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CodeRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct CodeResponse {
    pub email: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub secret: String,
}

// ============================================================================
// Request identity
// ============================================================================

/// The authenticated user behind a request, loaded once by the middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
    pub email: String,
    pub username: Option<String>,
}

/// Per-request identity. Anonymous requests carry `user: None`; handlers
/// state their minimum capability through [`AuthContext::require`].
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user: Option<CurrentUser>,
}

impl AuthContext {
    pub fn role(&self) -> Role {
        self.user.as_ref().map_or(Role::Anonymous, |u| u.role)
    }

    /// 401 for anonymous requests, 403 for authenticated ones below `min`.
    pub fn require(&self, min: Role) -> Result<&CurrentUser, ApiError> {
        let Some(user) = &self.user else {
            return Err(ApiError::unauthorized("Authentication required"));
        };
        if user.role < min {
            return Err(ApiError::forbidden("Insufficient permissions"));
        }
        Ok(user)
    }

    /// Allow the record's author through at any role, everyone else only at
    /// `min` or above.
    pub fn require_author_or(&self, author_id: i32, min: Role) -> Result<&CurrentUser, ApiError> {
        let Some(user) = &self.user else {
            return Err(ApiError::unauthorized("Authentication required"));
        };
        if user.id != author_id && user.role < min {
            return Err(ApiError::forbidden("Insufficient permissions"));
        }
        Ok(user)
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the `Authorization: Bearer` header into an [`AuthContext`]
/// extension. A missing header yields an anonymous context; a present but
/// invalid token is rejected outright with 401.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = match bearer_token(request.headers()) {
        None => AuthContext::default(),
        Some(token) => {
            let claims = state
                .tokens()
                .verify_access(&token)
                .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

            let user = state
                .store()
                .get_user_by_id(claims.sub)
                .await?
                .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

            // The stored role wins over the one baked into the token, so a
            // demotion takes effect without waiting for expiry.
            AuthContext {
                user: Some(CurrentUser {
                    id: user.id,
                    role: Role::parse_lossy(&user.role),
                    email: user.email,
                    username: user.username,
                }),
            }
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/email
/// Register an email address and dispatch its one-time login code.
pub async fn request_code(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validation::validate_email(&payload.email)?;

    if state
        .store()
        .get_user_by_email(&payload.email)
        .await?
        .is_some()
    {
        return Err(ApiError::validation("A user with this email already exists"));
    }

    let secret = uuid::Uuid::new_v4().to_string();
    let user = state.store().create_user(&payload.email, &secret).await?;

    let email = OutboundEmail {
        to: user.email.clone(),
        subject: "Your confirmation code".to_string(),
        body: format!("Your confirmation code: {secret}"),
    };
    state
        .mailer()
        .send(&email)
        .await
        .map_err(|e| ApiError::mail(format!("{e:#}")))?;

    tracing::info!("Dispatched confirmation code to {}", user.email);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CodeResponse { email: user.email })),
    ))
}

/// POST /auth/token
/// Exchange {email, secret} for a signed token pair.
pub async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.secret.is_empty() {
        return Err(ApiError::validation("Confirmation code is required"));
    }

    let user = state
        .store()
        .get_user_by_login(&payload.email, &payload.secret)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid email or confirmation code"))?;

    let pair = state
        .tokens()
        .issue_pair(user.id, Role::parse_lossy(&user.role))
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(pair)))
}

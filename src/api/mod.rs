use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::mail::{LogMailer, Mailer, RelayMailer};
use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod categories;
mod comments;
mod error;
mod genres;
mod reviews;
mod system;
mod titles;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.shared.mailer
    }

    #[must_use]
    pub fn tokens(&self) -> &crate::auth::TokenSigner {
        &self.shared.tokens
    }

    /// Clamp client paging parameters against the configured limits.
    #[must_use]
    pub fn page_params(&self, page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
        let general = &self.shared.config.general;
        let page = page.unwrap_or(1).max(1);
        let page_size = page_size
            .unwrap_or(general.page_size)
            .clamp(1, general.max_page_size);
        (page, page_size)
    }
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(AppState { shared }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let mailer: Arc<dyn Mailer> = if config.mail.relay_url.is_empty() {
        Arc::new(LogMailer)
    } else {
        Arc::new(RelayMailer::new(&config.mail)?)
    };

    create_app_state_with_mailer(config, mailer).await
}

/// Build state with an explicit mailer; tests hand in a memory mailer here.
pub async fn create_app_state_with_mailer(
    config: Config,
    mailer: Arc<dyn Mailer>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config, mailer).await?);
    create_app_state(shared).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/titles", get(titles::list_titles))
        .route("/titles", post(titles::create_title))
        .route("/titles/{id}", get(titles::get_title))
        .route("/titles/{id}", patch(titles::update_title))
        .route("/titles/{id}", delete(titles::delete_title))
        .route("/categories", get(categories::list_categories))
        .route("/categories", post(categories::create_category))
        .route("/categories/{slug}", delete(categories::delete_category))
        .route("/genres", get(genres::list_genres))
        .route("/genres", post(genres::create_genre))
        .route("/genres/{slug}", delete(genres::delete_genre))
        .route("/titles/{title_id}/reviews", get(reviews::list_reviews))
        .route("/titles/{title_id}/reviews", post(reviews::create_review))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            patch(reviews::update_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            delete(reviews::delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            patch(comments::update_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            delete(comments::delete_comment),
        )
        .route("/users", get(users::list_users))
        .route("/users/me", get(users::get_me))
        .route("/users/me", patch(users::update_me))
        .route("/users/{username}", get(users::get_user))
        .route("/users/{username}", patch(users::update_user))
        .route("/users/{username}", delete(users::delete_user))
        .route("/auth/email", post(auth::request_code))
        .route("/auth/token", post(auth::obtain_token))
        .route("/system/health/live", get(system::health_live))
        .route("/system/health/ready", get(system::health_ready))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::identify,
        ))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

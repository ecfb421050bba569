use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::auth::Role;
use crate::entities::{categories, comments, genres, reviews, users};

pub mod migrator;
pub mod repositories;

pub use repositories::title::{NewTitle, TitleFilters, TitlePatch, TitleRecord};
pub use repositories::user::UserPatch;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // A pooled in-memory SQLite would hand each connection its own
        // database, so collapse the pool to a single connection there.
        let max_connections = if in_memory { 1 } else { max_connections };
        let min_connections = min_connections.min(max_connections);

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn genre_repo(&self) -> repositories::genre::GenreRepository {
        repositories::genre::GenreRepository::new(self.conn.clone())
    }

    fn title_repo(&self) -> repositories::title::TitleRepository {
        repositories::title::TitleRepository::new(self.conn.clone())
    }

    fn review_repo(&self) -> repositories::review::ReviewRepository {
        repositories::review::ReviewRepository::new(self.conn.clone())
    }

    fn comment_repo(&self) -> repositories::comment::CommentRepository {
        repositories::comment::CommentRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Categories ==========

    pub async fn list_categories(
        &self,
        search: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<categories::Model>, u64)> {
        self.category_repo().list(search, page, page_size).await
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<categories::Model>> {
        self.category_repo().get_by_slug(slug).await
    }

    pub async fn create_category(&self, name: &str, slug: &str) -> Result<categories::Model> {
        self.category_repo().create(name, slug).await
    }

    pub async fn delete_category(&self, slug: &str) -> Result<bool> {
        self.category_repo().delete_by_slug(slug).await
    }

    // ========== Genres ==========

    pub async fn list_genres(
        &self,
        search: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<genres::Model>, u64)> {
        self.genre_repo().list(search, page, page_size).await
    }

    pub async fn get_genre_by_slug(&self, slug: &str) -> Result<Option<genres::Model>> {
        self.genre_repo().get_by_slug(slug).await
    }

    pub async fn get_genres_by_slugs(&self, slugs: &[String]) -> Result<Vec<genres::Model>> {
        self.genre_repo().get_by_slugs(slugs).await
    }

    pub async fn create_genre(&self, name: &str, slug: &str) -> Result<genres::Model> {
        self.genre_repo().create(name, slug).await
    }

    pub async fn delete_genre(&self, slug: &str) -> Result<bool> {
        self.genre_repo().delete_by_slug(slug).await
    }

    // ========== Titles ==========

    pub async fn list_titles(
        &self,
        filters: &TitleFilters,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<TitleRecord>, u64)> {
        self.title_repo().list(filters, page, page_size).await
    }

    pub async fn get_title(&self, id: i32) -> Result<Option<TitleRecord>> {
        self.title_repo().get(id).await
    }

    pub async fn create_title(&self, new: NewTitle) -> Result<i32> {
        self.title_repo().create(new).await
    }

    pub async fn update_title(&self, id: i32, patch: TitlePatch) -> Result<bool> {
        self.title_repo().update(id, patch).await
    }

    pub async fn delete_title(&self, id: i32) -> Result<bool> {
        self.title_repo().delete(id).await
    }

    // ========== Reviews ==========

    pub async fn list_reviews(
        &self,
        title_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<reviews::Model>, u64)> {
        self.review_repo().list_for_title(title_id, page, page_size).await
    }

    pub async fn get_review(&self, title_id: i32, review_id: i32) -> Result<Option<reviews::Model>> {
        self.review_repo().get(title_id, review_id).await
    }

    pub async fn find_review_by_author(
        &self,
        title_id: i32,
        author_id: i32,
    ) -> Result<Option<reviews::Model>> {
        self.review_repo().find_by_author(title_id, author_id).await
    }

    pub async fn create_review(
        &self,
        title_id: i32,
        author_id: i32,
        text: String,
        score: i32,
    ) -> Result<reviews::Model> {
        self.review_repo().create(title_id, author_id, text, score).await
    }

    pub async fn update_review(
        &self,
        review: reviews::Model,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<reviews::Model> {
        self.review_repo().update(review, text, score).await
    }

    pub async fn delete_review(&self, review: reviews::Model) -> Result<()> {
        self.review_repo().delete(review).await
    }

    // ========== Comments ==========

    pub async fn list_comments(
        &self,
        review_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<comments::Model>, u64)> {
        self.comment_repo().list_for_review(review_id, page, page_size).await
    }

    pub async fn get_comment(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Option<comments::Model>> {
        self.comment_repo().get(review_id, comment_id).await
    }

    pub async fn create_comment(
        &self,
        review_id: i32,
        author_id: i32,
        text: String,
    ) -> Result<comments::Model> {
        self.comment_repo().create(review_id, author_id, text).await
    }

    pub async fn update_comment(
        &self,
        comment: comments::Model,
        text: String,
    ) -> Result<comments::Model> {
        self.comment_repo().update(comment, text).await
    }

    pub async fn delete_comment(&self, comment: comments::Model) -> Result<()> {
        self.comment_repo().delete(comment).await
    }

    // ========== Users ==========

    pub async fn create_user(&self, email: &str, secret: &str) -> Result<users::Model> {
        self.user_repo().create(email, secret).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<Vec<users::Model>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_login(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<users::Model>> {
        self.user_repo().get_by_email_and_secret(email, secret).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn list_users(&self, page: u64, page_size: u64) -> Result<(Vec<users::Model>, u64)> {
        self.user_repo().list(page, page_size).await
    }

    pub async fn update_user(&self, user: users::Model, patch: UserPatch) -> Result<users::Model> {
        self.user_repo().update(user, patch).await
    }

    pub async fn set_user_role(&self, email: &str, role: Role) -> Result<bool> {
        self.user_repo().set_role_by_email(email, role).await
    }

    pub async fn delete_user(&self, username: &str) -> Result<bool> {
        self.user_repo().delete_by_username(username).await
    }
}

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entities::{genres, prelude::*};

/// Repository for genre operations
pub struct GenreRepository {
    conn: DatabaseConnection,
}

impl GenreRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<genres::Model>, u64)> {
        let mut query = Genres::find().order_by_asc(genres::Column::Name);

        if let Some(name) = search {
            query = query.filter(genres::Column::Name.eq(name));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let count = paginator.num_items().await.context("Failed to count genres")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch genre page")?;

        Ok((rows, count))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<genres::Model>> {
        Genres::find()
            .filter(genres::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query genre by slug")
    }

    /// Resolve a set of slugs to genres. Unknown slugs are dropped silently;
    /// the title handlers rely on that.
    pub async fn get_by_slugs(&self, slugs: &[String]) -> Result<Vec<genres::Model>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        Genres::find()
            .filter(genres::Column::Slug.is_in(slugs.iter().map(String::as_str)))
            .all(&self.conn)
            .await
            .context("Failed to query genres by slugs")
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<genres::Model> {
        let active = genres::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let genre = active
            .insert(&self.conn)
            .await
            .context("Failed to insert genre")?;

        info!("Created genre {}", genre.slug);
        Ok(genre)
    }

    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let result = Genres::delete_many()
            .filter(genres::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await
            .context("Failed to delete genre")?;

        Ok(result.rows_affected > 0)
    }
}

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entities::{categories, prelude::*};

/// Repository for category operations
pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List categories, optionally restricted to an exact name match.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<categories::Model>, u64)> {
        let mut query = Categories::find().order_by_asc(categories::Column::Name);

        if let Some(name) = search {
            query = query.filter(categories::Column::Name.eq(name));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let count = paginator.num_items().await.context("Failed to count categories")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch category page")?;

        Ok((rows, count))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<categories::Model>> {
        Categories::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(&self.conn)
            .await
            .context("Failed to query category by slug")
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<categories::Model> {
        let active = categories::ActiveModel {
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            ..Default::default()
        };

        let category = active
            .insert(&self.conn)
            .await
            .context("Failed to insert category")?;

        info!("Created category {}", category.slug);
        Ok(category)
    }

    /// Delete by slug. Titles referencing the category keep existing with
    /// their category set to NULL (FK `SET NULL`).
    pub async fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let result = Categories::delete_many()
            .filter(categories::Column::Slug.eq(slug))
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;

        Ok(result.rows_affected > 0)
    }
}

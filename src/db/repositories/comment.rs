use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::{comments, prelude::*};

/// Repository for comment operations
pub struct CommentRepository {
    conn: DatabaseConnection,
}

impl CommentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_review(
        &self,
        review_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<comments::Model>, u64)> {
        let paginator = Comments::find()
            .filter(comments::Column::ReviewId.eq(review_id))
            .order_by_asc(comments::Column::Id)
            .paginate(&self.conn, page_size);

        let count = paginator.num_items().await.context("Failed to count comments")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch comment page")?;

        Ok((rows, count))
    }

    pub async fn get(&self, review_id: i32, comment_id: i32) -> Result<Option<comments::Model>> {
        Comments::find_by_id(comment_id)
            .filter(comments::Column::ReviewId.eq(review_id))
            .one(&self.conn)
            .await
            .context("Failed to query comment")
    }

    pub async fn create(
        &self,
        review_id: i32,
        author_id: i32,
        text: String,
    ) -> Result<comments::Model> {
        let active = comments::ActiveModel {
            review_id: Set(review_id),
            author_id: Set(author_id),
            text: Set(text),
            pub_date: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active.insert(&self.conn).await.context("Failed to insert comment")
    }

    pub async fn update(&self, comment: comments::Model, text: String) -> Result<comments::Model> {
        let mut active: comments::ActiveModel = comment.into();
        active.text = Set(text);

        active.update(&self.conn).await.context("Failed to update comment")
    }

    pub async fn delete(&self, comment: comments::Model) -> Result<()> {
        comment
            .delete(&self.conn)
            .await
            .context("Failed to delete comment")?;
        Ok(())
    }
}

use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entities::{prelude::*, reviews, titles};

/// Repository for review operations.
///
/// Every write runs in a transaction that also recomputes the owning title's
/// rating, so two concurrent reviews cannot leave a stale aggregate behind.
pub struct ReviewRepository {
    conn: DatabaseConnection,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_for_title(
        &self,
        title_id: i32,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<reviews::Model>, u64)> {
        let paginator = Reviews::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .order_by_asc(reviews::Column::Id)
            .paginate(&self.conn, page_size);

        let count = paginator.num_items().await.context("Failed to count reviews")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch review page")?;

        Ok((rows, count))
    }

    /// Fetch a review, requiring it to belong to the given title.
    pub async fn get(&self, title_id: i32, review_id: i32) -> Result<Option<reviews::Model>> {
        Reviews::find_by_id(review_id)
            .filter(reviews::Column::TitleId.eq(title_id))
            .one(&self.conn)
            .await
            .context("Failed to query review")
    }

    pub async fn find_by_author(
        &self,
        title_id: i32,
        author_id: i32,
    ) -> Result<Option<reviews::Model>> {
        Reviews::find()
            .filter(reviews::Column::TitleId.eq(title_id))
            .filter(reviews::Column::AuthorId.eq(author_id))
            .one(&self.conn)
            .await
            .context("Failed to query review by author")
    }

    pub async fn create(
        &self,
        title_id: i32,
        author_id: i32,
        text: String,
        score: i32,
    ) -> Result<reviews::Model> {
        self.conn
            .transaction::<_, reviews::Model, DbErr>(move |txn| {
                Box::pin(async move {
                    let active = reviews::ActiveModel {
                        title_id: Set(title_id),
                        author_id: Set(author_id),
                        text: Set(text),
                        score: Set(score),
                        pub_date: Set(chrono::Utc::now().to_rfc3339()),
                        ..Default::default()
                    };
                    let review = active.insert(txn).await?;

                    recompute_rating(txn, title_id).await?;
                    Ok(review)
                })
            })
            .await
            .map_err(|e| anyhow::anyhow!("review create transaction failed: {e}"))
    }

    pub async fn update(
        &self,
        review: reviews::Model,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<reviews::Model> {
        let title_id = review.title_id;

        self.conn
            .transaction::<_, reviews::Model, DbErr>(move |txn| {
                Box::pin(async move {
                    let mut active: reviews::ActiveModel = review.into();
                    if let Some(text) = text {
                        active.text = Set(text);
                    }
                    if let Some(score) = score {
                        active.score = Set(score);
                    }
                    let review = active.update(txn).await?;

                    recompute_rating(txn, title_id).await?;
                    Ok(review)
                })
            })
            .await
            .map_err(|e| anyhow::anyhow!("review update transaction failed: {e}"))
    }

    pub async fn delete(&self, review: reviews::Model) -> Result<()> {
        let title_id = review.title_id;

        self.conn
            .transaction::<_, (), DbErr>(move |txn| {
                Box::pin(async move {
                    review.delete(txn).await?;
                    recompute_rating(txn, title_id).await?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| anyhow::anyhow!("review delete transaction failed: {e}"))
    }
}

/// Persist the rounded mean score of a title's reviews, NULL when none exist.
async fn recompute_rating<C: ConnectionTrait>(conn: &C, title_id: i32) -> Result<(), DbErr> {
    let scores: Vec<i64> = Reviews::find()
        .filter(reviews::Column::TitleId.eq(title_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|r| i64::from(r.score))
        .collect();

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    let rating = if scores.is_empty() {
        None
    } else {
        let mean = scores.iter().sum::<i64>() as f64 / scores.len() as f64;
        Some(mean.round() as i32)
    };

    Titles::update_many()
        .col_expr(titles::Column::Rating, Expr::value(rating))
        .filter(titles::Column::Id.eq(title_id))
        .exec(conn)
        .await?;

    Ok(())
}

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

use crate::entities::{categories, genres, prelude::*, title_genres, titles};

/// A title together with its resolved category and genres.
#[derive(Debug, Clone)]
pub struct TitleRecord {
    pub title: titles::Model,
    pub category: Option<categories::Model>,
    pub genres: Vec<genres::Model>,
}

#[derive(Debug, Default, Clone)]
pub struct TitleFilters {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub category: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<i32>,
    pub genre_ids: Vec<i32>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct TitlePatch {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub category_id: Option<i32>,
    pub genre_ids: Option<Vec<i32>>,
}

/// Repository for title operations
pub struct TitleRepository {
    conn: DatabaseConnection,
}

impl TitleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// List titles ordered by rating descending (unrated titles sort last,
    /// the SQLite default for NULL under DESC), then by id for stability.
    pub async fn list(
        &self,
        filters: &TitleFilters,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<TitleRecord>, u64)> {
        let mut query = Titles::find();

        if let Some(name) = &filters.name {
            query = query.filter(titles::Column::Name.contains(name));
        }
        if let Some(year) = filters.year {
            query = query.filter(titles::Column::Year.eq(year));
        }
        if let Some(slug) = &filters.category {
            let Some(category) = Categories::find()
                .filter(categories::Column::Slug.eq(slug))
                .one(&self.conn)
                .await
                .context("Failed to resolve category filter")?
            else {
                return Ok((Vec::new(), 0));
            };
            query = query.filter(titles::Column::CategoryId.eq(category.id));
        }
        if let Some(slug) = &filters.genre {
            let Some(genre) = Genres::find()
                .filter(genres::Column::Slug.eq(slug))
                .one(&self.conn)
                .await
                .context("Failed to resolve genre filter")?
            else {
                return Ok((Vec::new(), 0));
            };

            let title_ids: Vec<i32> = TitleGenres::find()
                .filter(title_genres::Column::GenreId.eq(genre.id))
                .all(&self.conn)
                .await
                .context("Failed to query genre links")?
                .into_iter()
                .map(|link| link.title_id)
                .collect();

            query = query.filter(titles::Column::Id.is_in(title_ids));
        }

        let paginator = query
            .order_by_desc(titles::Column::Rating)
            .order_by_asc(titles::Column::Id)
            .paginate(&self.conn, page_size);

        let count = paginator.num_items().await.context("Failed to count titles")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch title page")?;

        let records = self.hydrate(rows).await?;
        Ok((records, count))
    }

    pub async fn get(&self, id: i32) -> Result<Option<TitleRecord>> {
        let Some(title) = Titles::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query title")?
        else {
            return Ok(None);
        };

        let mut records = self.hydrate(vec![title]).await?;
        Ok(records.pop())
    }

    /// Insert the title and its genre links in one transaction.
    pub async fn create(&self, new: NewTitle) -> Result<i32> {
        let id = self
            .conn
            .transaction::<_, i32, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let active = titles::ActiveModel {
                        name: Set(new.name),
                        year: Set(new.year),
                        description: Set(new.description),
                        slug: Set(new.slug),
                        category_id: Set(new.category_id),
                        ..Default::default()
                    };
                    let title = active.insert(txn).await?;

                    for genre_id in new.genre_ids {
                        let link = title_genres::ActiveModel {
                            title_id: Set(title.id),
                            genre_id: Set(genre_id),
                        };
                        TitleGenres::insert(link).exec(txn).await?;
                    }

                    Ok(title.id)
                })
            })
            .await
            .map_err(|e| anyhow::anyhow!("title create transaction failed: {e}"))?;

        info!("Created title {}", id);
        Ok(id)
    }

    /// Apply a partial update; replaces the genre set when one is given.
    /// Returns false when the title does not exist.
    pub async fn update(&self, id: i32, patch: TitlePatch) -> Result<bool> {
        self.conn
            .transaction::<_, bool, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let Some(title) = Titles::find_by_id(id).one(txn).await? else {
                        return Ok(false);
                    };

                    let mut active: titles::ActiveModel = title.into();
                    if let Some(name) = patch.name {
                        active.name = Set(name);
                    }
                    if let Some(year) = patch.year {
                        active.year = Set(year);
                    }
                    if let Some(description) = patch.description {
                        active.description = Set(Some(description));
                    }
                    if let Some(slug) = patch.slug {
                        active.slug = Set(Some(slug));
                    }
                    if let Some(category_id) = patch.category_id {
                        active.category_id = Set(Some(category_id));
                    }
                    active.update(txn).await?;

                    if let Some(genre_ids) = patch.genre_ids {
                        TitleGenres::delete_many()
                            .filter(title_genres::Column::TitleId.eq(id))
                            .exec(txn)
                            .await?;
                        for genre_id in genre_ids {
                            let link = title_genres::ActiveModel {
                                title_id: Set(id),
                                genre_id: Set(genre_id),
                            };
                            TitleGenres::insert(link).exec(txn).await?;
                        }
                    }

                    Ok(true)
                })
            })
            .await
            .map_err(|e| anyhow::anyhow!("title update transaction failed: {e}"))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Titles::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete title")?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Attach categories and genres to a page of titles with two batch
    /// queries instead of one pair per row.
    async fn hydrate(&self, rows: Vec<titles::Model>) -> Result<Vec<TitleRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let title_ids: Vec<i32> = rows.iter().map(|t| t.id).collect();
        let category_ids: Vec<i32> = rows.iter().filter_map(|t| t.category_id).collect();

        let categories_by_id: HashMap<i32, categories::Model> = Categories::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&self.conn)
            .await
            .context("Failed to batch-load categories")?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let links = TitleGenres::find()
            .filter(title_genres::Column::TitleId.is_in(title_ids))
            .all(&self.conn)
            .await
            .context("Failed to batch-load genre links")?;

        let genres_by_id: HashMap<i32, genres::Model> = Genres::find()
            .filter(genres::Column::Id.is_in(links.iter().map(|l| l.genre_id).collect::<Vec<_>>()))
            .all(&self.conn)
            .await
            .context("Failed to batch-load genres")?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();

        let mut genres_by_title: HashMap<i32, Vec<genres::Model>> = HashMap::new();
        for link in links {
            if let Some(genre) = genres_by_id.get(&link.genre_id) {
                genres_by_title
                    .entry(link.title_id)
                    .or_default()
                    .push(genre.clone());
            }
        }

        Ok(rows
            .into_iter()
            .map(|title| TitleRecord {
                category: title
                    .category_id
                    .and_then(|id| categories_by_id.get(&id).cloned()),
                genres: genres_by_title.remove(&title.id).unwrap_or_default(),
                title,
            })
            .collect())
    }
}

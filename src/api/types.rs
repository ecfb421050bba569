use serde::{Deserialize, Serialize};

use crate::db::TitleRecord;
use crate::entities::{categories, comments, genres, reviews, users};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Page-number pagination envelope with relative next/previous links.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `filters` are the list's active query parameters; they are carried
    /// into the next/previous links so following a link keeps the filter.
    #[must_use]
    pub fn new(
        path: &str,
        filters: &[(&str, String)],
        page: u64,
        page_size: u64,
        count: u64,
        results: Vec<T>,
    ) -> Self {
        let total_pages = count.div_ceil(page_size.max(1));

        let link = |page: u64| {
            let mut url = format!("{path}?page={page}&page_size={page_size}");
            for (key, value) in filters {
                url.push('&');
                url.push_str(key);
                url.push('=');
                url.push_str(value);
            }
            url
        };

        let next = (page < total_pages).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        Self {
            count,
            next,
            previous,
            results,
        }
    }
}


/// Common `?page=` / `?page_size=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub name: String,
    pub slug: String,
}

impl From<categories::Model> for CategoryDto {
    fn from(model: categories::Model) -> Self {
        Self {
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenreDto {
    pub name: String,
    pub slug: String,
}

impl From<genres::Model> for GenreDto {
    fn from(model: genres::Model) -> Self {
        Self {
            name: model.name,
            slug: model.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TitleDto {
    pub id: i32,
    pub name: String,
    pub year: i32,
    pub rating: Option<i32>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub category: Option<CategoryDto>,
    pub genre: Vec<GenreDto>,
}

impl From<TitleRecord> for TitleDto {
    fn from(record: TitleRecord) -> Self {
        Self {
            id: record.title.id,
            name: record.title.name,
            year: record.title.year,
            rating: record.title.rating,
            description: record.title.description,
            slug: record.title.slug,
            category: record.category.map(CategoryDto::from),
            genre: record.genres.into_iter().map(GenreDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewDto {
    pub id: i32,
    pub title: i32,
    pub text: String,
    /// Author display name: username when set, email otherwise.
    pub author: String,
    pub score: i32,
    pub pub_date: String,
}

impl ReviewDto {
    #[must_use]
    pub fn new(review: reviews::Model, author: &users::Model) -> Self {
        Self {
            id: review.id,
            title: review.title_id,
            text: review.text,
            author: display_name(author),
            score: review.score,
            pub_date: review.pub_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentDto {
    pub id: i32,
    pub text: String,
    pub author: String,
    pub pub_date: String,
}

impl CommentDto {
    #[must_use]
    pub fn new(comment: comments::Model, author: &users::Model) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: display_name(author),
            pub_date: comment.pub_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: Option<String>,
    pub role: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl From<users::Model> for UserDto {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            role: model.role,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            bio: model.bio,
        }
    }
}

#[must_use]
pub fn display_name(user: &users::Model) -> String {
    user.username.clone().unwrap_or_else(|| user.email.clone())
}

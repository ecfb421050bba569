use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::auth::Role;
use crate::entities::{prelude::*, users};

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<Role>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// Repository for user operations
pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a bare user from the code-request flow: email plus freshly
    /// minted secret, everything else unset.
    pub async fn create(&self, email: &str, secret: &str) -> Result<users::Model> {
        let active = users::ActiveModel {
            email: Set(email.to_string()),
            secret: Set(secret.to_string()),
            role: Set(Role::User.as_str().to_string()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let user = active.insert(&self.conn).await.context("Failed to insert user")?;
        info!("Created user {}", user.email);
        Ok(user)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        Users::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<users::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Users::find()
            .filter(users::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query users by ids")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")
    }

    /// The login pair must match exactly; a miss on either field is a miss.
    pub async fn get_by_email_and_secret(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .filter(users::Column::Secret.eq(secret))
            .one(&self.conn)
            .await
            .context("Failed to query user by login pair")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn list(&self, page: u64, page_size: u64) -> Result<(Vec<users::Model>, u64)> {
        let paginator = Users::find()
            .order_by_asc(users::Column::Id)
            .paginate(&self.conn, page_size);

        let count = paginator.num_items().await.context("Failed to count users")?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .context("Failed to fetch user page")?;

        Ok((rows, count))
    }

    pub async fn update(&self, user: users::Model, patch: UserPatch) -> Result<users::Model> {
        let mut active: users::ActiveModel = user.into();

        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(username) = patch.username {
            active.username = Set(Some(username));
        }
        if let Some(role) = patch.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(first_name) = patch.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = patch.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(bio) = patch.bio {
            active.bio = Set(Some(bio));
        }

        active.update(&self.conn).await.context("Failed to update user")
    }

    /// Change a user's role, keyed by email. Only the admin user-management
    /// path goes through this.
    pub async fn set_role_by_email(&self, email: &str, role: Role) -> Result<bool> {
        let Some(user) = self.get_by_email(email).await? else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = user.into();
        active.role = Set(role.as_str().to_string());
        active.update(&self.conn).await.context("Failed to update user role")?;

        Ok(true)
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<bool> {
        let result = Users::delete_many()
            .filter(users::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }
}

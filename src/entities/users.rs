use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    /// One-time confirmation code mailed to the user, presented again
    /// as the credential for the token exchange.
    pub secret: String,

    /// Unset until the user fills it in via `PATCH /users/me`.
    #[sea_orm(unique)]
    pub username: Option<String>,

    /// Stored as "user" | "staff" | "admin".
    pub role: String,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub bio: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
}

impl ActiveModelBehavior for ActiveModel {}

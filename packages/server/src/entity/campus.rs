use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campus")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    /// Unique among active campuses (partial index, see `seed::ensure_indexes`).
    pub code: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,

    /// User with the `campus-admin` role who manages this campus.
    pub admin_id: Option<i32>,
    pub is_active: bool,

    #[sea_orm(has_many)]
    pub classes: HasMany<super::class::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

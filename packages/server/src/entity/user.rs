use common::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,

    /// Home campus for campus-admins, teachers and students. NULL for super-admins.
    pub campus_id: Option<i32>,
    pub is_active: bool,

    #[sea_orm(has_many)]
    pub enrollments: HasMany<super::enrollment::Entity>,

    #[sea_orm(has_many)]
    pub scores: HasMany<super::score::Entity>,

    #[sea_orm(has_many)]
    pub marksheets: HasMany<super::marksheet::Entity>,

    #[sea_orm(has_many)]
    pub teacher_attendance: HasMany<super::teacher_attendance::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

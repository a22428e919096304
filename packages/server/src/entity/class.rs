use common::Section;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "class")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub grade: i32,
    pub section: Section,

    pub campus_id: i32,
    #[sea_orm(belongs_to, from = "campus_id", to = "id")]
    pub campus: HasOne<super::campus::Entity>,

    /// At most one active class per teacher.
    pub class_teacher_id: Option<i32>,
    pub is_active: bool,

    /// Required subjects for marksheet completion, ordered by `class_subject.position`.
    #[sea_orm(has_many, via = "class_subject")]
    pub subjects: HasMany<super::subject::Entity>,

    #[sea_orm(has_many)]
    pub enrollments: HasMany<super::enrollment::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

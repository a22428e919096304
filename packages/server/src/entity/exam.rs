use common::Term;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An evaluation definition (e.g. "Assessment 1") for one class + subject in a term.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exam")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub term: Term,
    pub academic_session: String,

    pub class_id: i32,
    #[sea_orm(belongs_to, from = "class_id", to = "id")]
    pub class: HasOne<super::class::Entity>,

    pub subject_id: i32,
    #[sea_orm(belongs_to, from = "subject_id", to = "id")]
    pub subject: HasOne<super::subject::Entity>,

    pub campus_id: i32,

    /// Always > 0; enforced on create and update.
    pub total_marks: f64,
    /// Free-form evaluation type ("Examination", "Assessment 1", ...).
    pub exam_type: String,

    #[sea_orm(has_many)]
    pub scores: HasMany<super::score::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

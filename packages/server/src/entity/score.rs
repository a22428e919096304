use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One student's marks for one exam. Unique on (student_id, exam_id).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "score")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,
    #[sea_orm(belongs_to, from = "student_id", to = "id")]
    pub student: HasOne<super::user::Entity>,

    pub class_id: i32,
    pub subject_id: i32,
    pub campus_id: i32,

    pub exam_id: i32,
    #[sea_orm(belongs_to, from = "exam_id", to = "id")]
    pub exam: HasOne<super::exam::Entity>,

    pub marks_obtained: f64,
    pub is_present: bool,
    pub remarks: Option<String>,
    pub entered_by: Option<i32>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use common::{Grade, Term};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Folded result for one required subject.
/// Stored as JSON array in the database, in curriculum order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SubjectEntry {
    pub subject_id: i32,
    pub subject_name: String,
    pub marks_obtained: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub grade: Grade,
}

/// Materialized report card for (student, class, term, academic_session).
///
/// Written only by the marksheet pipeline; every write replaces the whole row.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "marksheet")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_id: i32,
    #[sea_orm(belongs_to, from = "student_id", to = "id")]
    pub student: HasOne<super::user::Entity>,

    pub class_id: i32,
    pub campus_id: i32,
    pub term: Term,
    pub academic_session: String,

    /// JSON array of `SubjectEntry`.
    #[sea_orm(column_type = "JsonBinary")]
    pub subjects: serde_json::Value,
    pub grand_obtained: f64,
    pub grand_total: f64,
    pub overall_percentage: f64,
    pub overall_grade: Grade,
    /// Position within (class, term, session); set only by the ranking pass.
    pub rank: Option<i32>,
    #[sea_orm(column_type = "Text")]
    pub final_remarks: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

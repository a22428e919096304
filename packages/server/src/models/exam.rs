use chrono::{DateTime, Utc};
use common::Term;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, has_at_most_two_decimals, validate_session, validate_text};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateExamRequest {
    #[schema(example = "Mid-term Mathematics")]
    pub name: String,
    pub term: Term,
    #[schema(example = "2025-2026")]
    pub academic_session: String,
    pub class_id: i32,
    pub subject_id: i32,
    /// Must be greater than zero.
    #[schema(example = 100.0)]
    pub total_marks: f64,
    #[schema(example = "Examination")]
    pub exam_type: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateExamRequest {
    pub name: Option<String>,
    /// Changing this re-derives the marksheet of every student scored on the exam.
    pub total_marks: Option<f64>,
    pub exam_type: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExamListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub campus_id: Option<i32>,
    pub class_id: Option<i32>,
    pub subject_id: Option<i32>,
    pub term: Option<Term>,
    pub academic_session: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExamResponse {
    pub id: i32,
    pub name: String,
    pub term: Term,
    pub academic_session: String,
    pub class_id: i32,
    pub subject_id: i32,
    pub campus_id: i32,
    pub total_marks: f64,
    pub exam_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::exam::Model> for ExamResponse {
    fn from(m: crate::entity::exam::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            term: m.term,
            academic_session: m.academic_session,
            class_id: m.class_id,
            subject_id: m.subject_id,
            campus_id: m.campus_id,
            total_marks: m.total_marks,
            exam_type: m.exam_type,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExamListResponse {
    pub data: Vec<ExamResponse>,
    pub pagination: Pagination,
}

fn validate_total_marks(total: f64) -> Result<(), AppError> {
    if !total.is_finite() || total <= 0.0 || total > 10_000.0 {
        return Err(AppError::Validation(
            "total_marks must be greater than 0 and at most 10000".into(),
        ));
    }
    if !has_at_most_two_decimals(total) {
        return Err(AppError::Validation(
            "total_marks must have at most 2 decimal places".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_exam(req: &CreateExamRequest) -> Result<(), AppError> {
    validate_text("Name", &req.name, 128)?;
    validate_session(&req.academic_session)?;
    validate_total_marks(req.total_marks)?;
    validate_text("Exam type", &req.exam_type, 64)
}

pub fn validate_update_exam(req: &UpdateExamRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_text("Name", name, 128)?;
    }
    if let Some(total) = req.total_marks {
        validate_total_marks(total)?;
    }
    if let Some(ref exam_type) = req.exam_type {
        validate_text("Exam type", exam_type, 64)?;
    }
    Ok(())
}

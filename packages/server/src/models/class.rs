use chrono::{DateTime, Utc};
use common::Section;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, double_option, validate_ordered_ids};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateClassRequest {
    /// Grade level, 1-12.
    #[schema(example = 9)]
    pub grade: i32,
    pub section: Section,
    pub campus_id: i32,
    /// Required subjects in display order. Positions are assigned 0, 1, 2...
    #[schema(example = json!([3, 1, 7]))]
    pub subject_ids: Vec<i32>,
    pub class_teacher_id: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateClassRequest {
    pub grade: Option<i32>,
    pub section: Option<Section>,
    /// Replaces the whole curriculum when present.
    pub subject_ids: Option<Vec<i32>>,
    /// `null` removes the class teacher.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub class_teacher_id: Option<Option<i32>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub campus_id: Option<i32>,
    pub grade: Option<i32>,
    pub include_inactive: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassSubjectItem {
    pub subject_id: i32,
    pub name: String,
    pub code: String,
    pub position: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassResponse {
    pub id: i32,
    pub grade: i32,
    pub section: Section,
    pub campus_id: i32,
    pub class_teacher_id: Option<i32>,
    pub is_active: bool,
    pub subjects: Vec<ClassSubjectItem>,
    pub created_at: DateTime<Utc>,
}

impl ClassResponse {
    pub fn from_parts(m: crate::entity::class::Model, subjects: Vec<ClassSubjectItem>) -> Self {
        Self {
            id: m.id,
            grade: m.grade,
            section: m.section,
            campus_id: m.campus_id,
            class_teacher_id: m.class_teacher_id,
            is_active: m.is_active,
            subjects,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassListItem {
    pub id: i32,
    pub grade: i32,
    pub section: Section,
    pub campus_id: i32,
    pub class_teacher_id: Option<i32>,
    pub is_active: bool,
}

impl From<crate::entity::class::Model> for ClassListItem {
    fn from(m: crate::entity::class::Model) -> Self {
        Self {
            id: m.id,
            grade: m.grade,
            section: m.section,
            campus_id: m.campus_id,
            class_teacher_id: m.class_teacher_id,
            is_active: m.is_active,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClassListResponse {
    pub data: Vec<ClassListItem>,
    pub pagination: Pagination,
}

fn validate_grade(grade: i32) -> Result<(), AppError> {
    if !(1..=12).contains(&grade) {
        return Err(AppError::Validation("Grade must be between 1 and 12".into()));
    }
    Ok(())
}

pub fn validate_create_class(req: &CreateClassRequest) -> Result<(), AppError> {
    validate_grade(req.grade)?;
    validate_ordered_ids(&req.subject_ids, "subject_id")
}

pub fn validate_update_class(req: &UpdateClassRequest) -> Result<(), AppError> {
    if let Some(grade) = req.grade {
        validate_grade(grade)?;
    }
    if let Some(ref ids) = req.subject_ids {
        validate_ordered_ids(ids, "subject_id")?;
    }
    Ok(())
}

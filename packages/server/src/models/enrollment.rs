use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, validate_session, validate_text};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEnrollmentRequest {
    pub student_id: i32,
    pub class_id: i32,
    #[schema(example = "12")]
    pub roll_number: String,
    #[schema(example = "2025-2026")]
    pub academic_session: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateEnrollmentRequest {
    pub roll_number: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub campus_id: Option<i32>,
    pub class_id: Option<i32>,
    pub academic_session: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrollmentResponse {
    pub id: i32,
    pub student_id: i32,
    pub student_name: Option<String>,
    pub campus_id: i32,
    pub class_id: i32,
    pub roll_number: String,
    pub academic_session: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl EnrollmentResponse {
    pub fn from_parts(m: crate::entity::enrollment::Model, student_name: Option<String>) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            student_name,
            campus_id: m.campus_id,
            class_id: m.class_id,
            roll_number: m.roll_number,
            academic_session: m.academic_session,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EnrollmentListResponse {
    pub data: Vec<EnrollmentResponse>,
    pub pagination: Pagination,
}

pub fn validate_create_enrollment(req: &CreateEnrollmentRequest) -> Result<(), AppError> {
    validate_text("Roll number", &req.roll_number, 16)?;
    validate_session(&req.academic_session)
}

pub fn validate_update_enrollment(req: &UpdateEnrollmentRequest) -> Result<(), AppError> {
    if let Some(ref roll) = req.roll_number {
        validate_text("Roll number", roll, 16)?;
    }
    Ok(())
}

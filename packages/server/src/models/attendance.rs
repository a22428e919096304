use chrono::{DateTime, NaiveDate, Utc};
use common::AttendanceStatus;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, validate_bulk_ids};
use crate::error::AppError;

/// Upper bound on rows per bulk attendance submission.
pub const MAX_BULK_ATTENDANCE: usize = 200;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AttendanceEntry {
    pub enrollment_id: i32,
    pub status: AttendanceStatus,
}

/// Attendance for one class on one day; re-marking a day overwrites it.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct MarkAttendanceRequest {
    pub class_id: i32,
    #[schema(value_type = String, format = Date, example = "2025-10-14")]
    pub date: NaiveDate,
    pub records: Vec<AttendanceEntry>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateAttendanceRequest {
    pub status: AttendanceStatus,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub campus_id: Option<i32>,
    pub class_id: Option<i32>,
    pub enrollment_id: Option<i32>,
    pub status: Option<AttendanceStatus>,
    /// Inclusive lower bound.
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound.
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttendanceResponse {
    pub id: i32,
    pub enrollment_id: i32,
    pub class_id: i32,
    pub campus_id: i32,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub marked_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::attendance::Model> for AttendanceResponse {
    fn from(m: crate::entity::attendance::Model) -> Self {
        Self {
            id: m.id,
            enrollment_id: m.enrollment_id,
            class_id: m.class_id,
            campus_id: m.campus_id,
            status: m.status,
            date: m.date,
            marked_by: m.marked_by,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceResponse>,
    pub pagination: Pagination,
}

pub fn validate_mark_attendance(req: &MarkAttendanceRequest) -> Result<(), AppError> {
    let ids: Vec<i32> = req.records.iter().map(|r| r.enrollment_id).collect();
    validate_bulk_ids(&ids, "records", MAX_BULK_ATTENDANCE)?;
    if req.date > Utc::now().date_naive() {
        return Err(AppError::Validation(
            "Attendance cannot be marked for a future date".into(),
        ));
    }
    Ok(())
}

pub fn validate_attendance_range(query: &AttendanceListQuery) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (query.from, query.to)
        && to < from
    {
        return Err(AppError::Validation("`to` must not be before `from`".into()));
    }
    Ok(())
}

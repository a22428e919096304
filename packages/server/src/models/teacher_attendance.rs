use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use common::AttendanceStatus;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, double_option};
use crate::error::AppError;

/// Teachers check in for themselves; admins name the teacher.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CheckInRequest {
    /// Required for admins, must be omitted (or equal the caller) for teachers.
    pub teacher_id: Option<i32>,
    /// Defaults to `present`.
    pub status: Option<AttendanceStatus>,
    /// Defaults to today (UTC).
    #[schema(value_type = Option<String>, format = Date, example = "2025-10-14")]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CheckOutRequest {
    pub teacher_id: Option<i32>,
    #[schema(value_type = Option<String>, format = Date, example = "2025-10-14")]
    pub date: Option<NaiveDate>,
}

/// Admin correction of a day record.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateTeacherAttendanceRequest {
    pub status: Option<AttendanceStatus>,
    /// `null` clears the check-in time.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub check_in: Option<Option<DateTime<Utc>>>,
    /// `null` reopens the day.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub check_out: Option<Option<DateTime<Utc>>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherAttendanceListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub campus_id: Option<i32>,
    pub teacher_id: Option<i32>,
    pub status: Option<AttendanceStatus>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeacherAttendanceHistoryQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeacherAttendanceResponse {
    pub id: i32,
    pub teacher_id: i32,
    /// Omitted when the teacher row was not loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_email: Option<String>,
    pub campus_id: i32,
    pub status: AttendanceStatus,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub marked_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::teacher_attendance::Model> for TeacherAttendanceResponse {
    fn from(m: crate::entity::teacher_attendance::Model) -> Self {
        Self {
            id: m.id,
            teacher_id: m.teacher_id,
            teacher_name: None,
            teacher_email: None,
            campus_id: m.campus_id,
            status: m.status,
            date: m.date,
            check_in: m.check_in,
            check_out: m.check_out,
            marked_by: m.marked_by,
            created_at: m.created_at,
        }
    }
}

impl TeacherAttendanceResponse {
    pub fn with_teacher(
        m: crate::entity::teacher_attendance::Model,
        teacher: Option<crate::entity::user::Model>,
    ) -> Self {
        let mut res = Self::from(m);
        if let Some(t) = teacher {
            res.teacher_name = Some(t.name);
            res.teacher_email = Some(t.email);
        }
        res
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TeacherAttendanceListResponse {
    pub data: Vec<TeacherAttendanceResponse>,
    pub pagination: Pagination,
}

/// Staff attendance is a working-day record: Sundays and future days are refused.
pub fn validate_attendance_day(date: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if date > today {
        return Err(AppError::Validation(
            "Attendance cannot be marked for a future date".into(),
        ));
    }
    if date.weekday() == Weekday::Sun {
        return Err(AppError::Validation(
            "Attendance cannot be marked on Sunday".into(),
        ));
    }
    Ok(())
}

pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (from, to)
        && to < from
    {
        return Err(AppError::Validation("`to` must not be before `from`".into()));
    }
    Ok(())
}

pub fn validate_update_teacher_attendance(
    req: &UpdateTeacherAttendanceRequest,
    current_check_in: Option<DateTime<Utc>>,
    current_check_out: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    let check_in = req.check_in.unwrap_or(current_check_in);
    let check_out = req.check_out.unwrap_or(current_check_out);
    match (check_in, check_out) {
        (None, Some(_)) => Err(AppError::Validation(
            "check_out requires a check_in time".into(),
        )),
        (Some(i), Some(o)) if o < i => Err(AppError::Validation(
            "check_out must not be before check_in".into(),
        )),
        _ => Ok(()),
    }
}

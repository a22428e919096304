use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use common::{AttendanceStatus, Role};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{teacher_attendance, user};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::shared::{Pagination, page_params};
use crate::models::teacher_attendance::*;
use crate::state::AppState;
use crate::utils::scope::{admin_campus_filter, find_user, require_campus_admin_of};

const ALREADY_CHECKED_IN: &str = "Attendance is already marked for this teacher and day";

/// The teacher a check-in or check-out applies to, with their campus.
///
/// Teachers always act for themselves. Admins must name a teacher of a campus
/// they manage.
async fn resolve_teacher<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    requested: Option<i32>,
) -> Result<(user::Model, i32), AppError> {
    let teacher_id = match auth_user.role {
        Role::Teacher => {
            if requested.is_some_and(|id| id != auth_user.user_id) {
                return Err(AppError::Forbidden(
                    "Teachers can only mark their own attendance".into(),
                ));
            }
            auth_user.user_id
        }
        _ => requested.ok_or_else(|| AppError::Validation("teacher_id is required".into()))?,
    };

    let teacher = find_user(db, teacher_id).await?;
    if teacher.role != Role::Teacher || !teacher.is_active {
        return Err(AppError::Validation(
            "teacher_id must reference an active teacher".into(),
        ));
    }
    let campus_id = teacher
        .campus_id
        .ok_or_else(|| AppError::Validation("Teacher is not assigned to a campus".into()))?;
    if auth_user.role != Role::Teacher {
        require_campus_admin_of(db, auth_user, campus_id).await?;
    }
    Ok((teacher, campus_id))
}

async fn find_teacher_attendance<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<teacher_attendance::Model, AppError> {
    teacher_attendance::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Teacher attendance record not found".into()))
}

#[utoipa::path(
    post,
    path = "/check-in",
    tag = "Teacher Attendance",
    operation_id = "checkInTeacher",
    summary = "Mark a teacher's attendance for a day",
    description = "Teachers mark themselves; admins mark a teacher of their campus. A `present` day records the check-in time. Sundays and future dates are refused. One record per teacher and day. Requires `teacher_attendance:mark`.",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Attendance marked", body = TeacherAttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Teacher not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already marked for the day (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(teacher_id = ?payload.teacher_id))]
pub async fn check_in(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CheckInRequest>,
) -> Result<(StatusCode, Json<TeacherAttendanceResponse>), AppError> {
    auth_user.require_permission("teacher_attendance:mark")?;

    let now = Utc::now();
    let date = payload.date.unwrap_or_else(|| now.date_naive());
    validate_attendance_day(date, now.date_naive())?;

    let (teacher, campus_id) = resolve_teacher(&state.db, &auth_user, payload.teacher_id).await?;
    let status = payload.status.unwrap_or(AttendanceStatus::Present);

    let row = teacher_attendance::ActiveModel {
        teacher_id: Set(teacher.id),
        campus_id: Set(campus_id),
        status: Set(status),
        date: Set(date),
        check_in: Set((status == AttendanceStatus::Present).then_some(now)),
        check_out: Set(None),
        marked_by: Set(Some(auth_user.user_id)),
        created_at: Set(now),
        ..Default::default()
    };
    let model = row
        .insert(&state.db)
        .await
        .map_err(|e| conflict_on_unique(e, ALREADY_CHECKED_IN))?;

    info!(teacher_id = teacher.id, %date, ?status, "Teacher attendance marked");
    Ok((
        StatusCode::CREATED,
        Json(TeacherAttendanceResponse::with_teacher(model, Some(teacher))),
    ))
}

#[utoipa::path(
    post,
    path = "/check-out",
    tag = "Teacher Attendance",
    operation_id = "checkOutTeacher",
    summary = "Record a teacher's check-out",
    description = "Closes the day opened by a check-in. Requires `teacher_attendance:mark`.",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out", body = TeacherAttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No check-in for the day (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already checked out (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(teacher_id = ?payload.teacher_id))]
pub async fn check_out(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CheckOutRequest>,
) -> Result<Json<TeacherAttendanceResponse>, AppError> {
    auth_user.require_permission("teacher_attendance:mark")?;

    let now = Utc::now();
    let date = payload.date.unwrap_or_else(|| now.date_naive());
    let (teacher, _) = resolve_teacher(&state.db, &auth_user, payload.teacher_id).await?;

    let existing = teacher_attendance::Entity::find()
        .filter(teacher_attendance::Column::TeacherId.eq(teacher.id))
        .filter(teacher_attendance::Column::Date.eq(date))
        .one(&state.db)
        .await?
        .filter(|row| row.check_in.is_some())
        .ok_or_else(|| AppError::NotFound("No check-in found for this day".into()))?;
    if existing.check_out.is_some() {
        return Err(AppError::Conflict("Already checked out for this day".into()));
    }

    let mut active: teacher_attendance::ActiveModel = existing.into();
    active.check_out = Set(Some(now));
    let model = active.update(&state.db).await?;

    info!(teacher_id = teacher.id, %date, "Teacher checked out");
    Ok(Json(TeacherAttendanceResponse::with_teacher(model, Some(teacher))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Teacher Attendance",
    operation_id = "listTeacherAttendance",
    summary = "List teacher attendance",
    description = "Campus-admins see their campus; super-admins see every campus or filter by one. Newest dates first. Requires `teacher_attendance:manage`.",
    params(TeacherAttendanceListQuery),
    responses(
        (status = 200, description = "List of teacher attendance records", body = TeacherAttendanceListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_teacher_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TeacherAttendanceListQuery>,
) -> Result<Json<TeacherAttendanceListResponse>, AppError> {
    auth_user.require_permission("teacher_attendance:manage")?;
    validate_date_range(query.from, query.to)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = teacher_attendance::Entity::find();
    if let Some(campus_id) = admin_campus_filter(&state.db, &auth_user, query.campus_id).await? {
        select = select.filter(teacher_attendance::Column::CampusId.eq(campus_id));
    }
    if let Some(teacher_id) = query.teacher_id {
        select = select.filter(teacher_attendance::Column::TeacherId.eq(teacher_id));
    }
    if let Some(status) = query.status {
        select = select.filter(teacher_attendance::Column::Status.eq(status));
    }
    if let Some(from) = query.from {
        select = select.filter(teacher_attendance::Column::Date.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(teacher_attendance::Column::Date.lte(to));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(teacher_attendance::Column::Date)
        .order_by_asc(teacher_attendance::Column::TeacherId)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|(row, teacher)| TeacherAttendanceResponse::with_teacher(row, teacher))
        .collect();

    Ok(Json(TeacherAttendanceListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/teacher/{teacher_id}",
    tag = "Teacher Attendance",
    operation_id = "getTeacherAttendance",
    summary = "Attendance history of one teacher",
    description = "A teacher may read their own history; admins read teachers of their campus. Newest dates first.",
    params(
        ("teacher_id" = i32, Path, description = "Teacher user ID"),
        TeacherAttendanceHistoryQuery,
    ),
    responses(
        (status = 200, description = "Attendance history", body = TeacherAttendanceListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Teacher not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(teacher_id))]
pub async fn get_teacher_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(teacher_id): Path<i32>,
    AppQuery(query): AppQuery<TeacherAttendanceHistoryQuery>,
) -> Result<Json<TeacherAttendanceListResponse>, AppError> {
    auth_user.require_any_permission(&["teacher_attendance:mark", "teacher_attendance:manage"])?;
    validate_date_range(query.from, query.to)?;

    let teacher = find_user(&state.db, teacher_id).await?;
    if teacher.role != Role::Teacher {
        return Err(AppError::NotFound("Teacher not found".into()));
    }
    if auth_user.role == Role::Teacher {
        if auth_user.user_id != teacher.id {
            return Err(AppError::Forbidden(
                "Teachers can only view their own attendance".into(),
            ));
        }
    } else {
        let campus_id = teacher
            .campus_id
            .ok_or_else(|| AppError::NotFound("Teacher not found".into()))?;
        require_campus_admin_of(&state.db, &auth_user, campus_id).await?;
    }

    let (page, per_page) = page_params(query.page, query.per_page);
    let mut select = teacher_attendance::Entity::find()
        .filter(teacher_attendance::Column::TeacherId.eq(teacher.id));
    if let Some(from) = query.from {
        select = select.filter(teacher_attendance::Column::Date.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(teacher_attendance::Column::Date.lte(to));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(teacher_attendance::Column::Date)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|row| TeacherAttendanceResponse::with_teacher(row, Some(teacher.clone())))
        .collect();

    Ok(Json(TeacherAttendanceListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Teacher Attendance",
    operation_id = "updateTeacherAttendance",
    summary = "Correct a teacher attendance record",
    description = "Changes the status or the check-in and check-out times. Requires `teacher_attendance:manage`.",
    params(("id" = i32, Path, description = "Teacher attendance record ID")),
    request_body = UpdateTeacherAttendanceRequest,
    responses(
        (status = 200, description = "Record updated", body = TeacherAttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_teacher_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTeacherAttendanceRequest>,
) -> Result<Json<TeacherAttendanceResponse>, AppError> {
    auth_user.require_permission("teacher_attendance:manage")?;

    let existing = find_teacher_attendance(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    if payload == UpdateTeacherAttendanceRequest::default() {
        return Ok(Json(existing.into()));
    }
    validate_update_teacher_attendance(&payload, existing.check_in, existing.check_out)?;

    let mut active: teacher_attendance::ActiveModel = existing.into();
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(check_in) = payload.check_in {
        active.check_in = Set(check_in);
    }
    if let Some(check_out) = payload.check_out {
        active.check_out = Set(check_out);
    }
    active.marked_by = Set(Some(auth_user.user_id));
    let model = active.update(&state.db).await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Teacher Attendance",
    operation_id = "deleteTeacherAttendance",
    summary = "Delete a teacher attendance record",
    description = "Requires `teacher_attendance:manage`.",
    params(("id" = i32, Path, description = "Teacher attendance record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_teacher_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("teacher_attendance:manage")?;

    let existing = find_teacher_attendance(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    teacher_attendance::Entity::delete_by_id(id).exec(&state.db).await?;
    info!(teacher_id = existing.teacher_id, date = %existing.date, "Teacher attendance deleted");
    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::Role;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{attendance, class, enrollment};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::attendance::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;
use crate::utils::scope::{
    admin_campus_filter, find_class, load_teacher_scope, require_campus_admin_of,
};

/// Attendance is kept by the class teacher; admins may act for their campus.
async fn require_attendance_access<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    class: &class::Model,
) -> Result<(), AppError> {
    if auth_user.role == Role::Teacher {
        let scope = load_teacher_scope(db, auth_user.user_id).await?;
        return match scope.class_teacher_of {
            Some(c) if c.id == class.id => Ok(()),
            _ => Err(AppError::Forbidden(
                "Only the class teacher can mark attendance for this class".into(),
            )),
        };
    }
    require_campus_admin_of(db, auth_user, class.campus_id).await
}

async fn find_attendance<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<attendance::Model, AppError> {
    attendance::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Attendance",
    operation_id = "markAttendance",
    summary = "Mark attendance for a class",
    description = "Records one status per enrollment for a date. Marking the same enrollment and date again overwrites the status. Requires `attendance:mark`.",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance saved", body = Vec<AttendanceResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(class_id = payload.class_id, date = %payload.date))]
pub async fn mark_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<MarkAttendanceRequest>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    auth_user.require_permission("attendance:mark")?;
    validate_mark_attendance(&payload)?;

    let class = find_class(&state.db, payload.class_id).await?;
    require_attendance_access(&state.db, &auth_user, &class).await?;

    let enrollment_ids: Vec<i32> = payload.records.iter().map(|r| r.enrollment_id).collect();
    let known: Vec<i32> = enrollment::Entity::find()
        .select_only()
        .column(enrollment::Column::Id)
        .filter(enrollment::Column::ClassId.eq(class.id))
        .filter(enrollment::Column::IsActive.eq(true))
        .filter(enrollment::Column::Id.is_in(enrollment_ids.clone()))
        .into_tuple()
        .all(&state.db)
        .await?;
    if known.len() != enrollment_ids.len() {
        let mut unknown: Vec<i32> = enrollment_ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect();
        unknown.sort_unstable();
        return Err(AppError::Validation(format!(
            "Enrollments not active in this class: {unknown:?}"
        )));
    }

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    for record in &payload.records {
        let row = attendance::ActiveModel {
            enrollment_id: Set(record.enrollment_id),
            class_id: Set(class.id),
            campus_id: Set(class.campus_id),
            status: Set(record.status),
            date: Set(payload.date),
            marked_by: Set(Some(auth_user.user_id)),
            created_at: Set(now),
            ..Default::default()
        };
        attendance::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([attendance::Column::EnrollmentId, attendance::Column::Date])
                    .update_columns([attendance::Column::Status, attendance::Column::MarkedBy])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }
    let saved = attendance::Entity::find()
        .filter(attendance::Column::Date.eq(payload.date))
        .filter(attendance::Column::EnrollmentId.is_in(enrollment_ids))
        .order_by_asc(attendance::Column::EnrollmentId)
        .all(&txn)
        .await?;
    txn.commit().await?;

    info!(count = saved.len(), "Attendance marked");
    Ok(Json(saved.into_iter().map(AttendanceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Attendance",
    operation_id = "listAttendance",
    summary = "List attendance records",
    description = "Class teachers see their class; admins see their campus (super-admins: any). Newest dates first.",
    params(AttendanceListQuery),
    responses(
        (status = 200, description = "List of attendance records", body = AttendanceListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AttendanceListQuery>,
) -> Result<Json<AttendanceListResponse>, AppError> {
    auth_user.require_any_permission(&["attendance:mark", "attendance:manage"])?;
    validate_attendance_range(&query)?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = attendance::Entity::find();
    if auth_user.role == Role::Teacher {
        let class = load_teacher_scope(&state.db, auth_user.user_id)
            .await?
            .class_teacher_of
            .ok_or_else(|| AppError::Forbidden("Only class teachers can view attendance".into()))?;
        select = select.filter(attendance::Column::ClassId.eq(class.id));
    } else if let Some(campus_id) =
        admin_campus_filter(&state.db, &auth_user, query.campus_id).await?
    {
        select = select.filter(attendance::Column::CampusId.eq(campus_id));
    }
    if let Some(class_id) = query.class_id {
        select = select.filter(attendance::Column::ClassId.eq(class_id));
    }
    if let Some(enrollment_id) = query.enrollment_id {
        select = select.filter(attendance::Column::EnrollmentId.eq(enrollment_id));
    }
    if let Some(status) = query.status {
        select = select.filter(attendance::Column::Status.eq(status));
    }
    if let Some(from) = query.from {
        select = select.filter(attendance::Column::Date.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(attendance::Column::Date.lte(to));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(attendance::Column::Date)
        .order_by_asc(attendance::Column::EnrollmentId)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(AttendanceResponse::from)
        .collect();

    Ok(Json(AttendanceListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Attendance",
    operation_id = "updateAttendance",
    summary = "Correct an attendance record",
    description = "Requires `attendance:manage`.",
    params(("id" = i32, Path, description = "Attendance record ID")),
    request_body = UpdateAttendanceRequest,
    responses(
        (status = 200, description = "Attendance updated", body = AttendanceResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Attendance record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceResponse>, AppError> {
    auth_user.require_permission("attendance:manage")?;

    let existing = find_attendance(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    let mut active: attendance::ActiveModel = existing.into();
    active.status = Set(payload.status);
    active.marked_by = Set(Some(auth_user.user_id));
    let model = active.update(&state.db).await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Attendance",
    operation_id = "deleteAttendance",
    summary = "Delete an attendance record",
    description = "Requires `attendance:manage`.",
    params(("id" = i32, Path, description = "Attendance record ID")),
    responses(
        (status = 204, description = "Attendance record deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Attendance record not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("attendance:manage")?;

    let existing = find_attendance(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    attendance::Entity::delete_by_id(id).exec(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

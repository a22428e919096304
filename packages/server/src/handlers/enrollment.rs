use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{enrollment, user};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::enrollment::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;
use crate::utils::scope::{
    admin_campus_filter, find_class, find_user, load_teacher_scope, require_campus_admin_of,
};

const ALREADY_ENROLLED: &str = "Student is already enrolled in this class";

async fn find_enrollment<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<enrollment::Model, AppError> {
    enrollment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Enrollment not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Enrollments",
    operation_id = "createEnrollment",
    summary = "Enroll a student in a class",
    description = "The student must be an active student of the class's campus. Requires `enrollment:manage`.",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Student enrolled", body = EnrollmentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class or student not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already enrolled (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = payload.student_id, class_id = payload.class_id))]
pub async fn create_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("enrollment:manage")?;
    validate_create_enrollment(&payload)?;

    let class = find_class(&state.db, payload.class_id).await?;
    require_campus_admin_of(&state.db, &auth_user, class.campus_id).await?;
    if !class.is_active {
        return Err(AppError::Validation("Class is deactivated".into()));
    }

    let student = find_user(&state.db, payload.student_id).await?;
    if student.role != Role::Student
        || !student.is_active
        || student.campus_id != Some(class.campus_id)
    {
        return Err(AppError::Validation(
            "student_id must reference an active student of this campus".into(),
        ));
    }

    let model = enrollment::ActiveModel {
        student_id: Set(student.id),
        campus_id: Set(class.campus_id),
        class_id: Set(class.id),
        roll_number: Set(payload.roll_number.trim().to_string()),
        academic_session: Set(payload.academic_session.trim().to_string()),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| conflict_on_unique(e, ALREADY_ENROLLED))?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollmentResponse::from_parts(model, Some(student.name))),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Enrollments",
    operation_id = "listEnrollments",
    summary = "List enrollments",
    description = "Admins see their campus (super-admins: any); teachers see the classes they teach.",
    params(EnrollmentListQuery),
    responses(
        (status = 200, description = "List of enrollments", body = EnrollmentListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_enrollments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<EnrollmentListQuery>,
) -> Result<Json<EnrollmentListResponse>, AppError> {
    auth_user.require_any_permission(&["enrollment:manage", "class:view"])?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = enrollment::Entity::find();
    if auth_user.role == Role::Teacher {
        let scope = load_teacher_scope(&state.db, auth_user.user_id).await?;
        select = select.filter(enrollment::Column::ClassId.is_in(scope.class_ids()));
    } else if let Some(campus_id) =
        admin_campus_filter(&state.db, &auth_user, query.campus_id).await?
    {
        select = select.filter(enrollment::Column::CampusId.eq(campus_id));
    }
    if let Some(class_id) = query.class_id {
        select = select.filter(enrollment::Column::ClassId.eq(class_id));
    }
    if let Some(ref session) = query.academic_session {
        select = select.filter(enrollment::Column::AcademicSession.eq(session.trim()));
    }
    if !query.include_inactive.unwrap_or(false) {
        select = select.filter(enrollment::Column::IsActive.eq(true));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let rows = select
        .order_by_asc(enrollment::Column::ClassId)
        .order_by_asc(enrollment::Column::RollNumber)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .map(|(e, student)| EnrollmentResponse::from_parts(e, student.map(|s| s.name)))
        .collect();

    Ok(Json(EnrollmentListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Enrollments",
    operation_id = "updateEnrollment",
    summary = "Update an enrollment",
    description = "Changes the roll number or (de)activates the enrollment. Requires `enrollment:manage`.",
    params(("id" = i32, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentRequest,
    responses(
        (status = 200, description = "Enrollment updated", body = EnrollmentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateEnrollmentRequest>,
) -> Result<Json<EnrollmentResponse>, AppError> {
    auth_user.require_permission("enrollment:manage")?;
    validate_update_enrollment(&payload)?;

    let existing = find_enrollment(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    if payload == UpdateEnrollmentRequest::default() {
        return Ok(Json(EnrollmentResponse::from_parts(existing, None)));
    }

    let mut active: enrollment::ActiveModel = existing.into();
    if let Some(ref roll) = payload.roll_number {
        active.roll_number = Set(roll.trim().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let model = active.update(&state.db).await?;

    Ok(Json(EnrollmentResponse::from_parts(model, None)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Enrollments",
    operation_id = "deactivateEnrollment",
    summary = "Deactivate an enrollment",
    description = "Scores, attendance and marksheets are kept. Requires `enrollment:manage`.",
    params(("id" = i32, Path, description = "Enrollment ID")),
    responses(
        (status = 204, description = "Enrollment deactivated"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Enrollment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn deactivate_enrollment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("enrollment:manage")?;

    let existing = find_enrollment(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    let mut active: enrollment::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

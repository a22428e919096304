use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{class_subject, teacher_assignment};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::assignment::*;
use crate::state::AppState;
use crate::utils::scope::{admin_campus_filter, find_class, find_user, require_campus_admin_of};

#[utoipa::path(
    post,
    path = "/",
    tag = "Teacher Assignments",
    operation_id = "createAssignment",
    summary = "Assign a teacher to a class subject",
    description = "Grants a teacher grading rights for one (campus, class, subject). The subject must be in the class curriculum. Requires `assignment:manage`.",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 201, description = "Assignment created", body = AssignmentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class or teacher not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Assignment already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(teacher_id = payload.teacher_id, class_id = payload.class_id))]
pub async fn create_assignment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("assignment:manage")?;

    let class = find_class(&state.db, payload.class_id).await?;
    require_campus_admin_of(&state.db, &auth_user, class.campus_id).await?;

    let teacher = find_user(&state.db, payload.teacher_id).await?;
    if teacher.role != Role::Teacher
        || !teacher.is_active
        || teacher.campus_id != Some(class.campus_id)
    {
        return Err(AppError::Validation(
            "teacher_id must reference an active teacher of this campus".into(),
        ));
    }

    let in_curriculum = class_subject::Entity::find_by_id((class.id, payload.subject_id))
        .one(&state.db)
        .await?
        .is_some();
    if !in_curriculum {
        return Err(AppError::Validation(
            "Subject is not part of this class curriculum".into(),
        ));
    }

    let model = teacher_assignment::ActiveModel {
        teacher_id: Set(teacher.id),
        campus_id: Set(class.campus_id),
        class_id: Set(class.id),
        subject_id: Set(payload.subject_id),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| conflict_on_unique(e, "Teacher is already assigned to this class subject"))?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Teacher Assignments",
    operation_id = "listAssignments",
    summary = "List teacher assignments",
    description = "Admins see their campus (super-admins: any). Teachers see their own assignments.",
    params(AssignmentListQuery),
    responses(
        (status = 200, description = "Assignments", body = Vec<AssignmentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_assignments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AssignmentListQuery>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let mut select = teacher_assignment::Entity::find();
    if auth_user.role == Role::Teacher {
        select = select.filter(teacher_assignment::Column::TeacherId.eq(auth_user.user_id));
    } else {
        auth_user.require_permission("assignment:manage")?;
        if let Some(campus_id) = admin_campus_filter(&state.db, &auth_user, query.campus_id).await?
        {
            select = select.filter(teacher_assignment::Column::CampusId.eq(campus_id));
        }
        if let Some(teacher_id) = query.teacher_id {
            select = select.filter(teacher_assignment::Column::TeacherId.eq(teacher_id));
        }
    }
    if let Some(class_id) = query.class_id {
        select = select.filter(teacher_assignment::Column::ClassId.eq(class_id));
    }
    if !query.include_inactive.unwrap_or(false) {
        select = select.filter(teacher_assignment::Column::IsActive.eq(true));
    }

    let data = select
        .order_by_asc(teacher_assignment::Column::ClassId)
        .order_by_asc(teacher_assignment::Column::SubjectId)
        .all(&state.db)
        .await?
        .into_iter()
        .map(AssignmentResponse::from)
        .collect();
    Ok(Json(data))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Teacher Assignments",
    operation_id = "deactivateAssignment",
    summary = "Deactivate a teacher assignment",
    description = "Revokes grading rights. Existing scores are kept. Requires `assignment:manage`.",
    params(("id" = i32, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deactivated"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Assignment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn deactivate_assignment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("assignment:manage")?;

    let existing = teacher_assignment::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    let mut active: teacher_assignment::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{class_subject, exam, subject};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::subject::*;
use crate::state::AppState;
use crate::utils::scope::find_subject;

const CODE_TAKEN: &str = "A subject with this code already exists";

#[utoipa::path(
    post,
    path = "/",
    tag = "Subjects",
    operation_id = "createSubject",
    summary = "Create a subject",
    description = "Requires `subject:manage`.",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Code already used (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code))]
pub async fn create_subject(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("subject:manage")?;
    validate_create_subject(&payload)?;

    let model = subject::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        code: Set(payload.code.trim().to_uppercase()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| conflict_on_unique(e, CODE_TAKEN))?;

    Ok((StatusCode::CREATED, Json(SubjectResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Subjects",
    operation_id = "listSubjects",
    summary = "List subjects",
    responses(
        (status = 200, description = "All subjects ordered by name", body = Vec<SubjectResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_subjects(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SubjectResponse>>, AppError> {
    let data = subject::Entity::find()
        .order_by_asc(subject::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(SubjectResponse::from)
        .collect();
    Ok(Json(data))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Subjects",
    operation_id = "getSubject",
    summary = "Get a subject",
    params(("id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 200, description = "Subject", body = SubjectResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Subject not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_subject(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubjectResponse>, AppError> {
    Ok(Json(find_subject(&state.db, id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Subjects",
    operation_id = "updateSubject",
    summary = "Update a subject",
    description = "Requires `subject:manage`. Renaming a subject does not rewrite marksheets already generated.",
    params(("id" = i32, Path, description = "Subject ID")),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = SubjectResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Subject not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code already used (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_subject(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateSubjectRequest>,
) -> Result<Json<SubjectResponse>, AppError> {
    auth_user.require_permission("subject:manage")?;
    validate_update_subject(&payload)?;

    let existing = find_subject(&state.db, id).await?;
    if payload == UpdateSubjectRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: subject::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref code) = payload.code {
        active.code = Set(code.trim().to_uppercase());
    }

    let model = active
        .update(&state.db)
        .await
        .map_err(|e| conflict_on_unique(e, CODE_TAKEN))?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Subjects",
    operation_id = "deleteSubject",
    summary = "Delete a subject",
    description = "Requires `subject:manage`. Subjects still in a class curriculum or with exams cannot be deleted.",
    params(("id" = i32, Path, description = "Subject ID")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Subject not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Subject in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_subject(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("subject:manage")?;

    let txn = state.db.begin().await?;
    find_subject(&txn, id).await?;

    let in_curriculum = class_subject::Entity::find()
        .filter(class_subject::Column::SubjectId.eq(id))
        .count(&txn)
        .await?;
    let exams = exam::Entity::find()
        .filter(exam::Column::SubjectId.eq(id))
        .count(&txn)
        .await?;
    if in_curriculum > 0 || exams > 0 {
        return Err(AppError::Conflict(
            "Subject is used by a class curriculum or an exam".into(),
        ));
    }

    subject::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

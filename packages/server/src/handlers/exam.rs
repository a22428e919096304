use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Role;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{class_subject, exam, score};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::marksheet::{Pipeline, hooks};
use crate::models::exam::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;
use crate::utils::scope::{
    admin_campus_filter, find_class, find_exam, load_teacher_scope, require_campus_admin_of,
};

const DUPLICATE_EXAM: &str =
    "An exam of this type already exists for this class, subject and term";

/// Admins see exams of their campus; teachers see exams of classes they teach.
async fn require_exam_visible<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    exam: &exam::Model,
) -> Result<(), AppError> {
    if auth_user.role == Role::Teacher {
        let scope = load_teacher_scope(db, auth_user.user_id).await?;
        if scope.class_ids().contains(&exam.class_id) {
            return Ok(());
        }
        return Err(AppError::Forbidden(
            "You can only view exams of classes you teach".into(),
        ));
    }
    require_campus_admin_of(db, auth_user, exam.campus_id).await
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Exams",
    operation_id = "createExam",
    summary = "Create an exam",
    description = "Defines one evaluation for a class subject in a term. The campus is taken from the class. Requires `exam:manage`.",
    request_body = CreateExamRequest,
    responses(
        (status = 201, description = "Exam created", body = ExamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Duplicate exam definition (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(class_id = payload.class_id, subject_id = payload.subject_id))]
pub async fn create_exam(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("exam:manage")?;
    validate_create_exam(&payload)?;

    let class = find_class(&state.db, payload.class_id).await?;
    require_campus_admin_of(&state.db, &auth_user, class.campus_id).await?;
    if !class.is_active {
        return Err(AppError::Validation("Class is deactivated".into()));
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

    let model = exam::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        term: Set(payload.term),
        academic_session: Set(payload.academic_session.trim().to_string()),
        class_id: Set(class.id),
        subject_id: Set(payload.subject_id),
        campus_id: Set(class.campus_id),
        total_marks: Set(payload.total_marks),
        exam_type: Set(payload.exam_type.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_EXAM))?;

    Ok((StatusCode::CREATED, Json(ExamResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Exams",
    operation_id = "listExams",
    summary = "List exams",
    description = "Admins see their campus (super-admins: any); teachers see exams of classes they teach.",
    params(ExamListQuery),
    responses(
        (status = 200, description = "List of exams", body = ExamListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_exams(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ExamListQuery>,
) -> Result<Json<ExamListResponse>, AppError> {
    auth_user.require_any_permission(&["exam:manage", "score:write"])?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = exam::Entity::find();
    if auth_user.role == Role::Teacher {
        let scope = load_teacher_scope(&state.db, auth_user.user_id).await?;
        select = select.filter(exam::Column::ClassId.is_in(scope.class_ids()));
    } else if let Some(campus_id) =
        admin_campus_filter(&state.db, &auth_user, query.campus_id).await?
    {
        select = select.filter(exam::Column::CampusId.eq(campus_id));
    }
    if let Some(class_id) = query.class_id {
        select = select.filter(exam::Column::ClassId.eq(class_id));
    }
    if let Some(subject_id) = query.subject_id {
        select = select.filter(exam::Column::SubjectId.eq(subject_id));
    }
    if let Some(term) = query.term {
        select = select.filter(exam::Column::Term.eq(term));
    }
    if let Some(ref session) = query.academic_session {
        select = select.filter(exam::Column::AcademicSession.eq(session.trim()));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(exam::Column::CreatedAt)
        .order_by_desc(exam::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(ExamResponse::from)
        .collect();

    Ok(Json(ExamListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Exams",
    operation_id = "getExam",
    summary = "Get an exam",
    params(("id" = i32, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Exam", body = ExamResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Exam not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_exam(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ExamResponse>, AppError> {
    auth_user.require_any_permission(&["exam:manage", "score:write"])?;
    let exam = find_exam(&state.db, id).await?;
    require_exam_visible(&state.db, &auth_user, &exam).await?;
    Ok(Json(exam.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Exams",
    operation_id = "updateExam",
    summary = "Update an exam",
    description = "Renames an exam or changes its total marks. Lowering `total_marks` below a recorded score is rejected. A total change regenerates the marksheet of every scored student. Requires `exam:manage`.",
    params(("id" = i32, Path, description = "Exam ID")),
    request_body = UpdateExamRequest,
    responses(
        (status = 200, description = "Exam updated", body = ExamResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Exam not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Duplicate exam definition (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_exam(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateExamRequest>,
) -> Result<Json<ExamResponse>, AppError> {
    auth_user.require_permission("exam:manage")?;
    validate_update_exam(&payload)?;

    let existing = find_exam(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    if payload == UpdateExamRequest::default() {
        return Ok(Json(existing.into()));
    }

    let total_changed = payload
        .total_marks
        .is_some_and(|total| total != existing.total_marks);

    if let Some(total) = payload.total_marks
        && total < existing.total_marks
    {
        let highest = score::Entity::find()
            .filter(score::Column::ExamId.eq(id))
            .order_by_desc(score::Column::MarksObtained)
            .one(&state.db)
            .await?;
        if let Some(top) = highest
            && top.marks_obtained > total
        {
            return Err(AppError::Validation(format!(
                "total_marks cannot be lower than a recorded score ({})",
                top.marks_obtained
            )));
        }
    }

    let mut active: exam::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(total) = payload.total_marks {
        active.total_marks = Set(total);
    }
    if let Some(ref exam_type) = payload.exam_type {
        active.exam_type = Set(exam_type.trim().to_string());
    }

    let model = active
        .update(&state.db)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_EXAM))?;

    if total_changed {
        let pipeline = Pipeline::from_state(&state);
        let outcomes = hooks::on_exam_changed(&pipeline, &model).await;
        let regenerated = outcomes.iter().filter(|o| o.marksheet().is_some()).count();
        info!(
            exam_id = model.id,
            students = outcomes.len(),
            regenerated,
            "Exam total changed, marksheets re-derived"
        );
    }

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Exams",
    operation_id = "deleteExam",
    summary = "Delete an exam",
    description = "Only exams without scores can be deleted. Requires `exam:manage`.",
    params(("id" = i32, Path, description = "Exam ID")),
    responses(
        (status = 204, description = "Exam deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Exam not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Exam has scores (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_exam(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("exam:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_exam(&txn, id).await?;
    require_campus_admin_of(&txn, &auth_user, existing.campus_id).await?;

    let scored = score::Entity::find()
        .filter(score::Column::ExamId.eq(id))
        .count(&txn)
        .await?;
    if scored > 0 {
        return Err(AppError::Conflict(
            "Exam has recorded scores and cannot be deleted".into(),
        ));
    }

    exam::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

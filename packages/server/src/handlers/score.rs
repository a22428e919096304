use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::Role;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{enrollment, exam, score, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::marksheet::{Pipeline, PipelineOutcome, hooks};
use crate::models::score::*;
use crate::state::AppState;
use crate::utils::scope::{
    find_exam, load_teacher_scope, require_campus_admin_of, require_grading_access,
};

async fn find_score<C: ConnectionTrait>(db: &C, id: i32) -> Result<score::Model, AppError> {
    score::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Score not found".into()))
}

/// Score sheets are readable by admins of the campus and by anyone teaching
/// the class.
async fn require_exam_readable<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    exam: &exam::Model,
) -> Result<(), AppError> {
    if auth_user.role == Role::Teacher {
        let scope = load_teacher_scope(db, auth_user.user_id).await?;
        return if scope.class_ids().contains(&exam.class_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only view scores of classes you teach".into(),
            ))
        };
    }
    require_campus_admin_of(db, auth_user, exam.campus_id).await
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Scores",
    operation_id = "submitScores",
    summary = "Submit scores for an exam",
    description = "Inserts or updates one score per student for the exam, atomically. Every listed student must be actively enrolled in the exam's class. After the write, each student's marksheet is regenerated when all required subjects of the term are scored. Requires `score:write` and grading access to the exam's class subject.",
    request_body = SubmitScoresRequest,
    responses(
        (status = 200, description = "Scores saved", body = SubmitScoresResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Exam not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(exam_id = payload.exam_id, count = payload.scores.len()))]
pub async fn submit_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitScoresRequest>,
) -> Result<Json<SubmitScoresResponse>, AppError> {
    auth_user.require_permission("score:write")?;

    let exam = find_exam(&state.db, payload.exam_id).await?;
    validate_submit_scores(&payload, exam.total_marks)?;
    require_grading_access(
        &state.db,
        &auth_user,
        exam.campus_id,
        exam.class_id,
        exam.subject_id,
    )
    .await?;

    let student_ids: Vec<i32> = payload.scores.iter().map(|s| s.student_id).collect();
    let enrolled: Vec<i32> = enrollment::Entity::find()
        .select_only()
        .column(enrollment::Column::StudentId)
        .filter(enrollment::Column::ClassId.eq(exam.class_id))
        .filter(enrollment::Column::IsActive.eq(true))
        .filter(enrollment::Column::StudentId.is_in(student_ids.clone()))
        .into_tuple()
        .all(&state.db)
        .await?;
    let mut not_enrolled: Vec<i32> = student_ids
        .iter()
        .copied()
        .filter(|id| !enrolled.contains(id))
        .collect();
    if !not_enrolled.is_empty() {
        not_enrolled.sort_unstable();
        return Err(AppError::Validation(format!(
            "Students not actively enrolled in this class: {not_enrolled:?}"
        )));
    }

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;
    for entry in &payload.scores {
        let row = score::ActiveModel {
            student_id: Set(entry.student_id),
            class_id: Set(exam.class_id),
            subject_id: Set(exam.subject_id),
            campus_id: Set(exam.campus_id),
            exam_id: Set(exam.id),
            marks_obtained: Set(entry.marks_obtained),
            is_present: Set(entry.is_present.unwrap_or(true)),
            remarks: Set(entry.remarks.as_ref().map(|r| r.trim().to_string())),
            entered_by: Set(Some(auth_user.user_id)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        score::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([score::Column::StudentId, score::Column::ExamId])
                    .update_columns([
                        score::Column::MarksObtained,
                        score::Column::IsPresent,
                        score::Column::Remarks,
                        score::Column::EnteredBy,
                        score::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }
    let saved = score::Entity::find()
        .filter(score::Column::ExamId.eq(exam.id))
        .filter(score::Column::StudentId.is_in(student_ids))
        .order_by_asc(score::Column::StudentId)
        .all(&txn)
        .await?;
    txn.commit().await?;

    let pipeline = Pipeline::from_state(&state);
    let mut marksheets_generated = Vec::new();
    for s in &saved {
        let outcome = hooks::on_score_written(&pipeline, s).await;
        if outcome.as_ref().and_then(PipelineOutcome::marksheet).is_some() {
            marksheets_generated.push(s.student_id);
        }
    }

    info!(
        saved = saved.len(),
        marksheets = marksheets_generated.len(),
        "Scores submitted"
    );

    Ok(Json(SubmitScoresResponse {
        exam_id: exam.id,
        saved: saved.into_iter().map(ScoreResponse::from).collect(),
        marksheets_generated,
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Scores",
    operation_id = "listExamScores",
    summary = "Score sheet of an exam",
    description = "Every actively enrolled student of the exam's class, ordered by roll number, merged with their score. Unscored students show 0 marks and a null `score_id`. Requires `score:view`.",
    params(ExamScoresQuery),
    responses(
        (status = 200, description = "Score sheet", body = ExamScoreSheet),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Exam not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(exam_id = query.exam_id))]
pub async fn list_exam_scores(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ExamScoresQuery>,
) -> Result<Json<ExamScoreSheet>, AppError> {
    auth_user.require_permission("score:view")?;

    let exam = find_exam(&state.db, query.exam_id).await?;
    require_exam_readable(&state.db, &auth_user, &exam).await?;

    let enrolled = enrollment::Entity::find()
        .filter(enrollment::Column::ClassId.eq(exam.class_id))
        .filter(enrollment::Column::IsActive.eq(true))
        .order_by_asc(enrollment::Column::RollNumber)
        .find_also_related(user::Entity)
        .all(&state.db)
        .await?;

    let mut scores: HashMap<i32, score::Model> = score::Entity::find()
        .filter(score::Column::ExamId.eq(exam.id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.student_id, s))
        .collect();

    let data = enrolled
        .into_iter()
        .map(|(e, student)| {
            let student_name = student.map(|s| s.name).unwrap_or_default();
            match scores.remove(&e.student_id) {
                Some(s) => ExamScoreRow {
                    student_id: e.student_id,
                    student_name,
                    roll_number: e.roll_number,
                    score_id: Some(s.id),
                    marks_obtained: s.marks_obtained,
                    is_present: s.is_present,
                    remarks: s.remarks,
                },
                None => ExamScoreRow {
                    student_id: e.student_id,
                    student_name,
                    roll_number: e.roll_number,
                    score_id: None,
                    marks_obtained: 0.0,
                    is_present: true,
                    remarks: None,
                },
            }
        })
        .collect();

    Ok(Json(ExamScoreSheet {
        exam_id: exam.id,
        total_marks: exam.total_marks,
        data,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Scores",
    operation_id = "updateScore",
    summary = "Correct a score",
    description = "Partially updates one score and regenerates the student's marksheet when the term is complete. Requires `score:write` and grading access.",
    params(("id" = i32, Path, description = "Score ID")),
    request_body = UpdateScoreRequest,
    responses(
        (status = 200, description = "Score updated", body = ScoreWriteResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Score not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateScoreRequest>,
) -> Result<Json<ScoreWriteResponse>, AppError> {
    auth_user.require_permission("score:write")?;

    let existing = find_score(&state.db, id).await?;
    let exam = find_exam(&state.db, existing.exam_id).await?;
    validate_update_score(&payload, exam.total_marks)?;
    require_grading_access(
        &state.db,
        &auth_user,
        existing.campus_id,
        existing.class_id,
        existing.subject_id,
    )
    .await?;

    if payload == UpdateScoreRequest::default() {
        return Ok(Json(ScoreWriteResponse {
            score: existing.into(),
            marksheet_id: None,
        }));
    }

    let mut active: score::ActiveModel = existing.into();
    if let Some(marks) = payload.marks_obtained {
        active.marks_obtained = Set(marks);
    }
    if let Some(is_present) = payload.is_present {
        active.is_present = Set(is_present);
    }
    if let Some(remarks) = payload.remarks {
        active.remarks = Set(remarks.map(|r| r.trim().to_string()));
    }
    active.entered_by = Set(Some(auth_user.user_id));
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    let pipeline = Pipeline::from_state(&state);
    let outcome = hooks::on_score_written(&pipeline, &model).await;

    Ok(Json(ScoreWriteResponse {
        marksheet_id: outcome
            .as_ref()
            .and_then(PipelineOutcome::marksheet)
            .map(|m| m.id),
        score: model.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Scores",
    operation_id = "deleteScore",
    summary = "Delete a score",
    description = "Removes one score. The student's marksheet is recomputed, or deleted when the term is no longer complete. Requires `score:delete`.",
    params(("id" = i32, Path, description = "Score ID")),
    responses(
        (status = 204, description = "Score deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Score not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_score(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("score:delete")?;

    let existing = find_score(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;
    let exam = find_exam(&state.db, existing.exam_id).await?;

    score::Entity::delete_by_id(id).exec(&state.db).await?;

    let pipeline = Pipeline::from_state(&state);
    let outcome = hooks::on_score_deleted(&pipeline, &existing, &exam).await;
    info!(student_id = existing.student_id, ?outcome, "Score deleted");

    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Path, State};
use common::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::marksheet;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::marksheet::{Pipeline, rank};
use crate::models::marksheet::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;
use crate::utils::scope::{
    admin_campus_filter, find_class, load_teacher_scope, require_campus_admin_of,
};

/// Restriction a marksheet read must apply for the caller's role.
enum Visibility {
    Student(i32),
    Class(i32),
    Campus(Option<i32>),
}

async fn visibility<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    requested_campus: Option<i32>,
) -> Result<Visibility, AppError> {
    auth_user.require_permission("marksheet:view")?;
    match auth_user.role {
        Role::Student => Ok(Visibility::Student(auth_user.user_id)),
        Role::Teacher => {
            let scope = load_teacher_scope(db, auth_user.user_id).await?;
            let class = scope.class_teacher_of.ok_or_else(|| {
                AppError::Forbidden("Only class teachers can view marksheets".into())
            })?;
            Ok(Visibility::Class(class.id))
        }
        Role::SuperAdmin | Role::CampusAdmin => Ok(Visibility::Campus(
            admin_campus_filter(db, auth_user, requested_campus).await?,
        )),
    }
}

impl Visibility {
    fn apply(&self, select: Select<marksheet::Entity>) -> Select<marksheet::Entity> {
        match *self {
            Visibility::Student(id) => select.filter(marksheet::Column::StudentId.eq(id)),
            Visibility::Class(id) => select.filter(marksheet::Column::ClassId.eq(id)),
            Visibility::Campus(Some(id)) => select.filter(marksheet::Column::CampusId.eq(id)),
            Visibility::Campus(None) => select,
        }
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Marksheets",
    operation_id = "listMarksheets",
    summary = "List marksheets",
    description = "Students see their own marksheets, class teachers their class, campus-admins their campus and super-admins any campus. Ordered by overall percentage, best first. Requires `marksheet:view`.",
    params(MarksheetListQuery),
    responses(
        (status = 200, description = "List of marksheets", body = MarksheetListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_marksheets(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MarksheetListQuery>,
) -> Result<Json<MarksheetListResponse>, AppError> {
    let scope = visibility(&state.db, &auth_user, query.campus_id).await?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = scope.apply(marksheet::Entity::find());
    if let Some(term) = query.term {
        select = select.filter(marksheet::Column::Term.eq(term));
    }
    if let Some(ref session) = query.academic_session {
        select = select.filter(marksheet::Column::AcademicSession.eq(session.trim()));
    }
    if let Some(class_id) = query.class_id {
        select = select.filter(marksheet::Column::ClassId.eq(class_id));
    }
    if let Some(student_id) = query.student_id {
        select = select.filter(marksheet::Column::StudentId.eq(student_id));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_desc(marksheet::Column::OverallPercentage)
        .order_by_asc(marksheet::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(MarksheetResponse::from)
        .collect();

    Ok(Json(MarksheetListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Marksheets",
    operation_id = "getMarksheet",
    summary = "Get a marksheet",
    description = "Same visibility rules as the listing. Marksheets outside the caller's scope are reported as not found.",
    params(("id" = i32, Path, description = "Marksheet ID")),
    responses(
        (status = 200, description = "Marksheet", body = MarksheetResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Marksheet not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_marksheet(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MarksheetResponse>, AppError> {
    let scope = visibility(&state.db, &auth_user, None).await?;
    let model = scope
        .apply(marksheet::Entity::find_by_id(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Marksheet not found".into()))?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/recompute",
    tag = "Marksheets",
    operation_id = "recomputeMarksheet",
    summary = "Re-derive one marksheet",
    description = "Runs the marksheet pipeline for a (student, class, term, session) key from the stored scores. A stale marksheet whose term is no longer complete is deleted. Requires `marksheet:manage`.",
    request_body = RecomputeRequest,
    responses(
        (status = 200, description = "Pipeline outcome", body = RecomputeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = payload.student_id, class_id = payload.class_id))]
pub async fn recompute_marksheet(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RecomputeRequest>,
) -> Result<Json<RecomputeResponse>, AppError> {
    auth_user.require_permission("marksheet:manage")?;
    validate_recompute(&payload)?;

    let class = find_class(&state.db, payload.class_id).await?;
    require_campus_admin_of(&state.db, &auth_user, class.campus_id).await?;

    let outcome = Pipeline::from_state(&state)
        .reevaluate(&payload.key())
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/rank",
    tag = "Marksheets",
    operation_id = "rankMarksheets",
    summary = "Rank a class",
    description = "Assigns competition ranks (1, 2, 2, 4) by overall percentage to every marksheet of a class for one term and session. Ranks are cleared again whenever a marksheet is regenerated. Requires `marksheet:manage`.",
    request_body = RankRequest,
    responses(
        (status = 200, description = "Ranked marksheets", body = RankResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(class_id = payload.class_id))]
pub async fn rank_marksheets(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    auth_user.require_permission("marksheet:manage")?;
    validate_rank(&payload)?;

    let class = find_class(&state.db, payload.class_id).await?;
    require_campus_admin_of(&state.db, &auth_user, class.campus_id).await?;

    let ranked = rank::rank_class(
        &state.db,
        class.id,
        payload.term,
        payload.academic_session.trim(),
    )
    .await?;

    Ok(Json(RankResponse {
        data: ranked.into_iter().map(MarksheetResponse::from).collect(),
    }))
}

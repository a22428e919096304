use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Role;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{class, class_subject, subject, user};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::class::*;
use crate::models::shared::{Pagination, page_params};
use crate::state::AppState;
use crate::utils::scope::{
    admin_campus_filter, find_campus, find_class, find_user, load_teacher_scope,
    require_campus_admin_of,
};

const CLASS_TAKEN: &str = "This campus already has a class with that grade and section";

/// Curriculum of a class with subject names, in position order.
pub async fn load_class_subjects<C: ConnectionTrait>(
    db: &C,
    class_id: i32,
) -> Result<Vec<ClassSubjectItem>, DbErr> {
    let rows = class_subject::Entity::find()
        .filter(class_subject::Column::ClassId.eq(class_id))
        .order_by_asc(class_subject::Column::Position)
        .find_also_related(subject::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(link, subject)| {
            subject.map(|s| ClassSubjectItem {
                subject_id: link.subject_id,
                name: s.name,
                code: s.code,
                position: link.position,
            })
        })
        .collect())
}

/// Replace a class curriculum with `subject_ids`, positions following list order.
async fn replace_curriculum<C: ConnectionTrait>(
    db: &C,
    class_id: i32,
    subject_ids: &[i32],
) -> Result<(), AppError> {
    let found = subject::Entity::find()
        .filter(subject::Column::Id.is_in(subject_ids.iter().copied()))
        .count(db)
        .await?;
    if found != subject_ids.len() as u64 {
        return Err(AppError::Validation(
            "subject_ids contains an unknown subject".into(),
        ));
    }

    class_subject::Entity::delete_many()
        .filter(class_subject::Column::ClassId.eq(class_id))
        .exec(db)
        .await?;

    let rows = subject_ids
        .iter()
        .enumerate()
        .map(|(position, &subject_id)| class_subject::ActiveModel {
            class_id: Set(class_id),
            subject_id: Set(subject_id),
            position: Set(position as i32),
        });
    class_subject::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// A class teacher must be an active teacher of the same campus who is not
/// already class teacher of another active class.
async fn validate_class_teacher<C: ConnectionTrait>(
    db: &C,
    teacher_id: i32,
    campus_id: i32,
    class_id: Option<i32>,
) -> Result<(), AppError> {
    let teacher: user::Model = find_user(db, teacher_id).await?;
    if teacher.role != Role::Teacher || !teacher.is_active || teacher.campus_id != Some(campus_id)
    {
        return Err(AppError::Validation(
            "class_teacher_id must reference an active teacher of this campus".into(),
        ));
    }
    let mut other = class::Entity::find()
        .filter(class::Column::ClassTeacherId.eq(teacher_id))
        .filter(class::Column::IsActive.eq(true));
    if let Some(id) = class_id {
        other = other.filter(class::Column::Id.ne(id));
    }
    if other.one(db).await?.is_some() {
        return Err(AppError::Conflict(
            "This teacher is already class teacher of another class".into(),
        ));
    }
    Ok(())
}

/// Read access to one class: admins of its campus, and teachers who teach it.
async fn require_class_visible<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    class: &class::Model,
) -> Result<(), AppError> {
    auth_user.require_permission("class:view")?;
    match auth_user.role {
        Role::Teacher => {
            let scope = load_teacher_scope(db, auth_user.user_id).await?;
            if scope.class_ids().contains(&class.id) {
                Ok(())
            } else {
                Err(AppError::Forbidden("You do not teach this class".into()))
            }
        }
        _ => require_campus_admin_of(db, auth_user, class.campus_id).await,
    }
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Classes",
    operation_id = "createClass",
    summary = "Create a class with its curriculum",
    description = "Creates a class and its ordered list of required subjects. Requires `class:manage`; campus-admins may only create classes on their own campus.",
    request_body = CreateClassRequest,
    responses(
        (status = 201, description = "Class created", body = ClassResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Campus not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Duplicate class or busy class teacher (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(campus_id = payload.campus_id))]
pub async fn create_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateClassRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("class:manage")?;
    validate_create_class(&payload)?;
    require_campus_admin_of(&state.db, &auth_user, payload.campus_id).await?;

    let txn = state.db.begin().await?;

    let campus = find_campus(&txn, payload.campus_id).await?;
    if !campus.is_active {
        return Err(AppError::Validation("Campus is deactivated".into()));
    }
    if let Some(teacher_id) = payload.class_teacher_id {
        validate_class_teacher(&txn, teacher_id, campus.id, None).await?;
    }

    let model = class::ActiveModel {
        grade: Set(payload.grade),
        section: Set(payload.section),
        campus_id: Set(campus.id),
        class_teacher_id: Set(payload.class_teacher_id),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| conflict_on_unique(e, CLASS_TAKEN))?;

    replace_curriculum(&txn, model.id, &payload.subject_ids).await?;
    let subjects = load_class_subjects(&txn, model.id).await?;

    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ClassResponse::from_parts(model, subjects)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Classes",
    operation_id = "listClasses",
    summary = "List classes",
    description = "Admins see the classes of their campus (super-admins: any campus). Teachers see the classes they teach. Requires `class:view`.",
    params(ClassListQuery),
    responses(
        (status = 200, description = "List of classes", body = ClassListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_classes(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ClassListQuery>,
) -> Result<Json<ClassListResponse>, AppError> {
    auth_user.require_permission("class:view")?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = class::Entity::find();
    if auth_user.role == Role::Teacher {
        let scope = load_teacher_scope(&state.db, auth_user.user_id).await?;
        select = select.filter(class::Column::Id.is_in(scope.class_ids()));
        if let Some(campus_id) = query.campus_id {
            select = select.filter(class::Column::CampusId.eq(campus_id));
        }
    } else if let Some(campus_id) =
        admin_campus_filter(&state.db, &auth_user, query.campus_id).await?
    {
        select = select.filter(class::Column::CampusId.eq(campus_id));
    }
    if let Some(grade) = query.grade {
        select = select.filter(class::Column::Grade.eq(grade));
    }
    if !query.include_inactive.unwrap_or(false) {
        select = select.filter(class::Column::IsActive.eq(true));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(class::Column::CampusId)
        .order_by_asc(class::Column::Grade)
        .order_by_asc(class::Column::Section)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(ClassListItem::from)
        .collect();

    Ok(Json(ClassListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Classes",
    operation_id = "getClass",
    summary = "Get a class with its curriculum",
    params(("id" = i32, Path, description = "Class ID")),
    responses(
        (status = 200, description = "Class", body = ClassResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ClassResponse>, AppError> {
    let model = find_class(&state.db, id).await?;
    require_class_visible(&state.db, &auth_user, &model).await?;
    let subjects = load_class_subjects(&state.db, id).await?;
    Ok(Json(ClassResponse::from_parts(model, subjects)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Classes",
    operation_id = "updateClass",
    summary = "Update a class",
    description = "Partially updates a class. `subject_ids` replaces the whole curriculum; marksheets already generated are re-derived against the new curriculum on the next score write. Requires `class:manage`.",
    params(("id" = i32, Path, description = "Class ID")),
    request_body = UpdateClassRequest,
    responses(
        (status = 200, description = "Class updated", body = ClassResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Duplicate class or busy class teacher (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateClassRequest>,
) -> Result<Json<ClassResponse>, AppError> {
    auth_user.require_permission("class:manage")?;
    validate_update_class(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_class(&txn, id).await?;
    require_campus_admin_of(&txn, &auth_user, existing.campus_id).await?;

    if let Some(Some(teacher_id)) = payload.class_teacher_id {
        validate_class_teacher(&txn, teacher_id, existing.campus_id, Some(id)).await?;
    }

    let mut active: class::ActiveModel = existing.clone().into();
    if let Some(grade) = payload.grade {
        active.grade = Set(grade);
    }
    if let Some(section) = payload.section {
        active.section = Set(section);
    }
    if let Some(teacher_id) = payload.class_teacher_id {
        active.class_teacher_id = Set(teacher_id);
    }
    let model = if active.is_changed() {
        active
            .update(&txn)
            .await
            .map_err(|e| conflict_on_unique(e, CLASS_TAKEN))?
    } else {
        existing
    };

    if let Some(ref subject_ids) = payload.subject_ids {
        replace_curriculum(&txn, id, subject_ids).await?;
    }
    let subjects = load_class_subjects(&txn, id).await?;

    txn.commit().await?;
    Ok(Json(ClassResponse::from_parts(model, subjects)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Classes",
    operation_id = "deactivateClass",
    summary = "Deactivate a class",
    description = "Soft-deletes a class. Scores and marksheets are kept. Requires `class:manage`.",
    params(("id" = i32, Path, description = "Class ID")),
    responses(
        (status = 204, description = "Class deactivated"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn deactivate_class(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("class:manage")?;

    let existing = find_class(&state.db, id).await?;
    require_campus_admin_of(&state.db, &auth_user, existing.campus_id).await?;

    let mut active: class::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&state.db).await?;

    Ok(StatusCode::NO_CONTENT)
}

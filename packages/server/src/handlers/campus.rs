use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::Role;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{campus, class, user};
use crate::error::{AppError, ErrorBody, conflict_on_unique};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::campus::*;
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::state::AppState;
use crate::utils::scope::{admin_campus_filter, find_campus, find_user};

const CODE_TAKEN: &str = "An active campus with this code already exists";

/// Check `admin_id` names an active campus-admin not already managing another
/// active campus.
async fn validate_campus_admin<C: ConnectionTrait>(
    db: &C,
    admin_id: i32,
    campus_id: Option<i32>,
) -> Result<user::Model, AppError> {
    let admin = find_user(db, admin_id).await?;
    if admin.role != Role::CampusAdmin || !admin.is_active {
        return Err(AppError::Validation(
            "admin_id must reference an active campus-admin".into(),
        ));
    }
    let mut other = campus::Entity::find()
        .filter(campus::Column::AdminId.eq(admin_id))
        .filter(campus::Column::IsActive.eq(true));
    if let Some(id) = campus_id {
        other = other.filter(campus::Column::Id.ne(id));
    }
    if other.one(db).await?.is_some() {
        return Err(AppError::Conflict(
            "This campus-admin already manages another campus".into(),
        ));
    }
    Ok(admin)
}

/// Point the admin's home campus at the campus they now manage.
async fn attach_admin<C: ConnectionTrait>(
    db: &C,
    admin: user::Model,
    campus_id: i32,
) -> Result<(), AppError> {
    if admin.campus_id == Some(campus_id) {
        return Ok(());
    }
    let mut active: user::ActiveModel = admin.into();
    active.campus_id = Set(Some(campus_id));
    active.update(db).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Campuses",
    operation_id = "createCampus",
    summary = "Create a campus",
    description = "Creates a campus, optionally assigning its campus-admin. Requires `campus:manage`.",
    request_body = CreateCampusRequest,
    responses(
        (status = 201, description = "Campus created", body = CampusResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Code taken or admin busy (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code))]
pub async fn create_campus(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCampusRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("campus:manage")?;
    validate_create_campus(&payload)?;

    let txn = state.db.begin().await?;

    let admin = match payload.admin_id {
        Some(admin_id) => Some(validate_campus_admin(&txn, admin_id, None).await?),
        None => None,
    };

    let model = campus::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        code: Set(payload.code.trim().to_uppercase()),
        address: Set(payload.address.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        phone: Set(payload.phone.trim().to_string()),
        email: Set(payload.email.trim().to_lowercase()),
        admin_id: Set(payload.admin_id),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| conflict_on_unique(e, CODE_TAKEN))?;

    if let Some(admin) = admin {
        attach_admin(&txn, admin, model.id).await?;
    }

    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(CampusResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Campuses",
    operation_id = "listCampuses",
    summary = "List campuses",
    description = "Super-admins see every campus; campus-admins only their own.",
    params(CampusListQuery),
    responses(
        (status = 200, description = "List of campuses", body = CampusListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_campuses(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CampusListQuery>,
) -> Result<Json<CampusListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = campus::Entity::find();
    if let Some(id) = admin_campus_filter(&state.db, &auth_user, None).await? {
        select = select.filter(campus::Column::Id.eq(id));
    }
    if !query.include_inactive.unwrap_or(false) {
        select = select.filter(campus::Column::IsActive.eq(true));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let like = |col: campus::Column| {
                Expr::expr(Func::lower(Expr::col(col)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            select = select.filter(
                Condition::any()
                    .add(like(campus::Column::Name))
                    .add(like(campus::Column::Code))
                    .add(like(campus::Column::City)),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(campus::Column::Name)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(CampusResponse::from)
        .collect();

    Ok(Json(CampusListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Campuses",
    operation_id = "getCampus",
    summary = "Get a campus",
    params(("id" = i32, Path, description = "Campus ID")),
    responses(
        (status = 200, description = "Campus", body = CampusResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Campus not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_campus(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CampusResponse>, AppError> {
    admin_campus_filter(&state.db, &auth_user, Some(id)).await?;
    let model = find_campus(&state.db, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Campuses",
    operation_id = "updateCampus",
    summary = "Update a campus",
    description = "Partially updates a campus. Requires `campus:manage`.",
    params(("id" = i32, Path, description = "Campus ID")),
    request_body = UpdateCampusRequest,
    responses(
        (status = 200, description = "Campus updated", body = CampusResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Campus not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code taken or admin busy (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_campus(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCampusRequest>,
) -> Result<Json<CampusResponse>, AppError> {
    auth_user.require_permission("campus:manage")?;
    validate_update_campus(&payload)?;

    let txn = state.db.begin().await?;
    let existing = find_campus(&txn, id).await?;

    if payload == UpdateCampusRequest::default() {
        return Ok(Json(existing.into()));
    }

    let admin = match payload.admin_id {
        Some(Some(admin_id)) => Some(validate_campus_admin(&txn, admin_id, Some(id)).await?),
        _ => None,
    };

    let mut active: campus::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(ref code) = payload.code {
        active.code = Set(code.trim().to_uppercase());
    }
    if let Some(ref address) = payload.address {
        active.address = Set(address.trim().to_string());
    }
    if let Some(ref city) = payload.city {
        active.city = Set(city.trim().to_string());
    }
    if let Some(ref phone) = payload.phone {
        active.phone = Set(phone.trim().to_string());
    }
    if let Some(ref email) = payload.email {
        active.email = Set(email.trim().to_lowercase());
    }
    if let Some(admin_id) = payload.admin_id {
        active.admin_id = Set(admin_id);
    }

    let model = active
        .update(&txn)
        .await
        .map_err(|e| conflict_on_unique(e, CODE_TAKEN))?;

    if let Some(admin) = admin {
        attach_admin(&txn, admin, model.id).await?;
    }

    txn.commit().await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Campuses",
    operation_id = "deactivateCampus",
    summary = "Deactivate a campus",
    description = "Soft-deletes a campus. Its classes and its teacher and student accounts are deactivated with it, and its code becomes reusable. Requires `campus:manage`.",
    params(("id" = i32, Path, description = "Campus ID")),
    responses(
        (status = 204, description = "Campus deactivated"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Campus not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn deactivate_campus(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("campus:manage")?;

    let txn = state.db.begin().await?;
    let existing = find_campus(&txn, id).await?;

    let mut active: campus::ActiveModel = existing.into();
    active.is_active = Set(false);
    active.update(&txn).await?;

    let classes = class::Entity::update_many()
        .col_expr(class::Column::IsActive, Expr::value(false))
        .filter(class::Column::CampusId.eq(id))
        .exec(&txn)
        .await?;

    let users = user::Entity::update_many()
        .col_expr(user::Column::IsActive, Expr::value(false))
        .filter(user::Column::CampusId.eq(id))
        .filter(user::Column::Role.is_in([Role::Teacher, Role::Student]))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    info!(
        classes = classes.rows_affected,
        users = users.rows_affected,
        "Campus deactivated"
    );
    Ok(StatusCode::NO_CONTENT)
}

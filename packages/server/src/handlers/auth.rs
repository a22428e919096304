use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::Role;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{role_permission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::auth::{
    CreateUserRequest, LoginRequest, LoginResponse, MeResponse, UpdateUserRequest,
    UserListQuery, UserListResponse, UserResponse, validate_create_user, validate_login_request,
    validate_update_user,
};
use crate::models::shared::{Pagination, escape_like, page_params};
use crate::state::AppState;
use crate::utils::scope::{admin_campus_filter, find_admin_campus, find_campus, find_user};
use crate::utils::{hash, jwt};

/// Permission strings granted to a role.
pub async fn permissions_for<C: ConnectionTrait>(db: &C, role: Role) -> Result<Vec<String>, DbErr> {
    let role_perms = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(role.as_str()))
        .all(db)
        .await?;
    Ok(role_perms.into_iter().map(|rp| rp.permission).collect())
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in with email and password",
    description = "Returns a JWT bearer token together with the user's profile and the permissions of their role. Deactivated accounts cannot log in.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Invalid credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let email = payload.email.trim().to_lowercase();

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid || !user.is_active {
        return Err(AppError::InvalidCredentials);
    }

    let permissions = permissions_for(&state.db, user.role).await?;

    let token = jwt::sign(
        user.id,
        &user.email,
        user.role.as_str(),
        permissions.clone(),
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_days,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "getCurrentUser",
    summary = "Get the authenticated user",
    description = "Returns the identity and permissions carried by the bearer token.",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(auth_user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth_user.user_id,
        email: auth_user.email,
        role: auth_user.role,
        permissions: auth_user.permissions,
    })
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Auth",
    operation_id = "createUser",
    summary = "Create an account",
    description = "Super-admins create campus-admins, teachers and students. Campus-admins create teachers and students on their own campus. Requires `user:manage`.",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Campus not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(email = %payload.email, role = %payload.role))]
pub async fn create_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("user:manage")?;
    validate_create_user(&payload)?;

    if !auth_user.role.can_create(payload.role) {
        return Err(AppError::Forbidden(format!(
            "A {} cannot create {} accounts",
            auth_user.role, payload.role
        )));
    }

    let campus_id = match auth_user.role {
        Role::CampusAdmin => {
            let own = find_admin_campus(&state.db, auth_user.user_id).await?;
            if payload.campus_id.is_some_and(|id| id != own.id) {
                return Err(AppError::Forbidden(
                    "You can only create users for your own campus".into(),
                ));
            }
            Some(own.id)
        }
        _ => match payload.campus_id {
            Some(id) => Some(find_campus(&state.db, id).await?.id),
            None if payload.role == Role::CampusAdmin => None,
            None => {
                return Err(AppError::Validation(
                    "campus_id is required for teachers and students".into(),
                ));
            }
        },
    };

    let password_hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let new_user = user::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        email: Set(payload.email.trim().to_lowercase()),
        password: Set(password_hash),
        role: Set(payload.role),
        campus_id: Set(campus_id),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Unique constraint caught on user insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Auth",
    operation_id = "listUsers",
    summary = "List accounts",
    description = "Paginated account listing filtered by role, campus and a name/email search. Campus-admins only see their own campus. Requires `user:manage`.",
    params(UserListQuery),
    responses(
        (status = 200, description = "List of users", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission("user:manage")?;
    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = user::Entity::find();

    if let Some(campus_id) = admin_campus_filter(&state.db, &auth_user, query.campus_id).await? {
        select = select.filter(user::Column::CampusId.eq(campus_id));
    }
    if let Some(role) = query.role {
        select = select.filter(user::Column::Role.eq(role));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Name)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::col(user::Column::Email)
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;

    let data = select
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Auth",
    operation_id = "updateUser",
    summary = "Rename or (de)activate an account",
    description = "Campus-admins may only update teachers and students of their own campus. Requires `user:manage`.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    auth_user.require_permission("user:manage")?;
    validate_update_user(&payload)?;

    let existing = find_user(&state.db, id).await?;

    if !auth_user.role.can_create(existing.role) {
        return Err(AppError::Forbidden(format!(
            "A {} cannot manage {} accounts",
            auth_user.role, existing.role
        )));
    }
    if auth_user.role == Role::CampusAdmin {
        let own = find_admin_campus(&state.db, auth_user.user_id).await?;
        if existing.campus_id != Some(own.id) {
            return Err(AppError::Forbidden(
                "You can only manage users of your own campus".into(),
            ));
        }
    }

    if payload == UpdateUserRequest::default() {
        return Ok(Json(existing.into()));
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

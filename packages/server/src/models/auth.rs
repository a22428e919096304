use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, validate_email, validate_text};
use crate::error::AppError;

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Account email (case-insensitive).
    #[schema(example = "principal@greenfield.edu.pk")]
    pub email: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.email.trim().is_empty() {
        return Err(AppError::Validation("Email must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    pub user: UserResponse,
    /// Permissions granted to the user's role.
    #[schema(example = json!(["marksheet:view"]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "principal@greenfield.edu.pk")]
    pub email: String,
    pub role: Role,
    #[schema(example = json!(["marksheet:view"]))]
    pub permissions: Vec<String>,
}

/// Request body for creating an account.
///
/// Super-admins create campus-admins; campus-admins create teachers and
/// students for their own campus.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "Ayesha Khan")]
    pub name: String,
    #[schema(example = "ayesha@greenfield.edu.pk")]
    pub email: String,
    /// Password (8-128 characters).
    pub password: String,
    pub role: Role,
    /// Home campus. Ignored for campus-admins creating users (their own
    /// campus is used); required when a super-admin creates a non-admin.
    pub campus_id: Option<i32>,
}

pub fn validate_create_user(payload: &CreateUserRequest) -> Result<(), AppError> {
    validate_text("Name", &payload.name, 100)?;
    validate_email(&payload.email)?;
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    if payload.role == Role::SuperAdmin {
        return Err(AppError::Validation(
            "Super-admin accounts cannot be created through the API".into(),
        ));
    }
    Ok(())
}

/// Partial update of an account.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

pub fn validate_update_user(payload: &UpdateUserRequest) -> Result<(), AppError> {
    if let Some(ref name) = payload.name {
        validate_text("Name", name, 100)?;
    }
    Ok(())
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub role: Option<Role>,
    pub campus_id: Option<i32>,
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub campus_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::user::Model> for UserResponse {
    fn from(m: crate::entity::user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            role: m.role,
            campus_id: m.campus_id,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, double_option, validate_email, validate_text};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCampusRequest {
    #[schema(example = "Greenfield North")]
    pub name: String,
    /// Short code, unique among active campuses.
    #[schema(example = "GF-N")]
    pub code: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    /// Campus-admin who manages this campus.
    pub admin_id: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCampusRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// `null` unassigns the current admin.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub admin_id: Option<Option<i32>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CampusListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive match on name, code or city.
    pub search: Option<String>,
    /// Include deactivated campuses. Default: false.
    pub include_inactive: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CampusResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: String,
    pub admin_id: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::campus::Model> for CampusResponse {
    fn from(m: crate::entity::campus::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            code: m.code,
            address: m.address,
            city: m.city,
            phone: m.phone,
            email: m.email,
            admin_id: m.admin_id,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CampusListResponse {
    pub data: Vec<CampusResponse>,
    pub pagination: Pagination,
}

fn validate_code(code: &str) -> Result<(), AppError> {
    validate_text("Code", code, 20)?;
    if !code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Code must contain only letters, digits, '-' and '_'".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_campus(req: &CreateCampusRequest) -> Result<(), AppError> {
    validate_text("Name", &req.name, 128)?;
    validate_code(&req.code)?;
    validate_text("Address", &req.address, 256)?;
    validate_text("City", &req.city, 64)?;
    validate_text("Phone", &req.phone, 32)?;
    validate_email(&req.email)
}

pub fn validate_update_campus(req: &UpdateCampusRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_text("Name", name, 128)?;
    }
    if let Some(ref code) = req.code {
        validate_code(code)?;
    }
    if let Some(ref address) = req.address {
        validate_text("Address", address, 256)?;
    }
    if let Some(ref city) = req.city {
        validate_text("City", city, 64)?;
    }
    if let Some(ref phone) = req.phone {
        validate_text("Phone", phone, 32)?;
    }
    if let Some(ref email) = req.email {
        validate_email(email)?;
    }
    Ok(())
}

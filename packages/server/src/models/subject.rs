use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::validate_text;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubjectRequest {
    #[schema(example = "Mathematics")]
    pub name: String,
    /// Globally unique subject code.
    #[schema(example = "MATH")]
    pub code: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateSubjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubjectResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::subject::Model> for SubjectResponse {
    fn from(m: crate::entity::subject::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            code: m.code,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_subject(req: &CreateSubjectRequest) -> Result<(), AppError> {
    validate_text("Name", &req.name, 64)?;
    validate_text("Code", &req.code, 16)
}

pub fn validate_update_subject(req: &UpdateSubjectRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_text("Name", name, 64)?;
    }
    if let Some(ref code) = req.code {
        validate_text("Code", code, 16)?;
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateAssignmentRequest {
    pub teacher_id: i32,
    pub class_id: i32,
    pub subject_id: i32,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignmentListQuery {
    pub campus_id: Option<i32>,
    pub class_id: Option<i32>,
    pub teacher_id: Option<i32>,
    pub include_inactive: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AssignmentResponse {
    pub id: i32,
    pub teacher_id: i32,
    pub campus_id: i32,
    pub class_id: i32,
    pub subject_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::teacher_assignment::Model> for AssignmentResponse {
    fn from(m: crate::entity::teacher_assignment::Model) -> Self {
        Self {
            id: m.id,
            teacher_id: m.teacher_id,
            campus_id: m.campus_id,
            class_id: m.class_id,
            subject_id: m.subject_id,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

use chrono::{DateTime, Utc};
use common::{Grade, Term};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{Pagination, validate_session};
use crate::entity::marksheet::SubjectEntry;
use crate::error::AppError;
use crate::marksheet::{MarksheetKey, PipelineOutcome};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MarksheetListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub term: Option<Term>,
    pub academic_session: Option<String>,
    pub class_id: Option<i32>,
    pub campus_id: Option<i32>,
    pub student_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MarksheetResponse {
    pub id: i32,
    pub student_id: i32,
    pub class_id: i32,
    pub campus_id: i32,
    pub term: Term,
    pub academic_session: String,
    /// One entry per required subject, in curriculum order.
    pub subjects: Vec<SubjectEntry>,
    pub grand_obtained: f64,
    pub grand_total: f64,
    #[schema(example = 70.0)]
    pub overall_percentage: f64,
    pub overall_grade: Grade,
    pub rank: Option<i32>,
    pub final_remarks: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::marksheet::Model> for MarksheetResponse {
    fn from(m: crate::entity::marksheet::Model) -> Self {
        // Rows are only written by the pipeline, so the payload always parses;
        // an unreadable one is shown as empty rather than failing the listing.
        let subjects = serde_json::from_value(m.subjects).unwrap_or_else(|e| {
            tracing::warn!(marksheet_id = m.id, "Unreadable marksheet subjects: {}", e);
            Vec::new()
        });
        Self {
            id: m.id,
            student_id: m.student_id,
            class_id: m.class_id,
            campus_id: m.campus_id,
            term: m.term,
            academic_session: m.academic_session,
            subjects,
            grand_obtained: m.grand_obtained,
            grand_total: m.grand_total,
            overall_percentage: m.overall_percentage,
            overall_grade: m.overall_grade,
            rank: m.rank,
            final_remarks: m.final_remarks,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MarksheetListResponse {
    pub data: Vec<MarksheetResponse>,
    pub pagination: Pagination,
}

/// Identifies one marksheet by its natural key.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RecomputeRequest {
    pub student_id: i32,
    pub class_id: i32,
    pub term: Term,
    #[schema(example = "2025-2026")]
    pub academic_session: String,
}

impl RecomputeRequest {
    pub fn key(&self) -> MarksheetKey {
        MarksheetKey {
            student_id: self.student_id,
            class_id: self.class_id,
            term: self.term,
            academic_session: self.academic_session.trim().to_string(),
        }
    }
}

pub fn validate_recompute(req: &RecomputeRequest) -> Result<(), AppError> {
    validate_session(&req.academic_session)
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecomputeStatus {
    Materialized,
    NotReady,
    Retracted,
    Skipped,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecomputeResponse {
    pub status: RecomputeStatus,
    /// Required subjects that still lack a score (only for `not_ready`).
    pub missing_subject_ids: Vec<i32>,
    pub marksheet: Option<MarksheetResponse>,
}

impl From<PipelineOutcome> for RecomputeResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Materialized(m) => Self {
                status: RecomputeStatus::Materialized,
                missing_subject_ids: Vec::new(),
                marksheet: Some((*m).into()),
            },
            PipelineOutcome::NotReady {
                missing_subject_ids,
            } => Self {
                status: RecomputeStatus::NotReady,
                missing_subject_ids,
                marksheet: None,
            },
            PipelineOutcome::Retracted => Self {
                status: RecomputeStatus::Retracted,
                missing_subject_ids: Vec::new(),
                marksheet: None,
            },
            PipelineOutcome::Skipped => Self {
                status: RecomputeStatus::Skipped,
                missing_subject_ids: Vec::new(),
                marksheet: None,
            },
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RankRequest {
    pub class_id: i32,
    pub term: Term,
    #[schema(example = "2025-2026")]
    pub academic_session: String,
}

pub fn validate_rank(req: &RankRequest) -> Result<(), AppError> {
    validate_session(&req.academic_session)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RankResponse {
    /// Ranked marksheets, best first.
    pub data: Vec<MarksheetResponse>,
}

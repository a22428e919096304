use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::{double_option, has_at_most_two_decimals, validate_bulk_ids};
use crate::error::AppError;

/// Upper bound on rows per bulk submission.
pub const MAX_BULK_SCORES: usize = 200;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ScoreEntry {
    pub student_id: i32,
    #[schema(example = 72.5)]
    pub marks_obtained: f64,
    /// Default: true.
    pub is_present: Option<bool>,
    pub remarks: Option<String>,
}

/// Scores for one exam, inserted or updated per (student, exam).
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitScoresRequest {
    pub exam_id: i32,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateScoreRequest {
    pub marks_obtained: Option<f64>,
    pub is_present: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub remarks: Option<Option<String>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExamScoresQuery {
    pub exam_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ScoreResponse {
    pub id: i32,
    pub student_id: i32,
    pub exam_id: i32,
    pub class_id: i32,
    pub subject_id: i32,
    pub campus_id: i32,
    pub marks_obtained: f64,
    pub is_present: bool,
    pub remarks: Option<String>,
    pub entered_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<crate::entity::score::Model> for ScoreResponse {
    fn from(m: crate::entity::score::Model) -> Self {
        Self {
            id: m.id,
            student_id: m.student_id,
            exam_id: m.exam_id,
            class_id: m.class_id,
            subject_id: m.subject_id,
            campus_id: m.campus_id,
            marks_obtained: m.marks_obtained,
            is_present: m.is_present,
            remarks: m.remarks,
            entered_by: m.entered_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitScoresResponse {
    pub exam_id: i32,
    pub saved: Vec<ScoreResponse>,
    /// Students whose marksheet was (re)generated by this submission.
    pub marksheets_generated: Vec<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ScoreWriteResponse {
    pub score: ScoreResponse,
    /// ID of the marksheet regenerated by this write, if the term is complete.
    pub marksheet_id: Option<i32>,
}

/// One row of an exam's score sheet: every actively enrolled student, with
/// their score when one exists.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ExamScoreRow {
    pub student_id: i32,
    pub student_name: String,
    pub roll_number: String,
    /// `null` when the student has not been scored yet.
    pub score_id: Option<i32>,
    pub marks_obtained: f64,
    pub is_present: bool,
    pub remarks: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExamScoreSheet {
    pub exam_id: i32,
    pub total_marks: f64,
    pub data: Vec<ExamScoreRow>,
}

/// Marks must be finite, within `0..=total_marks` and carry at most two
/// decimals, the precision marksheets are stored at.
pub fn validate_marks(marks: f64, total_marks: f64) -> Result<(), AppError> {
    if !marks.is_finite() || marks < 0.0 || marks > total_marks {
        return Err(AppError::Validation(format!(
            "marks_obtained must be between 0 and {total_marks}"
        )));
    }
    if !has_at_most_two_decimals(marks) {
        return Err(AppError::Validation(
            "marks_obtained must have at most 2 decimal places".into(),
        ));
    }
    Ok(())
}

fn validate_remarks(remarks: Option<&str>) -> Result<(), AppError> {
    if remarks.is_some_and(|r| r.chars().count() > 500) {
        return Err(AppError::Validation(
            "remarks must be at most 500 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_submit_scores(req: &SubmitScoresRequest, total_marks: f64) -> Result<(), AppError> {
    let ids: Vec<i32> = req.scores.iter().map(|s| s.student_id).collect();
    validate_bulk_ids(&ids, "scores", MAX_BULK_SCORES)?;
    for entry in &req.scores {
        validate_marks(entry.marks_obtained, total_marks)?;
        validate_remarks(entry.remarks.as_deref())?;
    }
    Ok(())
}

pub fn validate_update_score(req: &UpdateScoreRequest, total_marks: f64) -> Result<(), AppError> {
    if let Some(marks) = req.marks_obtained {
        validate_marks(marks, total_marks)?;
    }
    if let Some(Some(ref remarks)) = req.remarks {
        validate_remarks(Some(remarks))?;
    }
    Ok(())
}

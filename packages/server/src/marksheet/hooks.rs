//! Entry points invoked after score and exam mutations commit.
//!
//! The triggering write is already durable when these run, so a failing
//! derivation is logged and swallowed. `None` means the pipeline errored for
//! that key; the next score write or an explicit generate call retries it.

use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use tracing::{error, warn};

use crate::entity::{exam, score};

use super::{MarksheetKey, Pipeline, PipelineOutcome};

fn key_for(score: &score::Model, exam: &exam::Model) -> MarksheetKey {
    MarksheetKey {
        student_id: score.student_id,
        class_id: score.class_id,
        term: exam.term,
        academic_session: exam.academic_session.clone(),
    }
}

fn absorb(
    key: &MarksheetKey,
    result: Result<PipelineOutcome, DbErr>,
) -> Option<PipelineOutcome> {
    match result {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            error!(
                student_id = key.student_id,
                class_id = key.class_id,
                term = %key.term,
                academic_session = %key.academic_session,
                error = %err,
                "Marksheet derivation failed"
            );
            None
        }
    }
}

async fn exam_of(pipeline: &Pipeline, score: &score::Model) -> Option<exam::Model> {
    match exam::Entity::find_by_id(score.exam_id)
        .one(pipeline.db())
        .await
    {
        Ok(Some(exam)) => Some(exam),
        Ok(None) => {
            warn!(
                score_id = score.id,
                exam_id = score.exam_id,
                "Score references a missing exam, skipping marksheet"
            );
            None
        }
        Err(err) => {
            error!(
                score_id = score.id,
                exam_id = score.exam_id,
                error = %err,
                "Failed to load exam for marksheet derivation"
            );
            None
        }
    }
}

/// After a score is created or updated.
pub async fn on_score_written(
    pipeline: &Pipeline,
    score: &score::Model,
) -> Option<PipelineOutcome> {
    let exam = exam_of(pipeline, score).await?;
    let key = key_for(score, &exam);
    absorb(&key, pipeline.run(&key).await)
}

/// After a score is deleted. `exam` is the exam the score belonged to, loaded
/// before the delete.
pub async fn on_score_deleted(
    pipeline: &Pipeline,
    score: &score::Model,
    exam: &exam::Model,
) -> Option<PipelineOutcome> {
    let key = key_for(score, exam);
    absorb(&key, pipeline.reevaluate(&key).await)
}

/// After an exam's total marks change: every student with a score on it gets
/// a fresh marksheet. Only successful derivations are returned.
pub async fn on_exam_changed(pipeline: &Pipeline, exam: &exam::Model) -> Vec<PipelineOutcome> {
    let students: Vec<(i32, i32)> = match score::Entity::find()
        .select_only()
        .column(score::Column::StudentId)
        .column(score::Column::ClassId)
        .filter(score::Column::ExamId.eq(exam.id))
        .distinct()
        .into_tuple()
        .all(pipeline.db())
        .await
    {
        Ok(students) => students,
        Err(err) => {
            error!(exam_id = exam.id, error = %err, "Failed to list students for exam");
            return Vec::new();
        }
    };

    let mut outcomes = Vec::with_capacity(students.len());
    for (student_id, class_id) in students {
        let key = MarksheetKey {
            student_id,
            class_id,
            term: exam.term,
            academic_session: exam.academic_session.clone(),
        };
        if let Some(outcome) = absorb(&key, pipeline.run(&key).await) {
            outcomes.push(outcome);
        }
    }
    outcomes
}

//! Derived marksheets.
//!
//! A marksheet for `(student, class, term, academic_session)` exists only once
//! every required subject of the class has at least one score in that term.
//! Every score write re-runs [`Pipeline::run`]; a score delete runs
//! [`Pipeline::reevaluate`], which also retracts marksheets that are no longer
//! complete. Both paths recompute the whole row from the stored scores, so
//! running them any number of times for the same scores yields the same row.

pub mod aggregate;
pub mod completion;
pub mod hooks;
pub mod rank;
pub mod remarks;
pub mod upsert;

use std::sync::Arc;
use std::time::Duration;

use common::Term;
use sea_orm::{DatabaseConnection, DbErr};
use tracing::{debug, info, instrument};

use crate::entity::marksheet;
use crate::state::AppState;

use self::completion::Readiness;
use self::remarks::{RemarkGenerator, RemarkRequest};

/// Natural key of a marksheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MarksheetKey {
    pub student_id: i32,
    pub class_id: i32,
    pub term: Term,
    pub academic_session: String,
}

/// A subject the class curriculum requires, in curriculum order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequiredSubject {
    pub id: i32,
    pub name: String,
}

/// A score joined with the exam it was recorded against.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreRecord {
    pub score_id: i32,
    pub exam_id: i32,
    pub subject_id: i32,
    pub exam_type: String,
    pub marks_obtained: f64,
    pub total_marks: f64,
}

/// What one pipeline invocation did.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Some required subjects still have no score; nothing was written.
    NotReady { missing_subject_ids: Vec<i32> },
    /// The marksheet was created or replaced.
    Materialized(Box<marksheet::Model>),
    /// A previously stored marksheet was deleted because it is no longer complete.
    Retracted,
    /// The triggering record points at rows that no longer exist.
    Skipped,
}

impl PipelineOutcome {
    pub fn marksheet(&self) -> Option<&marksheet::Model> {
        match self {
            PipelineOutcome::Materialized(m) => Some(m),
            _ => None,
        }
    }
}

/// Everything the derivation needs: the store, the remark phrasing strategy
/// and its time budget.
#[derive(Clone)]
pub struct Pipeline {
    db: DatabaseConnection,
    remarks: Arc<dyn RemarkGenerator>,
    remark_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        db: DatabaseConnection,
        remarks: Arc<dyn RemarkGenerator>,
        remark_timeout: Duration,
    ) -> Self {
        Self {
            db,
            remarks,
            remark_timeout,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.remarks.clone(),
            Duration::from_secs(state.config.remarks.timeout_secs),
        )
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Recompute and persist the marksheet for `key` if the term is complete.
    /// An incomplete term is a silent no-op.
    #[instrument(skip(self), fields(student_id = key.student_id, class_id = key.class_id))]
    pub async fn run(&self, key: &MarksheetKey) -> Result<PipelineOutcome, DbErr> {
        match completion::is_ready_for_marksheet(&self.db, key).await? {
            Some(readiness) if readiness.is_ready() => self.materialize(key, readiness).await,
            Some(readiness) => {
                let missing_subject_ids = readiness.missing_subject_ids();
                debug!(?missing_subject_ids, "Waiting for all subjects to be scored");
                Ok(PipelineOutcome::NotReady {
                    missing_subject_ids,
                })
            }
            None => Ok(PipelineOutcome::Skipped),
        }
    }

    /// Like [`Pipeline::run`], but deletes the stored marksheet when the term
    /// is no longer complete. Used after a score is removed.
    #[instrument(skip(self), fields(student_id = key.student_id, class_id = key.class_id))]
    pub async fn reevaluate(&self, key: &MarksheetKey) -> Result<PipelineOutcome, DbErr> {
        match self.run(key).await? {
            PipelineOutcome::NotReady { missing_subject_ids } => {
                if upsert::delete_marksheet(&self.db, key).await? {
                    info!(?missing_subject_ids, "Marksheet retracted, term no longer complete");
                    Ok(PipelineOutcome::Retracted)
                } else {
                    Ok(PipelineOutcome::NotReady {
                        missing_subject_ids,
                    })
                }
            }
            outcome => Ok(outcome),
        }
    }

    async fn materialize(
        &self,
        key: &MarksheetKey,
        readiness: Readiness,
    ) -> Result<PipelineOutcome, DbErr> {
        let result = aggregate::aggregate(&readiness.required, &readiness.scores);

        let request = RemarkRequest::new(&readiness.student_name, &result);
        let final_remarks =
            remarks::synthesize(self.remarks.as_ref(), &request, self.remark_timeout).await;

        let model =
            upsert::upsert_marksheet(&self.db, key, readiness.campus_id, &result, &final_remarks)
                .await?;

        info!(
            marksheet_id = model.id,
            overall_percentage = model.overall_percentage,
            overall_grade = %model.overall_grade,
            "Marksheet generated"
        );
        Ok(PipelineOutcome::Materialized(Box::new(model)))
    }
}

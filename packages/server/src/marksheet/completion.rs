use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use tracing::warn;

use crate::entity::{class, class_subject, exam, score, subject, user};

use super::{MarksheetKey, RequiredSubject, ScoreRecord};

/// The inputs gathered for one key while deciding readiness. When ready, the
/// same rows feed aggregation so both steps see one consistent snapshot.
#[derive(Debug)]
pub struct Readiness {
    pub campus_id: i32,
    pub student_name: String,
    pub required: Vec<RequiredSubject>,
    pub scores: Vec<ScoreRecord>,
}

impl Readiness {
    /// A class without required subjects is never ready.
    pub fn is_ready(&self) -> bool {
        !self.required.is_empty() && self.missing_subject_ids().is_empty()
    }

    pub fn missing_subject_ids(&self) -> Vec<i32> {
        missing_subjects(&self.required, &self.scores)
    }
}

/// Required subjects with no score at all, in curriculum order.
pub fn missing_subjects(required: &[RequiredSubject], scores: &[ScoreRecord]) -> Vec<i32> {
    let scored: HashSet<i32> = scores.iter().map(|s| s.subject_id).collect();
    required
        .iter()
        .filter(|r| !scored.contains(&r.id))
        .map(|r| r.id)
        .collect()
}

/// Load the curriculum and the student's term scores for `key`.
///
/// Returns `None` when the class or the student no longer exists; the caller
/// treats that as "not ready" after the warning logged here.
pub async fn is_ready_for_marksheet<C: ConnectionTrait>(
    db: &C,
    key: &MarksheetKey,
) -> Result<Option<Readiness>, DbErr> {
    let Some(class) = class::Entity::find_by_id(key.class_id).one(db).await? else {
        warn!(class_id = key.class_id, "Marksheet requested for a missing class");
        return Ok(None);
    };
    let Some(student) = user::Entity::find_by_id(key.student_id).one(db).await? else {
        warn!(student_id = key.student_id, "Marksheet requested for a missing student");
        return Ok(None);
    };

    let required = load_required_subjects(db, class.id).await?;

    let rows = score::Entity::find()
        .filter(score::Column::StudentId.eq(key.student_id))
        .filter(score::Column::ClassId.eq(key.class_id))
        .find_also_related(exam::Entity)
        .filter(exam::Column::Term.eq(key.term))
        .filter(exam::Column::AcademicSession.eq(key.academic_session.as_str()))
        .order_by_asc(score::Column::ExamId)
        .all(db)
        .await?;

    let scores = rows
        .into_iter()
        .filter_map(|(score, exam)| match exam {
            Some(exam) => Some(ScoreRecord {
                score_id: score.id,
                exam_id: exam.id,
                subject_id: score.subject_id,
                exam_type: exam.exam_type,
                marks_obtained: score.marks_obtained,
                total_marks: exam.total_marks,
            }),
            None => {
                warn!(score_id = score.id, "Score references a missing exam, ignoring");
                None
            }
        })
        .collect();

    Ok(Some(Readiness {
        campus_id: class.campus_id,
        student_name: student.name,
        required,
        scores,
    }))
}

/// Curriculum of a class in display order.
pub async fn load_required_subjects<C: ConnectionTrait>(
    db: &C,
    class_id: i32,
) -> Result<Vec<RequiredSubject>, DbErr> {
    let rows = class_subject::Entity::find()
        .filter(class_subject::Column::ClassId.eq(class_id))
        .order_by_asc(class_subject::Column::Position)
        .order_by_asc(class_subject::Column::SubjectId)
        .find_also_related(subject::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(link, subject)| {
            subject.map(|s| RequiredSubject {
                id: link.subject_id,
                name: s.name,
            })
        })
        .collect())
}

//! Folding of term scores into per-subject and grand statistics.
//!
//! Everything here is pure: the inputs are already-loaded score rows and the
//! class curriculum, the output is the payload the upsert step persists.

use std::collections::BTreeMap;

use common::Grade;
use tracing::warn;

use crate::entity::marksheet::SubjectEntry;

use super::{RequiredSubject, ScoreRecord};

/// Aggregated result for one (student, class, term, session).
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateResult {
    /// One entry per required subject, in curriculum order.
    pub subjects: Vec<SubjectEntry>,
    pub grand_obtained: f64,
    pub grand_total: f64,
    pub overall_percentage: f64,
    pub overall_grade: Grade,
}

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * obtained / total`, rounded to two decimals.
///
/// A non-positive total means a misconfigured exam reached aggregation. That
/// case is reported as 0% instead of letting the division produce NaN or
/// infinity.
pub fn percentage(obtained: f64, total: f64) -> f64 {
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    round2(obtained / total * 100.0)
}

#[derive(Default)]
struct Fold {
    obtained: f64,
    total: f64,
}

/// Fold scores into per-subject fractions, then grand totals.
///
/// Scores for subjects outside `required` are ignored. Within a subject every
/// exam type is summed (obtained over summed totals), which is a weighted
/// fraction rather than an average of percentages.
pub fn aggregate(required: &[RequiredSubject], scores: &[ScoreRecord]) -> AggregateResult {
    // Sum in exam order so float addition is reproducible across runs.
    let mut ordered: Vec<&ScoreRecord> = scores.iter().collect();
    ordered.sort_by_key(|s| (s.subject_id, s.exam_id));

    let mut folds: BTreeMap<i32, Fold> = BTreeMap::new();
    for score in ordered {
        if !required.iter().any(|r| r.id == score.subject_id) {
            continue;
        }
        if score.total_marks <= 0.0 {
            warn!(
                exam_id = score.exam_id,
                total_marks = score.total_marks,
                "Exam with non-positive total marks reached aggregation"
            );
        }
        let fold = folds.entry(score.subject_id).or_default();
        fold.obtained += score.marks_obtained;
        fold.total += score.total_marks;
    }

    let subjects: Vec<SubjectEntry> = required
        .iter()
        .map(|subject| {
            let fold = folds.remove(&subject.id).unwrap_or_default();
            if fold.total <= 0.0 {
                warn!(
                    subject_id = subject.id,
                    "Subject total is not positive, reporting 0%"
                );
            }
            // The stored pair is what readers see, so the percentage is
            // derived from it rather than from the raw fold.
            let marks_obtained = round2(fold.obtained);
            let total_marks = round2(fold.total);
            let pct = percentage(marks_obtained, total_marks);
            SubjectEntry {
                subject_id: subject.id,
                subject_name: subject.name.clone(),
                marks_obtained,
                total_marks,
                percentage: pct,
                grade: Grade::from_percentage(pct),
            }
        })
        .collect();

    let grand_obtained = round2(subjects.iter().map(|s| s.marks_obtained).sum());
    let grand_total = round2(subjects.iter().map(|s| s.total_marks).sum());
    let overall_percentage = percentage(grand_obtained, grand_total);

    AggregateResult {
        subjects,
        grand_obtained,
        grand_total,
        overall_percentage,
        overall_grade: Grade::from_percentage(overall_percentage),
    }
}

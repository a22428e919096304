use std::collections::{BTreeMap, HashMap};

use common::Term;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use super::shared::validate_session;
use crate::error::AppError;
use crate::marksheet::aggregate::round2;

/// Default and ceiling for students listed per campus.
pub const DEFAULT_TOP_PERFORMERS: u64 = 3;
pub const MAX_TOP_PERFORMERS: u64 = 20;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewQuery {
    /// Super-admins only; campus-admins are always scoped to their campus.
    pub campus_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct OverviewResponse {
    pub campus_count: u64,
    pub class_count: u64,
    /// Active students.
    pub student_count: u64,
    /// Active teachers.
    pub teacher_count: u64,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopPerformersQuery {
    pub campus_id: Option<i32>,
    pub term: Option<Term>,
    pub academic_session: Option<String>,
    /// Students per campus, 1-20. Defaults to 3.
    pub limit: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct TopPerformer {
    pub student_id: i32,
    pub student_name: String,
    /// Mean `overall_percentage` over the student's matching marksheets.
    #[schema(example = 91.5)]
    pub average_percentage: f64,
    pub marksheet_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CampusTopPerformers {
    pub campus_id: i32,
    pub campus_name: String,
    pub performers: Vec<TopPerformer>,
}

pub fn validate_top_performers(query: &TopPerformersQuery) -> Result<u64, AppError> {
    if let Some(session) = &query.academic_session {
        validate_session(session)?;
    }
    let limit = query.limit.unwrap_or(DEFAULT_TOP_PERFORMERS);
    if !(1..=MAX_TOP_PERFORMERS).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_TOP_PERFORMERS}"
        )));
    }
    Ok(limit)
}

/// Average each student's percentages per campus and keep the best `limit`.
///
/// `rows` are `(campus_id, student_id, overall_percentage)`. Ties are broken
/// by student id so the ordering is stable. Names are filled in later.
pub fn rank_top_performers(
    rows: &[(i32, i32, f64)],
    limit: usize,
) -> BTreeMap<i32, Vec<(i32, f64, u64)>> {
    let mut sums: HashMap<(i32, i32), (f64, u64)> = HashMap::new();
    for &(campus_id, student_id, pct) in rows {
        let entry = sums.entry((campus_id, student_id)).or_default();
        entry.0 += pct;
        entry.1 += 1;
    }

    let mut by_campus: BTreeMap<i32, Vec<(i32, f64, u64)>> = BTreeMap::new();
    for ((campus_id, student_id), (sum, count)) in sums {
        by_campus
            .entry(campus_id)
            .or_default()
            .push((student_id, round2(sum / count as f64), count));
    }
    for students in by_campus.values_mut() {
        students.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        students.truncate(limit);
    }
    by_campus
}

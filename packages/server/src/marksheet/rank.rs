use common::Term;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{info, instrument};

use crate::entity::marksheet;

/// Competition ranking ("1, 2, 2, 4") by descending percentage.
///
/// Input is `(id, percentage)`; output is `(id, rank)` in rank order. Equal
/// percentages share a rank and ties are listed by ascending id.
pub fn competition_ranks(entries: &[(i32, f64)]) -> Vec<(i32, i32)> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut ranks = Vec::with_capacity(sorted.len());
    let mut previous: Option<f64> = None;
    let mut current_rank = 0;
    for (position, (id, pct)) in sorted.into_iter().enumerate() {
        if previous != Some(pct) {
            current_rank = position as i32 + 1;
            previous = Some(pct);
        }
        ranks.push((id, current_rank));
    }
    ranks
}

/// Assign ranks to every marksheet of a class for one term and return the
/// ranked rows in rank order.
#[instrument(skip(db))]
pub async fn rank_class(
    db: &DatabaseConnection,
    class_id: i32,
    term: Term,
    academic_session: &str,
) -> Result<Vec<marksheet::Model>, DbErr> {
    let txn = db.begin().await?;

    let sheets = marksheet::Entity::find()
        .filter(marksheet::Column::ClassId.eq(class_id))
        .filter(marksheet::Column::Term.eq(term))
        .filter(marksheet::Column::AcademicSession.eq(academic_session))
        .order_by_asc(marksheet::Column::Id)
        .all(&txn)
        .await?;

    let entries: Vec<(i32, f64)> = sheets
        .iter()
        .map(|m| (m.id, m.overall_percentage))
        .collect();

    let mut ranked = Vec::with_capacity(sheets.len());
    for (id, rank) in competition_ranks(&entries) {
        let active = marksheet::ActiveModel {
            id: Set(id),
            rank: Set(Some(rank)),
            ..Default::default()
        };
        ranked.push(active.update(&txn).await?);
    }

    txn.commit().await?;

    info!(count = ranked.len(), "Ranked class marksheets");
    Ok(ranked)
}

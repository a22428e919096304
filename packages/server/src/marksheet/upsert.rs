use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::entity::marksheet;

use super::MarksheetKey;
use super::aggregate::AggregateResult;

fn by_key(key: &MarksheetKey) -> sea_orm::Select<marksheet::Entity> {
    marksheet::Entity::find()
        .filter(marksheet::Column::StudentId.eq(key.student_id))
        .filter(marksheet::Column::ClassId.eq(key.class_id))
        .filter(marksheet::Column::Term.eq(key.term))
        .filter(marksheet::Column::AcademicSession.eq(key.academic_session.as_str()))
}

pub async fn find_marksheet<C: ConnectionTrait>(
    db: &C,
    key: &MarksheetKey,
) -> Result<Option<marksheet::Model>, DbErr> {
    by_key(key).one(db).await
}

/// Insert or fully replace the marksheet for `key`.
///
/// Relies on the unique index over the natural key, so two concurrent
/// recomputations for the same key still leave exactly one row. A replaced row
/// keeps its `id` and `created_at`; its rank is cleared until the next ranking
/// pass.
pub async fn upsert_marksheet<C: ConnectionTrait>(
    db: &C,
    key: &MarksheetKey,
    campus_id: i32,
    result: &AggregateResult,
    final_remarks: &str,
) -> Result<marksheet::Model, DbErr> {
    let subjects =
        serde_json::to_value(&result.subjects).map_err(|e| DbErr::Custom(e.to_string()))?;
    let now = Utc::now();

    let row = marksheet::ActiveModel {
        student_id: Set(key.student_id),
        class_id: Set(key.class_id),
        campus_id: Set(campus_id),
        term: Set(key.term),
        academic_session: Set(key.academic_session.clone()),
        subjects: Set(subjects),
        grand_obtained: Set(result.grand_obtained),
        grand_total: Set(result.grand_total),
        overall_percentage: Set(result.overall_percentage),
        overall_grade: Set(result.overall_grade),
        rank: Set(None),
        final_remarks: Set(final_remarks.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    marksheet::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                marksheet::Column::StudentId,
                marksheet::Column::ClassId,
                marksheet::Column::Term,
                marksheet::Column::AcademicSession,
            ])
            .update_columns([
                marksheet::Column::CampusId,
                marksheet::Column::Subjects,
                marksheet::Column::GrandObtained,
                marksheet::Column::GrandTotal,
                marksheet::Column::OverallPercentage,
                marksheet::Column::OverallGrade,
                marksheet::Column::Rank,
                marksheet::Column::FinalRemarks,
                marksheet::Column::UpdatedAt,
            ])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_marksheet(db, key)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound("marksheet vanished after upsert".into()))
}

/// Delete the marksheet for `key`. Returns whether a row was removed.
pub async fn delete_marksheet<C: ConnectionTrait>(
    db: &C,
    key: &MarksheetKey,
) -> Result<bool, DbErr> {
    let res = marksheet::Entity::delete_many()
        .filter(marksheet::Column::StudentId.eq(key.student_id))
        .filter(marksheet::Column::ClassId.eq(key.class_id))
        .filter(marksheet::Column::Term.eq(key.term))
        .filter(marksheet::Column::AcademicSession.eq(key.academic_session.as_str()))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

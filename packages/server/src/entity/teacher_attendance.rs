use common::AttendanceStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One teacher's attendance for one day. Unique on (teacher_id, date).
///
/// `check_in` is stamped when the day is marked present; `check_out` closes it.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "teacher_attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub teacher_id: i32,
    #[sea_orm(belongs_to, from = "teacher_id", to = "id")]
    pub teacher: HasOne<super::user::Entity>,

    pub campus_id: i32,
    pub status: AttendanceStatus,
    pub date: Date,
    pub check_in: Option<DateTimeUtc>,
    pub check_out: Option<DateTimeUtc>,
    pub marked_by: Option<i32>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use common::AttendanceStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Daily attendance for one enrollment. Unique on (enrollment_id, date).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub enrollment_id: i32,
    #[sea_orm(belongs_to, from = "enrollment_id", to = "id")]
    pub enrollment: HasOne<super::enrollment::Entity>,

    pub class_id: i32,
    pub campus_id: i32,
    pub status: AttendanceStatus,
    pub date: Date,
    pub marked_by: Option<i32>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

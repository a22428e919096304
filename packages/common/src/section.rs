#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};

/// Class section letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Section {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "A"))]
    A,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "B"))]
    B,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C"))]
    C,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "D"))]
    D,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "E"))]
    E,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "F"))]
    F,
}

/// Daily attendance mark for a student or a teacher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "present"))]
    Present,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "absent"))]
    Absent,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "leave"))]
    Leave,
}

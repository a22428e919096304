#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Letter grade derived from a percentage.
///
/// Cutovers are inclusive lower bounds: `>= 90` is `A+`, `>= 80` is `A`,
/// `>= 70` is `B`, `>= 60` is `C`, `>= 50` is `D`, everything else is `F`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "A+"))]
    APlus,
    #[serde(rename = "A")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "A"))]
    A,
    #[serde(rename = "B")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "B"))]
    B,
    #[serde(rename = "C")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "C"))]
    C,
    #[serde(rename = "D")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "D"))]
    D,
    #[serde(rename = "F")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "F"))]
    F,
}

/// Lower bound (inclusive) for each grade, highest first.
const CUTOVERS: &[(f64, Grade)] = &[
    (90.0, Grade::APlus),
    (80.0, Grade::A),
    (70.0, Grade::B),
    (60.0, Grade::C),
    (50.0, Grade::D),
];

impl Grade {
    /// Map a percentage onto the cutover table.
    ///
    /// Non-finite input (NaN, infinities) is graded `F`.
    pub fn from_percentage(percentage: f64) -> Self {
        if !percentage.is_finite() {
            return Self::F;
        }
        CUTOVERS
            .iter()
            .find(|(floor, _)| percentage >= *floor)
            .map(|&(_, grade)| grade)
            .unwrap_or(Self::F)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

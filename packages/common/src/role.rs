#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four-tier role hierarchy, most privileged first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "super-admin"))]
    SuperAdmin,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "campus-admin"))]
    CampusAdmin,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "teacher"))]
    Teacher,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "student"))]
    Student,
}

impl Role {
    pub const ALL: &'static [Role] = &[
        Self::SuperAdmin,
        Self::CampusAdmin,
        Self::Teacher,
        Self::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super-admin",
            Self::CampusAdmin => "campus-admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// Whether a user holding `self` may create accounts with `other`.
    ///
    /// Super-admins create campus-admins; campus-admins create teachers and
    /// students. Super-admins may also create teachers and students directly.
    pub fn can_create(&self, other: Role) -> bool {
        match self {
            Self::SuperAdmin => other != Self::SuperAdmin,
            Self::CampusAdmin => matches!(other, Self::Teacher | Self::Student),
            Self::Teacher | Self::Student => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid role '{invalid}'. Valid values: super-admin, campus-admin, teacher, student")]
pub struct ParseRoleError {
    invalid: String,
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseRoleError {
                invalid: s.to_string(),
            })
    }
}

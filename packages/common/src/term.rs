#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two evaluation periods of an academic session.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Term {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "FirstTerm"))]
    FirstTerm,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "SecondTerm"))]
    SecondTerm,
}

impl Term {
    pub const ALL: &'static [Term] = &[Self::FirstTerm, Self::SecondTerm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTerm => "FirstTerm",
            Self::SecondTerm => "SecondTerm",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid term string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid term '{invalid}'. Valid values: FirstTerm, SecondTerm")]
pub struct ParseTermError {
    invalid: String,
}

impl FromStr for Term {
    type Err = ParseTermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FirstTerm" => Ok(Self::FirstTerm),
            "SecondTerm" => Ok(Self::SecondTerm),
            _ => Err(ParseTermError {
                invalid: s.to_string(),
            }),
        }
    }
}

/// Validate an academic session label of the form `YYYY-YYYY` where the
/// second year directly follows the first (e.g. `2025-2026`).
pub fn is_valid_academic_session(session: &str) -> bool {
    let Some((start, end)) = session.split_once('-') else {
        return false;
    };
    if start.len() != 4 || end.len() != 4 {
        return false;
    }
    match (start.parse::<u32>(), end.parse::<u32>()) {
        (Ok(s), Ok(e)) => e == s + 1,
        _ => false,
    }
}

//! Value enums shared by several entities.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weekly session frequency purchased for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Frequency {
    #[sea_orm(string_value = "3x_weekly")]
    #[serde(rename = "3x_weekly", alias = "3x")]
    ThreeWeekly,
    #[sea_orm(string_value = "5x_weekly")]
    #[serde(rename = "5x_weekly", alias = "5x")]
    FiveWeekly,
}

impl Frequency {
    /// Sessions delivered per week.
    #[must_use]
    pub const fn sessions_per_week(self) -> i32 {
        match self {
            Self::ThreeWeekly => 3,
            Self::FiveWeekly => 5,
        }
    }

    /// Canonical wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThreeWeekly => "3x_weekly",
            Self::FiveWeekly => "5x_weekly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    /// Accepts both the canonical `3x_weekly` form and the short `3x` alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3x_weekly" | "3x" => Ok(Self::ThreeWeekly),
            "5x_weekly" | "5x" => Ok(Self::FiveWeekly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("3x".parse::<Frequency>(), Ok(Frequency::ThreeWeekly));
        assert_eq!("5x_weekly".parse::<Frequency>(), Ok(Frequency::FiveWeekly));
        assert!("7x".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_value() {
        let json = serde_json::to_string(&Frequency::ThreeWeekly).unwrap_or_default();
        assert_eq!(json, "\"3x_weekly\"");
        let parsed: Frequency = serde_json::from_str("\"5x\"").unwrap_or(Frequency::ThreeWeekly);
        assert_eq!(parsed, Frequency::FiveWeekly);
    }
}

//! Reward bucket enumeration shared by the transaction and conversion ledgers.
//!
//! Stored as an integer column (`1` = non-cashable, `2` = cashable, `3` = money).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The bucket a reward amount lives in.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum RewardType {
    /// Points usable only for in-app benefits
    #[sea_orm(num_value = 1)]
    Noncashable,
    /// Points that can be converted to money
    #[sea_orm(num_value = 2)]
    Cashable,
    /// Cashed-out money balance
    #[sea_orm(num_value = 3)]
    Money,
}

impl RewardType {
    /// Every bucket, in display order.
    pub const ALL: [Self; 3] = [Self::Noncashable, Self::Cashable, Self::Money];

    /// Lowercase label used in chat commands and config files.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Noncashable => "noncashable",
            Self::Cashable => "cashable",
            Self::Money => "money",
        }
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RewardType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "noncashable" => Ok(Self::Noncashable),
            "cashable" => Ok(Self::Cashable),
            "money" | "cash" => Ok(Self::Money),
            other => Err(format!("unknown reward type '{other}'")),
        }
    }
}

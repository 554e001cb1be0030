//! Badge earned by a user. Badge assignment happens elsewhere; this table is read
//! to show the user's current badge next to their balances.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User badge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_reward_badges")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who earned the badge
    pub user_id: String,
    /// Display name of the badge
    pub badge_name: String,
    /// When the badge was earned
    pub earned_date: DateTimeUtc,
    /// When the row was written
    pub created_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

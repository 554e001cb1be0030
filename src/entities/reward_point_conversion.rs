//! Point conversion entity - Moves value from one reward bucket to another.
//!
//! `amount` is what leaves the `from_type` bucket and `converted_points` is what
//! lands in the `to_type` bucket, so rate-based conversions (e.g. 10 non-cashable
//! points for 1 cashable point) are representable.

use super::reward_type::RewardType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Point conversion database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_point_conversions")]
pub struct Model {
    /// Unique identifier for the conversion
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose buckets are affected
    pub user_id: String,
    /// Source bucket
    pub from_type: RewardType,
    /// Target bucket
    pub to_type: RewardType,
    /// Amount deducted from the source bucket
    pub amount: f64,
    /// Amount credited to the target bucket
    pub converted_points: i32,
    /// Optional note
    pub remarks: Option<String>,
    /// When the conversion was made
    pub created_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

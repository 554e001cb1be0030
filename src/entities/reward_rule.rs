//! Reward rule entity - Maps an application activity to a point value.
//!
//! Rules are looked up by `activity_name` (case-insensitive) when an activity
//! completes. The `activity_code` is generated once at creation and never changes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward rule database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_rules")]
pub struct Model {
    /// Unique identifier for the rule
    #[sea_orm(primary_key)]
    pub id: i64,
    /// System-generated code, immutable after creation
    #[sea_orm(unique)]
    pub activity_code: String,
    /// Activity name such as `"UPLOAD_PRESCRIPTION"`
    #[sea_orm(unique)]
    pub activity_name: String,
    /// Points awarded (or consumed) per occurrence
    pub points: i32,
    /// Whether the activity consumes points instead of earning them
    pub is_deductible: bool,
    /// Inactive rules are ignored by activity lookups
    pub is_active: bool,
    /// Whether repeating the activity for the same prescription is ignored
    pub is_idempotent: bool,
    /// When the rule was created
    pub created_date: DateTimeUtc,
    /// When the rule was last edited
    pub modified_date: Option<DateTimeUtc>,
}

/// Transactions reference rules softly, so no foreign keys are declared.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

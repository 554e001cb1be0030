//! Reward transaction entity - One point-affecting event for a user.
//!
//! The three balance columns are per-transaction deltas, not running totals.
//! Exactly one of them is non-zero, the one matching `reward_type`.
//! `idempotency_key` is only set for idempotent rules; the unique index makes
//! a duplicate posting fail at insert time.

use super::reward_type::RewardType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who performed the activity
    pub user_id: String,
    /// Patient the activity relates to, if any
    pub patient_id: Option<i64>,
    /// Prescription the activity relates to, if any
    pub prescription_id: Option<i64>,
    /// `SmartRx` master record the activity relates to, if any
    pub smart_rx_master_id: Option<i64>,
    /// Badge associated with the posting, if any
    pub badge_id: Option<i64>,
    /// Rule that produced the posting; `None` for direct postings
    pub reward_rule_id: Option<i64>,
    /// Bucket the delta was posted to
    pub reward_type: RewardType,
    /// Whether this posting consumed points
    pub is_deduct_points: bool,
    /// Signed point change (negative for deductions)
    pub amount_changed: i32,
    /// Non-cashable delta
    pub non_cashable_balance: i32,
    /// Cashable delta
    pub cashable_balance: i32,
    /// Money delta
    pub cashed_money_balance: f64,
    /// Free-form note, editable by admins
    pub remarks: Option<String>,
    /// `"{user}:{rule}:{prescription}"` for idempotent rules
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    /// When the posting was made
    pub created_date: DateTimeUtc,
}

/// `reward_rule_id` is a soft reference.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Reward balance entity - Materialised per-user balances.
//!
//! Updated in the same database transaction as every ledger write so balance
//! reads do not have to fold the whole history. The ledgers remain the source
//! of truth; see `core::balance::rebuild_balance`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward balance database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_balances")]
pub struct Model {
    /// User the balances belong to
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Current non-cashable balance
    pub non_cashable: f64,
    /// Current cashable balance
    pub cashable: f64,
    /// Current money balance
    pub money: f64,
    /// Last time any bucket changed
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Entity module - Contains all SeaORM entity definitions for the rewards database.
//! These entities represent the ledger tables and the balance projection.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod reward_balance;
pub mod reward_point_conversion;
pub mod reward_rule;
pub mod reward_transaction;
pub mod reward_type;
pub mod user_reward_badge;

// Re-export specific types to avoid conflicts
pub use reward_balance::{
    Column as RewardBalanceColumn, Entity as RewardBalance, Model as RewardBalanceModel,
};
pub use reward_point_conversion::{
    Column as RewardPointConversionColumn, Entity as RewardPointConversion,
    Model as RewardPointConversionModel,
};
pub use reward_rule::{Column as RewardRuleColumn, Entity as RewardRule, Model as RewardRuleModel};
pub use reward_transaction::{
    Column as RewardTransactionColumn, Entity as RewardTransaction,
    Model as RewardTransactionModel,
};
pub use reward_type::RewardType;
pub use user_reward_badge::{
    Column as UserRewardBadgeColumn, Entity as UserRewardBadge, Model as UserRewardBadgeModel,
};

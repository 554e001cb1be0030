//! Per-user balance projection.
//!
//! Every ledger write calls [`apply_delta`] inside its own database transaction, so
//! the `reward_balances` row always equals the fold of the ledgers without having to
//! rescan them. The update is a single `UPDATE ... SET col = col + delta` statement,
//! never a read-modify-write, so concurrent postings for one user cannot lose updates.

use crate::{
    core::summary,
    entities::{
        RewardBalance, RewardPointConversion, RewardTransaction, RewardType, reward_balance,
        reward_point_conversion, reward_transaction,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict, SimpleExpr},
};
use tracing::debug;

/// A change to exactly one reward bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardDelta {
    /// Change to non-cashable points
    Noncashable(i32),
    /// Change to cashable points
    Cashable(i32),
    /// Change to the money balance
    Money(f64),
}

impl RewardDelta {
    /// Builds a delta for `bucket` from a point count.
    #[must_use]
    pub fn points(bucket: RewardType, points: i32) -> Self {
        match bucket {
            RewardType::Noncashable => Self::Noncashable(points),
            RewardType::Cashable => Self::Cashable(points),
            RewardType::Money => Self::Money(f64::from(points)),
        }
    }

    /// Reads the delta a stored transaction carries.
    ///
    /// Only the column matching `reward_type` is consulted.
    #[must_use]
    pub const fn from_transaction(transaction: &reward_transaction::Model) -> Self {
        match transaction.reward_type {
            RewardType::Noncashable => Self::Noncashable(transaction.non_cashable_balance),
            RewardType::Cashable => Self::Cashable(transaction.cashable_balance),
            RewardType::Money => Self::Money(transaction.cashed_money_balance),
        }
    }

    /// The bucket this delta changes.
    #[must_use]
    pub const fn reward_type(self) -> RewardType {
        match self {
            Self::Noncashable(_) => RewardType::Noncashable,
            Self::Cashable(_) => RewardType::Cashable,
            Self::Money(_) => RewardType::Money,
        }
    }

    /// The delta as a plain amount.
    #[must_use]
    pub fn amount(self) -> f64 {
        match self {
            Self::Noncashable(points) | Self::Cashable(points) => f64::from(points),
            Self::Money(money) => money,
        }
    }

    /// Whether this delta removes value from its bucket.
    #[must_use]
    pub fn is_debit(self) -> bool {
        self.amount() < 0.0
    }

    /// The opposite change, used to reverse a posting.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Noncashable(points) => Self::Noncashable(-points),
            Self::Cashable(points) => Self::Cashable(-points),
            Self::Money(money) => Self::Money(-money),
        }
    }

    /// Values for the `(non_cashable_balance, cashable_balance, cashed_money_balance)`
    /// columns; the two buckets not touched are zero.
    #[must_use]
    pub const fn columns(self) -> (i32, i32, f64) {
        match self {
            Self::Noncashable(points) => (points, 0, 0.0),
            Self::Cashable(points) => (0, points, 0.0),
            Self::Money(money) => (0, 0, money),
        }
    }
}

const fn bucket_column(bucket: RewardType) -> reward_balance::Column {
    match bucket {
        RewardType::Noncashable => reward_balance::Column::NonCashable,
        RewardType::Cashable => reward_balance::Column::Cashable,
        RewardType::Money => reward_balance::Column::Money,
    }
}

/// Adds `amount` to one bucket of the user's projection row, creating the row on
/// first use.
///
/// Meant to run on the same connection or transaction as the ledger write it mirrors.
pub async fn apply_delta<C>(
    conn: &C,
    user_id: &str,
    bucket: RewardType,
    amount: f64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let column = bucket_column(bucket);
    let now = Utc::now();

    let updated = RewardBalance::update_many()
        .col_expr(column, Expr::col(column).add(amount))
        .col_expr(
            reward_balance::Column::UpdatedAt,
            SimpleExpr::Value(now.into()),
        )
        .filter(reward_balance::Column::UserId.eq(user_id))
        .exec(conn)
        .await
        .map_err(Error::persistence("Failed to update reward balance"))?;

    if updated.rows_affected == 0 {
        let mut row = reward_balance::ActiveModel {
            user_id: Set(user_id.to_string()),
            non_cashable: Set(0.0),
            cashable: Set(0.0),
            money: Set(0.0),
            updated_at: Set(now),
        };
        match bucket {
            RewardType::Noncashable => row.non_cashable = Set(amount),
            RewardType::Cashable => row.cashable = Set(amount),
            RewardType::Money => row.money = Set(amount),
        }
        RewardBalance::insert(row)
            .exec(conn)
            .await
            .map_err(Error::persistence("Failed to create reward balance"))?;
    }

    debug!(user_id, %bucket, amount, "Applied reward balance delta");
    Ok(())
}

/// Reads the user's projected balances. `None` if nothing was ever posted.
pub async fn get_balance(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<reward_balance::Model>> {
    RewardBalance::find_by_id(user_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Recomputes the projection for one user from the ledgers and stores it.
pub async fn rebuild_balance(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<reward_balance::Model> {
    let txn = db.begin().await?;

    let transactions = RewardTransaction::find()
        .filter(reward_transaction::Column::UserId.eq(user_id))
        .order_by_asc(reward_transaction::Column::Id)
        .all(&txn)
        .await?;
    let conversions = RewardPointConversion::find()
        .filter(reward_point_conversion::Column::UserId.eq(user_id))
        .order_by_asc(reward_point_conversion::Column::Id)
        .all(&txn)
        .await?;
    let balances = summary::fold_balances(&transactions, &conversions);

    let row = reward_balance::ActiveModel {
        user_id: Set(user_id.to_string()),
        non_cashable: Set(balances.non_cashable.final_balance),
        cashable: Set(balances.cashable.final_balance),
        money: Set(balances.money.final_balance),
        updated_at: Set(Utc::now()),
    };
    RewardBalance::insert(row)
        .on_conflict(
            OnConflict::column(reward_balance::Column::UserId)
                .update_columns([
                    reward_balance::Column::NonCashable,
                    reward_balance::Column::Cashable,
                    reward_balance::Column::Money,
                    reward_balance::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await
        .map_err(Error::persistence("Failed to rebuild reward balance"))?;

    let rebuilt = RewardBalance::find_by_id(user_id.to_string())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::Persistence {
            context: "Rebuilt reward balance is missing".to_string(),
            source: DbErr::RecordNotFound(user_id.to_string()),
        })?;
    txn.commit().await?;

    Ok(rebuilt)
}

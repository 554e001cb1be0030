//! Point conversion ledger - Moves value between reward buckets.
//!
//! A conversion is pure bookkeeping: `amount` leaves the source bucket and
//! `converted_points` lands in the target bucket. The ledger does not check that
//! the source bucket can cover the amount, nor that the two buckets differ; clients
//! validate before converting.

use crate::{
    core::balance,
    entities::{RewardPointConversion, RewardType, reward_point_conversion},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument, warn};

/// Input for a new conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversion {
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
}

impl NewConversion {
    /// A one-to-one conversion: the credited amount equals the deducted amount.
    #[must_use]
    pub fn one_to_one(
        user_id: impl Into<String>,
        from_type: RewardType,
        to_type: RewardType,
        amount: i32,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            from_type,
            to_type,
            amount: f64::from(amount),
            converted_points: amount,
            remarks: None,
        }
    }
}

/// Appends a conversion and moves the amounts in the balance projection.
///
/// # Errors
/// `Error::InvalidAmount` for a negative or non-finite `amount`,
/// `Error::Validation` for negative `converted_points`, `Error::Persistence` if the
/// write fails.
#[instrument(skip(db))]
pub async fn create_conversion(
    db: &DatabaseConnection,
    conversion: NewConversion,
) -> Result<reward_point_conversion::Model> {
    if !conversion.amount.is_finite() || conversion.amount < 0.0 {
        return Err(Error::InvalidAmount {
            amount: conversion.amount,
        });
    }
    if conversion.converted_points < 0 {
        return Err(Error::validation(format!(
            "Converted points must not be negative (got {})",
            conversion.converted_points
        )));
    }
    if conversion.from_type == conversion.to_type {
        warn!(
            user_id = %conversion.user_id,
            bucket = %conversion.from_type,
            "Recording conversion into the same bucket"
        );
    }

    let txn = db
        .begin()
        .await
        .map_err(Error::persistence("Failed to start conversion"))?;

    let row = reward_point_conversion::ActiveModel {
        user_id: Set(conversion.user_id.clone()),
        from_type: Set(conversion.from_type),
        to_type: Set(conversion.to_type),
        amount: Set(conversion.amount),
        converted_points: Set(conversion.converted_points),
        remarks: Set(conversion.remarks),
        created_date: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = row
        .insert(&txn)
        .await
        .map_err(Error::persistence("Failed to record point conversion"))?;

    balance::apply_delta(&txn, &created.user_id, created.from_type, -created.amount).await?;
    balance::apply_delta(
        &txn,
        &created.user_id,
        created.to_type,
        f64::from(created.converted_points),
    )
    .await?;
    txn.commit()
        .await
        .map_err(Error::persistence("Failed to commit conversion"))?;

    info!(
        user_id = %created.user_id,
        from = %created.from_type,
        to = %created.to_type,
        amount = created.amount,
        converted_points = created.converted_points,
        "Recorded point conversion"
    );
    Ok(created)
}

/// Retrieves all of a user's conversions, newest first.
pub async fn get_conversions_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<reward_point_conversion::Model>> {
    RewardPointConversion::find()
        .filter(reward_point_conversion::Column::UserId.eq(user_id))
        .order_by_desc(reward_point_conversion::Column::CreatedDate)
        .order_by_desc(reward_point_conversion::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a conversion by id.
pub async fn get_conversion_by_id(
    db: &DatabaseConnection,
    conversion_id: i64,
) -> Result<Option<reward_point_conversion::Model>> {
    RewardPointConversion::find_by_id(conversion_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Deletes a conversion and moves the amounts back in the balance projection.
///
/// Returns `false` if the conversion does not exist.
#[instrument(skip(db))]
pub async fn delete_conversion(db: &DatabaseConnection, conversion_id: i64) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(conversion) = RewardPointConversion::find_by_id(conversion_id)
        .one(&txn)
        .await?
    else {
        return Ok(false);
    };

    let user_id = conversion.user_id.clone();
    let (from_type, to_type) = (conversion.from_type, conversion.to_type);
    let (amount, converted_points) = (conversion.amount, conversion.converted_points);

    conversion
        .delete(&txn)
        .await
        .map_err(Error::persistence("Failed to delete point conversion"))?;
    balance::apply_delta(&txn, &user_id, from_type, amount).await?;
    balance::apply_delta(&txn, &user_id, to_type, -f64::from(converted_points)).await?;
    txn.commit().await?;

    info!(conversion_id, %user_id, "Deleted point conversion");
    Ok(true)
}

//! Shared test utilities for the rewards ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating rules, postings and conversions with sensible defaults.

use crate::{
    core::{
        balance::RewardDelta,
        reward_rule::{self, PrefixedCodeGenerator, RewardRuleInput},
        reward_transaction::{NewRewardTransaction, RewardActivity},
    },
    entities::{RewardType, reward_point_conversion, reward_rule as rule_entity, reward_transaction},
    errors::Result,
};
use chrono::{TimeDelta, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, prelude::DateTimeUtc};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Rule input with the given name, points and direction; active and not idempotent.
pub fn rule_input(activity_name: &str, points: i32, is_deductible: bool) -> RewardRuleInput {
    RewardRuleInput {
        activity_name: activity_name.to_string(),
        points,
        is_deductible,
        is_active: true,
        is_idempotent: false,
    }
}

/// Creates an active rule using the default `RR-NNNN` code generator.
pub async fn create_test_rule(
    db: &DatabaseConnection,
    activity_name: &str,
    points: i32,
    is_deductible: bool,
) -> Result<rule_entity::Model> {
    reward_rule::create_reward_rule(
        db,
        &PrefixedCodeGenerator::default(),
        rule_input(activity_name, points, is_deductible),
    )
    .await
}

/// Creates an active, earning, idempotent rule.
pub async fn create_idempotent_rule(
    db: &DatabaseConnection,
    activity_name: &str,
    points: i32,
) -> Result<rule_entity::Model> {
    let mut input = rule_input(activity_name, points, false);
    input.is_idempotent = true;
    reward_rule::create_reward_rule(db, &PrefixedCodeGenerator::default(), input).await
}

/// An activity for `user_id` with no patient or master record.
///
/// # Defaults
/// * `activity_for`: `"test activity"`
pub fn test_activity(
    user_id: &str,
    activity_name: &str,
    prescription_id: Option<i64>,
) -> RewardActivity {
    RewardActivity {
        user_id: user_id.to_string(),
        prescription_id,
        activity_name: activity_name.to_string(),
        activity_for: "test activity".to_string(),
        ..Default::default()
    }
}

/// A direct posting not tied to any rule.
///
/// # Defaults
/// * `remarks`: `"admin grant"`
pub fn admin_grant(user_id: &str, delta: RewardDelta) -> NewRewardTransaction {
    NewRewardTransaction {
        user_id: user_id.to_string(),
        patient_id: None,
        prescription_id: None,
        smart_rx_master_id: None,
        badge_id: None,
        reward_rule_id: None,
        delta,
        remarks: Some("admin grant".to_string()),
    }
}

/// A point in time `days` days before now.
pub fn days_ago(days: i64) -> DateTimeUtc {
    Utc::now() - TimeDelta::days(days)
}

/// An unsaved transaction row carrying `delta`.
#[allow(clippy::cast_possible_truncation)]
pub fn transaction_model(
    id: i64,
    user_id: &str,
    delta: RewardDelta,
    is_deduct_points: bool,
) -> reward_transaction::Model {
    let (non_cashable_balance, cashable_balance, cashed_money_balance) = delta.columns();
    reward_transaction::Model {
        id,
        user_id: user_id.to_string(),
        patient_id: None,
        prescription_id: None,
        smart_rx_master_id: None,
        badge_id: None,
        reward_rule_id: None,
        reward_type: delta.reward_type(),
        is_deduct_points,
        amount_changed: delta.amount().trunc() as i32,
        non_cashable_balance,
        cashable_balance,
        cashed_money_balance,
        remarks: None,
        idempotency_key: None,
        created_date: Utc::now(),
    }
}

/// An unsaved conversion row.
pub fn conversion_model(
    id: i64,
    user_id: &str,
    from_type: RewardType,
    to_type: RewardType,
    amount: f64,
    converted_points: i32,
) -> reward_point_conversion::Model {
    reward_point_conversion::Model {
        id,
        user_id: user_id.to_string(),
        from_type,
        to_type,
        amount,
        converted_points,
        remarks: None,
        created_date: Utc::now(),
    }
}

async fn insert_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    patient_id: Option<i64>,
    delta: RewardDelta,
    created_date: DateTimeUtc,
) -> Result<reward_transaction::Model> {
    let template = transaction_model(0, user_id, delta, delta.is_debit());
    let row = reward_transaction::ActiveModel {
        user_id: Set(template.user_id),
        patient_id: Set(patient_id),
        prescription_id: Set(None),
        smart_rx_master_id: Set(None),
        badge_id: Set(None),
        reward_rule_id: Set(None),
        reward_type: Set(template.reward_type),
        is_deduct_points: Set(template.is_deduct_points),
        amount_changed: Set(template.amount_changed),
        non_cashable_balance: Set(template.non_cashable_balance),
        cashable_balance: Set(template.cashable_balance),
        cashed_money_balance: Set(template.cashed_money_balance),
        remarks: Set(None),
        idempotency_key: Set(None),
        created_date: Set(created_date),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Inserts a ledger row at a fixed time, bypassing the balance projection.
pub async fn insert_transaction_at(
    db: &DatabaseConnection,
    user_id: &str,
    delta: RewardDelta,
    created_date: DateTimeUtc,
) -> Result<reward_transaction::Model> {
    insert_transaction(db, user_id, None, delta, created_date).await
}

/// Inserts a ledger row for a patient, bypassing the balance projection.
pub async fn insert_patient_transaction(
    db: &DatabaseConnection,
    user_id: &str,
    patient_id: i64,
    delta: RewardDelta,
) -> Result<reward_transaction::Model> {
    insert_transaction(db, user_id, Some(patient_id), delta, Utc::now()).await
}

/// Inserts a conversion at a fixed time, bypassing the balance projection.
pub async fn insert_conversion_at(
    db: &DatabaseConnection,
    user_id: &str,
    from_type: RewardType,
    to_type: RewardType,
    amount: f64,
    converted_points: i32,
    created_date: DateTimeUtc,
) -> Result<reward_point_conversion::Model> {
    let row = reward_point_conversion::ActiveModel {
        user_id: Set(user_id.to_string()),
        from_type: Set(from_type),
        to_type: Set(to_type),
        amount: Set(amount),
        converted_points: Set(converted_points),
        remarks: Set(None),
        created_date: Set(created_date),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

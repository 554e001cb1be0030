//! Reward transaction ledger - Records every point-affecting event.
//!
//! Rule-driven postings go through [`record_for_activity`]: the activity name is
//! resolved against the catalog, the signed amount is posted to the non-cashable
//! bucket, and the user's balance projection is updated in the same database
//! transaction. Only idempotent rules are deduplicated per
//! `(user, rule, prescription)`; repeating any other activity posts again.
//!
//! Reward posting is secondary to whatever the user was doing. Callers on
//! non-critical paths use [`record_reward_best_effort`] so a ledger failure never
//! undoes the primary action.

use crate::{
    core::{balance, balance::RewardDelta, reward_rule},
    entities::{RewardTransaction, RewardType, reward_transaction},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// An application event that may earn or consume points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardActivity {
    /// User who performed the activity
    pub user_id: String,
    /// Prescription involved, if any
    pub prescription_id: Option<i64>,
    /// `SmartRx` master record involved, if any
    pub smart_rx_master_id: Option<i64>,
    /// Patient involved, if any
    pub patient_id: Option<i64>,
    /// Catalog key, e.g. `"UPLOAD_PRESCRIPTION"`
    pub activity_name: String,
    /// Human-readable description used in the reward message
    pub activity_for: String,
}

/// What the UI shows after a successful posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    /// Always `true`; a posting that did not happen is `None`
    pub is_reward_updated: bool,
    /// Title for the popup
    pub reward_title: String,
    /// Points earned or consumed (unsigned)
    pub points: i32,
    /// `"You have earned ..."` / `"You have consumed ..."`
    pub reward_message: String,
}

/// A posting with an explicit bucket, outside the rule catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRewardTransaction {
    /// User the posting belongs to
    pub user_id: String,
    /// Patient involved, if any
    pub patient_id: Option<i64>,
    /// Prescription involved, if any
    pub prescription_id: Option<i64>,
    /// `SmartRx` master record involved, if any
    pub smart_rx_master_id: Option<i64>,
    /// Badge involved, if any
    pub badge_id: Option<i64>,
    /// Rule to attribute the posting to, if any
    pub reward_rule_id: Option<i64>,
    /// Bucket and signed amount
    pub delta: RewardDelta,
    /// Free-form note
    pub remarks: Option<String>,
}

/// One page of a user's transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    /// Transactions on this page, newest first
    pub items: Vec<reward_transaction::Model>,
    /// Zero-based page index
    pub page: u64,
    /// Total transactions for the user
    pub total_items: u64,
    /// Total pages at the requested page size
    pub total_pages: u64,
}

/// Builds the popup message for a posting.
#[must_use]
pub fn reward_message(is_deduction: bool, points: i32, activity_for: &str) -> String {
    if is_deduction {
        format!("You have consumed {points} points for {activity_for}.")
    } else {
        format!("You have earned {points} points for {activity_for}.")
    }
}

/// Key enforcing one posting per `(user, rule, prescription)` for idempotent rules.
#[must_use]
pub fn idempotency_key(user_id: &str, rule_id: i64, prescription_id: Option<i64>) -> String {
    prescription_id.map_or_else(
        || format!("{user_id}:{rule_id}:-"),
        |prescription_id| format!("{user_id}:{rule_id}:{prescription_id}"),
    )
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn already_recorded<C>(
    conn: &C,
    user_id: &str,
    rule_id: i64,
    prescription_id: Option<i64>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let prescription_filter = prescription_id.map_or_else(
        || reward_transaction::Column::PrescriptionId.is_null(),
        |id| reward_transaction::Column::PrescriptionId.eq(id),
    );
    let existing = RewardTransaction::find()
        .filter(reward_transaction::Column::UserId.eq(user_id))
        .filter(reward_transaction::Column::RewardRuleId.eq(rule_id))
        .filter(prescription_filter)
        .count(conn)
        .await
        .map_err(Error::persistence("Failed to check for an existing reward"))?;
    Ok(existing > 0)
}

/// Posts the reward configured for `activity.activity_name`.
///
/// Returns `Ok(None)` when no active rule matches, the rule is worth zero points, or
/// the rule is idempotent and this `(user, rule, prescription)` was already rewarded.
///
/// # Errors
/// `Error::Validation` if the activity name is blank, `Error::Persistence` if the
/// posting cannot be written. Nothing is retried.
#[instrument(skip(db, activity), fields(user_id = %activity.user_id, activity = %activity.activity_name))]
pub async fn record_for_activity(
    db: &DatabaseConnection,
    activity: &RewardActivity,
) -> Result<Option<RewardOutcome>> {
    if activity.activity_name.trim().is_empty() {
        return Err(Error::validation("Activity name is required"));
    }

    let Some(rule) =
        reward_rule::get_reward_rule_by_activity_name(db, &activity.activity_name).await?
    else {
        debug!("No active reward rule for activity");
        return Ok(None);
    };
    if rule.points == 0 {
        debug!(rule_id = rule.id, "Reward rule is worth zero points");
        return Ok(None);
    }

    let amount_changed = if rule.is_deductible {
        -rule.points
    } else {
        rule.points
    };
    let delta = RewardDelta::Noncashable(amount_changed);
    let (non_cashable_balance, cashable_balance, cashed_money_balance) = delta.columns();
    let key = rule
        .is_idempotent
        .then(|| idempotency_key(&activity.user_id, rule.id, activity.prescription_id));

    let txn = db
        .begin()
        .await
        .map_err(Error::persistence("Failed to start reward transaction"))?;

    if rule.is_idempotent
        && already_recorded(&txn, &activity.user_id, rule.id, activity.prescription_id).await?
    {
        debug!(rule_id = rule.id, "Reward already recorded for prescription");
        return Ok(None);
    }

    let posting = reward_transaction::ActiveModel {
        user_id: Set(activity.user_id.clone()),
        patient_id: Set(activity.patient_id),
        prescription_id: Set(activity.prescription_id),
        smart_rx_master_id: Set(activity.smart_rx_master_id),
        badge_id: Set(None),
        reward_rule_id: Set(Some(rule.id)),
        reward_type: Set(RewardType::Noncashable),
        is_deduct_points: Set(rule.is_deductible),
        amount_changed: Set(amount_changed),
        non_cashable_balance: Set(non_cashable_balance),
        cashable_balance: Set(cashable_balance),
        cashed_money_balance: Set(cashed_money_balance),
        remarks: Set(None),
        idempotency_key: Set(key),
        created_date: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match posting.insert(&txn).await {
        Ok(_) => {}
        // A concurrent request won the race for the same idempotency key
        Err(err) if is_unique_violation(&err) => {
            debug!(rule_id = rule.id, "Duplicate reward rejected by unique index");
            return Ok(None);
        }
        Err(err) => return Err(Error::persistence("Failed to record reward transaction")(err)),
    }

    balance::apply_delta(&txn, &activity.user_id, delta.reward_type(), delta.amount()).await?;
    txn.commit()
        .await
        .map_err(Error::persistence("Failed to commit reward transaction"))?;

    info!(amount_changed, rule_id = rule.id, "Recorded reward");

    Ok(Some(RewardOutcome {
        is_reward_updated: true,
        reward_title: rule.activity_name,
        points: rule.points,
        reward_message: reward_message(rule.is_deductible, rule.points, &activity.activity_for),
    }))
}

/// Like [`record_for_activity`], but any failure is logged and reported as "no reward".
pub async fn record_reward_best_effort(
    db: &DatabaseConnection,
    activity: &RewardActivity,
) -> Option<RewardOutcome> {
    record_for_activity(db, activity)
        .await
        .unwrap_or_else(|err| {
            warn!(
                user_id = %activity.user_id,
                activity = %activity.activity_name,
                error = %err,
                "Reward posting failed; continuing without reward"
            );
            None
        })
}

/// Posts an explicit delta (admin grants, cashable or money adjustments).
#[instrument(skip(db))]
pub async fn create_reward_transaction(
    db: &DatabaseConnection,
    new_transaction: NewRewardTransaction,
) -> Result<reward_transaction::Model> {
    let amount = new_transaction.delta.amount();
    if !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    if amount == 0.0 || amount.abs() > f64::from(i32::MAX) {
        return Err(Error::InvalidAmount { amount });
    }

    let delta = new_transaction.delta;
    let (non_cashable_balance, cashable_balance, cashed_money_balance) = delta.columns();
    // Money deltas are recorded in whole units in the signed change column
    #[allow(clippy::cast_possible_truncation)]
    let amount_changed = amount.trunc() as i32;

    let txn = db
        .begin()
        .await
        .map_err(Error::persistence("Failed to start reward transaction"))?;

    let posting = reward_transaction::ActiveModel {
        user_id: Set(new_transaction.user_id.clone()),
        patient_id: Set(new_transaction.patient_id),
        prescription_id: Set(new_transaction.prescription_id),
        smart_rx_master_id: Set(new_transaction.smart_rx_master_id),
        badge_id: Set(new_transaction.badge_id),
        reward_rule_id: Set(new_transaction.reward_rule_id),
        reward_type: Set(delta.reward_type()),
        is_deduct_points: Set(delta.is_debit()),
        amount_changed: Set(amount_changed),
        non_cashable_balance: Set(non_cashable_balance),
        cashable_balance: Set(cashable_balance),
        cashed_money_balance: Set(cashed_money_balance),
        remarks: Set(new_transaction.remarks),
        idempotency_key: Set(None),
        created_date: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = posting
        .insert(&txn)
        .await
        .map_err(Error::persistence("Failed to create reward transaction"))?;
    balance::apply_delta(&txn, &created.user_id, delta.reward_type(), amount).await?;
    txn.commit()
        .await
        .map_err(Error::persistence("Failed to commit reward transaction"))?;

    Ok(created)
}

/// Retrieves a transaction by id.
pub async fn get_reward_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<reward_transaction::Model>> {
    RewardTransaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all of a user's transactions, newest first, optionally for one patient.
pub async fn get_reward_transactions_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    patient_id: Option<i64>,
) -> Result<Vec<reward_transaction::Model>> {
    let mut query =
        RewardTransaction::find().filter(reward_transaction::Column::UserId.eq(user_id));
    if let Some(patient_id) = patient_id {
        query = query.filter(reward_transaction::Column::PatientId.eq(patient_id));
    }
    query
        .order_by_desc(reward_transaction::Column::CreatedDate)
        .order_by_desc(reward_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves one page of a user's transactions, newest first.
///
/// `page` is zero-based.
pub async fn get_reward_transactions_page(
    db: &DatabaseConnection,
    user_id: &str,
    page: u64,
    page_size: u64,
) -> Result<TransactionPage> {
    if page_size == 0 {
        return Err(Error::validation("Page size must be greater than zero"));
    }

    let paginator = RewardTransaction::find()
        .filter(reward_transaction::Column::UserId.eq(user_id))
        .order_by_desc(reward_transaction::Column::CreatedDate)
        .order_by_desc(reward_transaction::Column::Id)
        .paginate(db, page_size);

    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page).await?;

    Ok(TransactionPage {
        items,
        page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Replaces the remarks on a transaction. Amounts are never editable.
///
/// Returns `None` if the transaction does not exist.
pub async fn update_reward_transaction_remarks(
    db: &DatabaseConnection,
    transaction_id: i64,
    remarks: Option<String>,
) -> Result<Option<reward_transaction::Model>> {
    let Some(existing) = get_reward_transaction_by_id(db, transaction_id).await? else {
        return Ok(None);
    };

    let mut posting: reward_transaction::ActiveModel = existing.into();
    posting.remarks = Set(remarks);
    let updated = posting
        .update(db)
        .await
        .map_err(Error::persistence("Failed to update reward transaction"))?;
    Ok(Some(updated))
}

/// Deletes a transaction and reverses its effect on the balance projection.
///
/// Returns `false` if the transaction does not exist.
#[instrument(skip(db))]
pub async fn delete_reward_transaction(db: &DatabaseConnection, transaction_id: i64) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(posting) = RewardTransaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
    else {
        return Ok(false);
    };

    let user_id = posting.user_id.clone();
    let reversal = RewardDelta::from_transaction(&posting).negated();

    posting
        .delete(&txn)
        .await
        .map_err(Error::persistence("Failed to delete reward transaction"))?;
    balance::apply_delta(&txn, &user_id, reversal.reward_type(), reversal.amount()).await?;
    txn.commit().await?;

    info!(transaction_id, %user_id, "Deleted reward transaction");
    Ok(true)
}

//! Balance and history calculations over the two ledgers.
//!
//! For each bucket X:
//!
//! ```text
//! initial_X       = Σ transaction deltas for X
//! converted_to_X  = Σ converted_points of conversions into X
//! deducted_from_X = Σ amount of conversions out of X
//! net_X           = converted_to_X − deducted_from_X
//! final_X         = initial_X + net_X
//! ```
//!
//! The summary folds the full history on every call. [`crate::core::balance`] keeps
//! an incrementally maintained copy of the final figures for cheap reads.

use crate::{
    core::{badge, conversion, reward_transaction},
    entities::{
        RewardType, reward_point_conversion, reward_transaction as transaction_entity,
        user_reward_badge,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, prelude::DateTimeUtc};
use serde::Serialize;
use std::fmt;

/// Balance breakdown for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BucketBalance {
    /// Sum of transaction deltas
    pub initial: f64,
    /// Credited by conversions into this bucket
    pub converted_to: f64,
    /// Deducted by conversions out of this bucket
    pub deducted_from: f64,
    /// `converted_to - deducted_from`
    pub net: f64,
    /// `initial + net`
    pub final_balance: f64,
}

/// Breakdown for all three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BucketBalances {
    /// Non-cashable points
    pub non_cashable: BucketBalance,
    /// Cashable points
    pub cashable: BucketBalance,
    /// Money
    pub money: BucketBalance,
}

impl BucketBalances {
    /// The breakdown for `bucket`.
    #[must_use]
    pub const fn get(&self, bucket: RewardType) -> &BucketBalance {
        match bucket {
            RewardType::Noncashable => &self.non_cashable,
            RewardType::Cashable => &self.cashable,
            RewardType::Money => &self.money,
        }
    }

    fn get_mut(&mut self, bucket: RewardType) -> &mut BucketBalance {
        match bucket {
            RewardType::Noncashable => &mut self.non_cashable,
            RewardType::Cashable => &mut self.cashable,
            RewardType::Money => &mut self.money,
        }
    }
}

/// A user's reward position at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardSummary {
    /// User summarised
    pub user_id: String,
    /// Patient filter applied to transactions, if any
    pub patient_id: Option<i64>,
    /// Per-bucket breakdown
    pub balances: BucketBalances,
    /// Sum of `amount_changed` over earning transactions
    pub total_earned_points: i64,
    /// Deductions plus conversions into cashable points and money
    pub total_consumed_points: f64,
    /// Number of transactions folded
    pub transaction_count: usize,
    /// Number of conversions folded
    pub conversion_count: usize,
    /// Most recently earned badge
    pub current_badge: Option<user_reward_badge::Model>,
}

/// Folds both ledgers into per-bucket balances.
#[must_use]
pub fn fold_balances(
    transactions: &[transaction_entity::Model],
    conversions: &[reward_point_conversion::Model],
) -> BucketBalances {
    let mut balances = BucketBalances::default();

    for transaction in transactions {
        balances.non_cashable.initial += f64::from(transaction.non_cashable_balance);
        balances.cashable.initial += f64::from(transaction.cashable_balance);
        balances.money.initial += transaction.cashed_money_balance;
    }

    for conversion in conversions {
        balances.get_mut(conversion.to_type).converted_to += f64::from(conversion.converted_points);
        balances.get_mut(conversion.from_type).deducted_from += conversion.amount;
    }

    for bucket in RewardType::ALL {
        let balance = balances.get_mut(bucket);
        balance.net = balance.converted_to - balance.deducted_from;
        balance.final_balance = balance.initial + balance.net;
    }

    balances
}

/// Builds a summary from already-loaded rows. `None` if there are no transactions.
#[must_use]
pub fn fold_summary(
    user_id: &str,
    patient_id: Option<i64>,
    transactions: &[transaction_entity::Model],
    conversions: &[reward_point_conversion::Model],
    current_badge: Option<user_reward_badge::Model>,
) -> Option<RewardSummary> {
    if transactions.is_empty() {
        return None;
    }

    let balances = fold_balances(transactions, conversions);

    let total_earned_points = transactions
        .iter()
        .filter(|t| !t.is_deduct_points)
        .map(|t| i64::from(t.amount_changed))
        .sum();
    let total_deducted: i64 = transactions
        .iter()
        .filter(|t| t.is_deduct_points)
        .map(|t| i64::from(t.amount_changed))
        .sum();
    // Whole points, far below f64's exact integer range
    #[allow(clippy::cast_precision_loss)]
    let total_consumed_points = total_deducted.abs() as f64
        + balances.cashable.converted_to
        + balances.money.converted_to;

    Some(RewardSummary {
        user_id: user_id.to_string(),
        patient_id,
        balances,
        total_earned_points,
        total_consumed_points,
        transaction_count: transactions.len(),
        conversion_count: conversions.len(),
        current_badge,
    })
}

/// Summarises a user's rewards, optionally restricting transactions to one patient.
///
/// Conversions are user-level and always included. Returns `None` for a user with
/// no transactions.
pub async fn summary_for_user(
    db: &DatabaseConnection,
    user_id: &str,
    patient_id: Option<i64>,
) -> Result<Option<RewardSummary>> {
    let transactions =
        reward_transaction::get_reward_transactions_for_user(db, user_id, patient_id).await?;
    if transactions.is_empty() {
        return Ok(None);
    }

    let conversions = conversion::get_conversions_for_user(db, user_id).await?;
    let current_badge = badge::get_current_badge(db, user_id).await?;

    Ok(fold_summary(
        user_id,
        patient_id,
        &transactions,
        &conversions,
        current_badge,
    ))
}

/// Discriminator for merged history rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordType {
    /// A reward transaction
    PatientReward,
    /// A point conversion
    Conversion,
}

impl RecordType {
    /// Wire name of the record type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PatientReward => "PatientReward",
            Self::Conversion => "Conversion",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the merged history timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "recordType", content = "record")]
pub enum HistoryEntry {
    /// A reward transaction
    PatientReward(transaction_entity::Model),
    /// A point conversion
    Conversion(reward_point_conversion::Model),
}

impl HistoryEntry {
    /// Which ledger the row came from.
    #[must_use]
    pub const fn record_type(&self) -> RecordType {
        match self {
            Self::PatientReward(_) => RecordType::PatientReward,
            Self::Conversion(_) => RecordType::Conversion,
        }
    }

    /// When the row was written.
    #[must_use]
    pub const fn created_date(&self) -> DateTimeUtc {
        match self {
            Self::PatientReward(transaction) => transaction.created_date,
            Self::Conversion(conversion) => conversion.created_date,
        }
    }
}

/// Inclusive date range in UTC calendar days.
///
/// The end day is included through `23:59:59.999999999`; the first instant of the
/// following day is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    /// Creates a window covering `start` through `end`.
    ///
    /// # Errors
    /// `Error::Validation` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::validation(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whether `instant` falls on a day inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTimeUtc) -> bool {
        let day = instant.date_naive();
        day >= self.start && day <= self.end
    }
}

/// Which rows of the timeline to keep.
///
/// Neither or both flags set keeps everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryFilter {
    /// Keep earning transactions
    pub earned: bool,
    /// Keep deducting transactions and conversions
    pub consumed: bool,
}

impl HistoryFilter {
    /// Whether `entry` passes the filter.
    #[must_use]
    pub const fn admits(&self, entry: &HistoryEntry) -> bool {
        if self.earned == self.consumed {
            return true;
        }
        let is_consumption = match entry {
            HistoryEntry::PatientReward(transaction) => transaction.is_deduct_points,
            HistoryEntry::Conversion(_) => true,
        };
        if self.consumed {
            is_consumption
        } else {
            !is_consumption
        }
    }
}

/// Merges transactions and conversions into one newest-first timeline.
#[must_use]
pub fn merge_history(
    transactions: Vec<transaction_entity::Model>,
    conversions: Vec<reward_point_conversion::Model>,
    window: Option<DateWindow>,
    filter: HistoryFilter,
) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = transactions
        .into_iter()
        .map(HistoryEntry::PatientReward)
        .chain(conversions.into_iter().map(HistoryEntry::Conversion))
        .filter(|entry| window.is_none_or(|w| w.contains(entry.created_date())))
        .filter(|entry| filter.admits(entry))
        .collect();

    entries.sort_by(|a, b| b.created_date().cmp(&a.created_date()));
    entries
}

/// Loads and merges a user's reward history.
pub async fn detail_history(
    db: &DatabaseConnection,
    user_id: &str,
    window: Option<DateWindow>,
    filter: HistoryFilter,
) -> Result<Vec<HistoryEntry>> {
    let transactions =
        reward_transaction::get_reward_transactions_for_user(db, user_id, None).await?;
    let conversions = conversion::get_conversions_for_user(db, user_id).await?;

    Ok(merge_history(transactions, conversions, window, filter))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{balance, balance::RewardDelta, conversion::NewConversion};
    use crate::test_utils::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn assert_fold_identity(balances: &BucketBalances) {
        for bucket in RewardType::ALL {
            let b = balances.get(bucket);
            assert_eq!(b.final_balance, b.initial + b.converted_to - b.deducted_from);
            assert_eq!(b.net, b.converted_to - b.deducted_from);
        }
    }

    #[test]
    fn test_fold_identity_on_synthetic_ledgers() {
        let transactions = vec![
            transaction_model(1, "u", RewardDelta::Noncashable(100), false),
            transaction_model(2, "u", RewardDelta::Noncashable(-15), true),
            transaction_model(3, "u", RewardDelta::Cashable(40), false),
            transaction_model(4, "u", RewardDelta::Money(12.5), false),
        ];
        let conversions = vec![
            conversion_model(1, "u", RewardType::Noncashable, RewardType::Cashable, 50.0, 5),
            conversion_model(2, "u", RewardType::Cashable, RewardType::Money, 20.0, 2),
            conversion_model(3, "u", RewardType::Money, RewardType::Money, 1.0, 1),
        ];

        let balances = fold_balances(&transactions, &conversions);
        assert_fold_identity(&balances);

        assert_eq!(balances.non_cashable.initial, 85.0);
        assert_eq!(balances.non_cashable.deducted_from, 50.0);
        assert_eq!(balances.non_cashable.final_balance, 35.0);
        assert_eq!(balances.cashable.converted_to, 5.0);
        assert_eq!(balances.cashable.deducted_from, 20.0);
        assert_eq!(balances.cashable.final_balance, 25.0);
        assert_eq!(balances.money.initial, 12.5);
        assert_eq!(balances.money.converted_to, 3.0);
        assert_eq!(balances.money.deducted_from, 1.0);
        assert_eq!(balances.money.final_balance, 14.5);
    }

    #[test]
    fn test_amount_and_converted_points_are_summed_separately() {
        // 100 non-cashable points buy 10 cashable points
        let transactions = vec![transaction_model(
            1,
            "u",
            RewardDelta::Noncashable(200),
            false,
        )];
        let conversions = vec![conversion_model(
            1,
            "u",
            RewardType::Noncashable,
            RewardType::Cashable,
            100.0,
            10,
        )];

        let summary = fold_summary("u", None, &transactions, &conversions, None).unwrap();
        assert_eq!(summary.balances.non_cashable.deducted_from, 100.0);
        assert_eq!(summary.balances.non_cashable.final_balance, 100.0);
        assert_eq!(summary.balances.cashable.converted_to, 10.0);
        assert_eq!(summary.balances.cashable.final_balance, 10.0);
        // Consumption counts what landed in the cashable bucket
        assert_eq!(summary.total_consumed_points, 10.0);
    }

    #[test]
    fn test_consumed_points_rule() {
        let transactions = vec![
            transaction_model(1, "u", RewardDelta::Noncashable(100), false),
            transaction_model(2, "u", RewardDelta::Noncashable(-10), true),
            transaction_model(3, "u", RewardDelta::Noncashable(-5), true),
        ];
        let conversions = vec![
            conversion_model(1, "u", RewardType::Noncashable, RewardType::Cashable, 20.0, 20),
            conversion_model(2, "u", RewardType::Cashable, RewardType::Money, 8.0, 8),
            // Conversions into non-cashable points are not consumption
            conversion_model(3, "u", RewardType::Cashable, RewardType::Noncashable, 4.0, 4),
        ];

        let summary = fold_summary("u", None, &transactions, &conversions, None).unwrap();
        assert_eq!(summary.total_earned_points, 100);
        assert_eq!(summary.total_consumed_points, 15.0 + 20.0 + 8.0);
        assert_eq!(summary.transaction_count, 3);
        assert_eq!(summary.conversion_count, 3);
    }

    #[test]
    fn test_fold_summary_without_transactions_is_none() {
        let conversions = vec![conversion_model(
            1,
            "u",
            RewardType::Noncashable,
            RewardType::Money,
            5.0,
            5,
        )];
        assert!(fold_summary("u", None, &[], &conversions, None).is_none());
    }

    #[tokio::test]
    async fn test_summary_scenario_noncashable_to_money() -> Result<()> {
        let db = setup_test_db().await?;
        insert_transaction_at(&db, "user-1", RewardDelta::Noncashable(100), days_ago(2)).await?;
        crate::core::conversion::create_conversion(
            &db,
            NewConversion::one_to_one("user-1", RewardType::Noncashable, RewardType::Money, 30),
        )
        .await?;

        let summary = summary_for_user(&db, "user-1", None).await?.unwrap();
        assert_eq!(summary.balances.non_cashable.final_balance, 70.0);
        assert_eq!(summary.balances.money.final_balance, 30.0);
        assert_eq!(summary.balances.cashable.final_balance, 0.0);
        assert_eq!(summary.total_earned_points, 100);
        assert_eq!(summary.total_consumed_points, 30.0);
        assert_fold_identity(&summary.balances);
        Ok(())
    }

    #[tokio::test]
    async fn test_conversion_round_trip_moves_fifty() -> Result<()> {
        let db = setup_test_db().await?;
        insert_transaction_at(&db, "user-1", RewardDelta::Noncashable(80), days_ago(1)).await?;

        let before = summary_for_user(&db, "user-1", None).await?.unwrap();
        crate::core::conversion::create_conversion(
            &db,
            NewConversion::one_to_one("user-1", RewardType::Noncashable, RewardType::Money, 50),
        )
        .await?;
        let after = summary_for_user(&db, "user-1", None).await?.unwrap();

        assert_eq!(
            after.balances.non_cashable.deducted_from,
            before.balances.non_cashable.deducted_from + 50.0
        );
        assert_eq!(
            after.balances.money.converted_to,
            before.balances.money.converted_to + 50.0
        );
        assert_eq!(after.conversion_count, before.conversion_count + 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_for_user_without_transactions() -> Result<()> {
        let db = setup_test_db().await?;
        // A conversion alone does not make a summary
        insert_conversion_at(
            &db,
            "user-1",
            RewardType::Cashable,
            RewardType::Money,
            5.0,
            5,
            days_ago(1),
        )
        .await?;

        assert!(summary_for_user(&db, "user-1", None).await?.is_none());
        assert!(summary_for_user(&db, "nobody", None).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_patient_filter_and_badge() -> Result<()> {
        let db = setup_test_db().await?;
        insert_patient_transaction(&db, "user-1", 1, RewardDelta::Noncashable(10)).await?;
        insert_patient_transaction(&db, "user-1", 2, RewardDelta::Noncashable(25)).await?;
        badge::award_badge(&db, "user-1", "Silver", days_ago(5)).await?;
        badge::award_badge(&db, "user-1", "Gold", days_ago(1)).await?;

        let patient_2 = summary_for_user(&db, "user-1", Some(2)).await?.unwrap();
        assert_eq!(patient_2.patient_id, Some(2));
        assert_eq!(patient_2.transaction_count, 1);
        assert_eq!(patient_2.balances.non_cashable.initial, 25.0);
        assert_eq!(patient_2.current_badge.unwrap().badge_name, "Gold");

        assert!(summary_for_user(&db, "user-1", Some(3)).await?.is_none());

        let everyone = summary_for_user(&db, "user-1", None).await?.unwrap();
        assert_eq!(everyone.balances.non_cashable.initial, 35.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_projection_matches_fold() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_rule(&db, "UPLOAD_PRESCRIPTION", 10, false).await?;
        create_test_rule(&db, "DELETE_PRESCRIPTION", 4, true).await?;

        for prescription in 1..=3 {
            crate::core::reward_transaction::record_for_activity(
                &db,
                &test_activity("user-1", "UPLOAD_PRESCRIPTION", Some(prescription)),
            )
            .await?;
        }
        crate::core::reward_transaction::record_for_activity(
            &db,
            &test_activity("user-1", "DELETE_PRESCRIPTION", Some(1)),
        )
        .await?;
        crate::core::conversion::create_conversion(
            &db,
            NewConversion {
                user_id: "user-1".to_string(),
                from_type: RewardType::Noncashable,
                to_type: RewardType::Cashable,
                amount: 20.0,
                converted_points: 2,
                remarks: None,
            },
        )
        .await?;

        let summary = summary_for_user(&db, "user-1", None).await?.unwrap();
        let projected = balance::get_balance(&db, "user-1").await?.unwrap();

        assert_eq!(projected.non_cashable, summary.balances.non_cashable.final_balance);
        assert_eq!(projected.cashable, summary.balances.cashable.final_balance);
        assert_eq!(projected.money, summary.balances.money.final_balance);
        assert_eq!(projected.non_cashable, 30.0 - 4.0 - 20.0);
        Ok(())
    }

    #[test]
    fn test_date_window_end_of_day_boundary() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let window = DateWindow::new(start, end).unwrap();

        let last_second = Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 59).unwrap();
        let last_instant = last_second + TimeDelta::nanoseconds(999_999_999);
        let next_day = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap()
            + TimeDelta::microseconds(1);
        let first_instant = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let day_before = first_instant - TimeDelta::microseconds(1);

        assert!(window.contains(last_second));
        assert!(window.contains(last_instant));
        assert!(!window.contains(next_day));
        assert!(window.contains(first_instant));
        assert!(!window.contains(day_before));
    }

    #[test]
    fn test_date_window_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(matches!(
            DateWindow::new(start, end),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_history_filter() {
        let earned = HistoryEntry::PatientReward(transaction_model(
            1,
            "u",
            RewardDelta::Noncashable(10),
            false,
        ));
        let deducted = HistoryEntry::PatientReward(transaction_model(
            2,
            "u",
            RewardDelta::Noncashable(-10),
            true,
        ));
        let converted = HistoryEntry::Conversion(conversion_model(
            1,
            "u",
            RewardType::Noncashable,
            RewardType::Money,
            1.0,
            1,
        ));

        let all = HistoryFilter::default();
        let both = HistoryFilter {
            earned: true,
            consumed: true,
        };
        let earned_only = HistoryFilter {
            earned: true,
            consumed: false,
        };
        let consumed_only = HistoryFilter {
            earned: false,
            consumed: true,
        };

        for entry in [&earned, &deducted, &converted] {
            assert!(all.admits(entry));
            assert!(both.admits(entry));
        }
        assert!(earned_only.admits(&earned));
        assert!(!earned_only.admits(&deducted));
        assert!(!earned_only.admits(&converted));
        assert!(!consumed_only.admits(&earned));
        assert!(consumed_only.admits(&deducted));
        assert!(consumed_only.admits(&converted));
    }

    #[tokio::test]
    async fn test_detail_history_merges_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let base = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();

        insert_transaction_at(&db, "user-1", RewardDelta::Noncashable(10), base).await?;
        insert_conversion_at(
            &db,
            "user-1",
            RewardType::Noncashable,
            RewardType::Cashable,
            5.0,
            5,
            base + TimeDelta::hours(1),
        )
        .await?;
        insert_transaction_at(
            &db,
            "user-1",
            RewardDelta::Noncashable(20),
            base + TimeDelta::hours(2),
        )
        .await?;
        insert_transaction_at(&db, "user-2", RewardDelta::Noncashable(99), base).await?;

        let history = detail_history(&db, "user-1", None, HistoryFilter::default()).await?;
        let kinds: Vec<RecordType> = history.iter().map(HistoryEntry::record_type).collect();
        assert_eq!(
            kinds,
            vec![
                RecordType::PatientReward,
                RecordType::Conversion,
                RecordType::PatientReward
            ]
        );
        assert!(
            history
                .windows(2)
                .all(|pair| pair[0].created_date() >= pair[1].created_date())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_detail_history_window_includes_end_of_day() -> Result<()> {
        let db = setup_test_db().await?;
        let end_of_day = Utc.with_ymd_and_hms(2026, 3, 10, 23, 59, 59).unwrap();
        let next_day = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap()
            + TimeDelta::microseconds(1);

        insert_transaction_at(&db, "user-1", RewardDelta::Noncashable(1), end_of_day).await?;
        insert_transaction_at(&db, "user-1", RewardDelta::Noncashable(2), next_day).await?;

        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        )?;
        let history = detail_history(&db, "user-1", Some(window), HistoryFilter::default()).await?;

        assert_eq!(history.len(), 1);
        let HistoryEntry::PatientReward(transaction) = &history[0] else {
            panic!("expected a reward transaction");
        };
        assert_eq!(transaction.amount_changed, 1);
        Ok(())
    }

    #[test]
    fn test_record_type_names() {
        assert_eq!(RecordType::PatientReward.to_string(), "PatientReward");
        assert_eq!(RecordType::Conversion.as_str(), "Conversion");
    }
}

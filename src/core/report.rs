//! Report formatting for reward summaries and history.
//!
//! This module turns the structured data from [`crate::core::summary`] into display
//! lines. All functions are framework-agnostic; the bot layer decides where the
//! lines go.

use crate::{
    core::{
        balance::RewardDelta,
        summary::{BucketBalance, HistoryEntry, RewardSummary},
    },
    entities::RewardType,
};

/// Formats a bucket amount with its unit.
///
/// Point buckets show whole points (`"+10 pts"`), money shows two decimals
/// (`"-$2.50"`).
#[must_use]
pub fn format_bucket_amount(bucket: RewardType, amount: f64, signed: bool) -> String {
    let sign = match (signed, amount < 0.0) {
        (_, true) => "-",
        (true, false) => "+",
        (false, false) => "",
    };
    let magnitude = amount.abs();
    match bucket {
        RewardType::Money => format!("{sign}${magnitude:.2}"),
        RewardType::Noncashable | RewardType::Cashable => format!("{sign}{magnitude:.0} pts"),
    }
}

/// Formats a signed change to one bucket.
#[must_use]
pub fn format_points_change(delta: RewardDelta) -> String {
    format_bucket_amount(delta.reward_type(), delta.amount(), true)
}

/// One line of the balance breakdown, e.g.
/// `"noncashable: 70 pts (earned 100 pts, converted in 0 pts, converted out 30 pts)"`.
#[must_use]
pub fn format_bucket_line(bucket: RewardType, balance: &BucketBalance) -> String {
    format!(
        "{}: {} (earned {}, converted in {}, converted out {})",
        bucket.label(),
        format_bucket_amount(bucket, balance.final_balance, false),
        format_bucket_amount(bucket, balance.initial, false),
        format_bucket_amount(bucket, balance.converted_to, false),
        format_bucket_amount(bucket, balance.deducted_from, false),
    )
}

/// Display lines for a summary: one per bucket, then totals and badge.
#[must_use]
pub fn format_summary_lines(summary: &RewardSummary) -> Vec<String> {
    let mut lines: Vec<String> = RewardType::ALL
        .into_iter()
        .map(|bucket| format_bucket_line(bucket, summary.balances.get(bucket)))
        .collect();

    lines.push(format!(
        "Total earned: {} pts | Total consumed: {:.0} pts",
        summary.total_earned_points, summary.total_consumed_points
    ));
    lines.push(format!(
        "{} transaction(s), {} conversion(s)",
        summary.transaction_count, summary.conversion_count
    ));
    if let Some(badge) = &summary.current_badge {
        lines.push(format!(
            "Current badge: {} (since {})",
            badge.badge_name,
            badge.earned_date.format("%Y-%m-%d")
        ));
    }
    lines
}

/// One line per history row, e.g.
/// `"2026-03-10 12:00 | PatientReward | +10 pts | noncashable"`.
#[must_use]
pub fn format_history_entry(entry: &HistoryEntry) -> String {
    let when = entry.created_date().format("%Y-%m-%d %H:%M");
    let kind = entry.record_type();
    match entry {
        HistoryEntry::PatientReward(transaction) => {
            let delta = RewardDelta::from_transaction(transaction);
            let remarks = transaction
                .remarks
                .as_deref()
                .map(|r| format!(" | {r}"))
                .unwrap_or_default();
            format!(
                "{when} | {kind} | {} | {}{remarks}",
                format_points_change(delta),
                transaction.reward_type.label()
            )
        }
        HistoryEntry::Conversion(conversion) => format!(
            "{when} | {kind} | {} {} -> {} {}",
            format_bucket_amount(conversion.from_type, -conversion.amount, true),
            conversion.from_type.label(),
            format_bucket_amount(
                conversion.to_type,
                f64::from(conversion.converted_points),
                true
            ),
            conversion.to_type.label(),
        ),
    }
}

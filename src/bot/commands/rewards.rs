//! Reward Discord commands - `rewards`, `reward_history` and `convert_points`.
//!
//! These commands act on the invoking user's ledger. The ledger itself accepts any
//! conversion; the sufficiency and same-bucket checks live here, at the edge.

use crate::{
    core::summary::DateWindow,
    entities::{RewardBalanceModel, RewardType},
    errors::{Error, Result},
};
use chrono::NaiveDate;

/// Most history rows shown in one reply.
const HISTORY_LIMIT: usize = 15;

fn parse_day(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("'{value}' is not a date (expected YYYY-MM-DD)")))
}

/// Builds the history window from optional bounds. A missing bound is open-ended.
fn history_window(start: Option<&str>, end: Option<&str>) -> Result<Option<DateWindow>> {
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    let start = start.map(parse_day).transpose()?.unwrap_or(NaiveDate::MIN);
    let end = end.map(parse_day).transpose()?.unwrap_or(NaiveDate::MAX);
    DateWindow::new(start, end).map(Some)
}

/// Why a conversion request is refused before it reaches the ledger.
fn conversion_refusal(
    from: RewardType,
    to: RewardType,
    amount: i32,
    balance: Option<&RewardBalanceModel>,
) -> Option<String> {
    if amount <= 0 {
        return Some("❌ Invalid amount: must be greater than zero".to_string());
    }
    if from == to {
        return Some(format!("❌ Cannot convert {from} points into themselves"));
    }

    let available = balance.map_or(0.0, |b| match from {
        RewardType::Noncashable => b.non_cashable,
        RewardType::Cashable => b.cashable,
        RewardType::Money => b.money,
    });
    if available < f64::from(amount) {
        return Some(format!(
            "❌ Insufficient {from} balance: you have {available:.0}, but tried to convert {amount}"
        ));
    }
    None
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::{HISTORY_LIMIT, conversion_refusal, history_window};
    use crate::{
        bot::{BotData, handlers::autocomplete},
        core::{
            balance, conversion,
            conversion::NewConversion,
            report, summary,
            summary::HistoryFilter,
        },
        entities::RewardType,
        errors::{Error, Result},
    };
    use tracing::info;

    /// Shows your reward balances, totals and current badge.
    #[poise::command(slash_command, prefix_command)]
    pub async fn rewards(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Only count postings for this patient"] patient_id: Option<i64>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        let Some(summary) = summary::summary_for_user(db, &user_id, patient_id).await? else {
            ctx.say("You have no reward activity yet.").await?;
            return Ok(());
        };

        let mut reply = String::from("**Your rewards**\n");
        for line in report::format_summary_lines(&summary) {
            reply.push_str(&line);
            reply.push('\n');
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Lists your reward postings and conversions, newest first.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reward_history(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "First day to include (YYYY-MM-DD)"] start: Option<String>,
        #[description = "Last day to include (YYYY-MM-DD)"] end: Option<String>,
        #[description = "Show earned points"] earned: Option<bool>,
        #[description = "Show consumed points and conversions"] consumed: Option<bool>,
    ) -> Result<()> {
        let window = match history_window(start.as_deref(), end.as_deref()) {
            Ok(window) => window,
            Err(e) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };
        let filter = HistoryFilter {
            earned: earned.unwrap_or(false),
            consumed: consumed.unwrap_or(false),
        };

        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();
        let history = summary::detail_history(db, &user_id, window, filter).await?;

        if history.is_empty() {
            ctx.say("No reward history found.").await?;
            return Ok(());
        }

        let mut reply = format!("**Reward history** ({} entries)\n", history.len());
        for entry in history.iter().take(HISTORY_LIMIT) {
            reply.push_str(&report::format_history_entry(entry));
            reply.push('\n');
        }
        if history.len() > HISTORY_LIMIT {
            reply.push_str(&format!(
                "…and {} more. Narrow the dates to see them.",
                history.len() - HISTORY_LIMIT
            ));
        }
        ctx.say(reply).await?;
        Ok(())
    }

    /// Converts points from one bucket to another, one for one.
    #[poise::command(slash_command, prefix_command)]
    pub async fn convert_points(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Bucket to convert from"]
        #[autocomplete = "autocomplete::autocomplete_reward_type"]
        from: String,
        #[description = "Bucket to convert into"]
        #[autocomplete = "autocomplete::autocomplete_reward_type"]
        to: String,
        #[description = "Amount to convert"] amount: i32,
    ) -> Result<()> {
        let (from_type, to_type) = match (from.parse::<RewardType>(), to.parse::<RewardType>()) {
            (Ok(from_type), Ok(to_type)) => (from_type, to_type),
            (Err(e), _) | (_, Err(e)) => {
                ctx.say(format!("❌ {e}")).await?;
                return Ok(());
            }
        };

        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();
        // Advisory only: read outside the conversion's transaction, so two concurrent
        // requests can both pass. The ledger accepts the overdraw either way.
        let current = balance::get_balance(db, &user_id).await?;

        if let Some(refusal) = conversion_refusal(from_type, to_type, amount, current.as_ref()) {
            ctx.say(refusal).await?;
            return Ok(());
        }

        let created = conversion::create_conversion(
            db,
            NewConversion::one_to_one(user_id.clone(), from_type, to_type, amount),
        )
        .await?;
        info!(%user_id, conversion_id = created.id, "Converted points from chat");

        ctx.say(format!(
            "✅ Converted {amount} {from_type} into {} {to_type} (Conversion ID: {})",
            created.converted_points, created.id
        ))
        .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

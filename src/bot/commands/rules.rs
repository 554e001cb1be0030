//! Reward rule Discord commands - `reward_rules`.

use crate::entities::RewardRuleModel;

/// Embed field for one rule: `(title, body, inline)`.
fn rule_field(rule: &RewardRuleModel) -> (String, String, bool) {
    let (verb, sign) = if rule.is_deductible {
        ("Consumes", "-")
    } else {
        ("Earns", "+")
    };
    let mut body = format!("{verb} {sign}{} pts", rule.points);
    if rule.is_idempotent {
        body.push_str(" · once per prescription");
    }
    (
        format!("{} ({})", rule.activity_name, rule.activity_code),
        body,
        false,
    )
}

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use super::rule_field;
    use crate::{
        bot::BotData,
        core::reward_rule,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;

    /// Lists the active reward rules and what each activity is worth.
    #[poise::command(slash_command, prefix_command)]
    pub async fn reward_rules(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let rules = reward_rule::get_all_active_reward_rules(db).await?;

        if rules.is_empty() {
            ctx.say("No reward rules are active.").await?;
            return Ok(());
        }

        // Discord allows at most 25 fields per embed
        let fields: Vec<_> = rules.iter().take(25).map(rule_field).collect();
        let list_embed = serenity::CreateEmbed::default()
            .title("**Reward Rules**")
            .color(0x0058_65F2)
            .fields(fields);

        ctx.send(poise::CreateReply::default().embed(list_embed))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations
//! and provide basic bot functionality and user assistance.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**SmartRx Rewards Help**\n\
        Here is a summary of all available commands.\n\n\
        **Balances**\n\
        • `/rewards [patient_id]` - Shows your balances per bucket, totals and current badge.\n\
        • `/reward_history [start] [end] [earned] [consumed]` - Lists your postings and conversions, newest first. Dates are `YYYY-MM-DD` and inclusive.\n\n\
        **Conversions**\n\
        • `/convert_points <from> <to> <amount>` - Moves points between non-cashable, cashable and money.\n\n\
        **Catalog**\n\
        • `/reward_rules` - Lists the active reward rules.\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;

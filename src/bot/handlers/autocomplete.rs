//! Autocomplete handlers for Discord slash command parameters.

use crate::{bot::BotData, entities::RewardType, errors::Error};

/// Provides autocomplete suggestions for reward bucket names.
///
/// Returns the labels that parse back into a [`RewardType`] and contain the
/// partial input (case-insensitive).
pub async fn autocomplete_reward_type(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    matching_reward_types(partial)
}

fn matching_reward_types(partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();

    RewardType::ALL
        .into_iter()
        .map(RewardType::label)
        .filter(|label| label.contains(&partial_lower))
        .map(str::to_string)
        .collect()
}

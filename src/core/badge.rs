//! User badges - Storage and lookup of earned badges.
//!
//! Deciding when a badge is earned is someone else's job; this module records the
//! award and answers "which badge is current" for the summary.

use crate::{
    entities::{UserRewardBadge, user_reward_badge},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Records that `user_id` earned `badge_name` at `earned_date`.
pub async fn award_badge(
    db: &DatabaseConnection,
    user_id: &str,
    badge_name: &str,
    earned_date: DateTimeUtc,
) -> Result<user_reward_badge::Model> {
    if badge_name.trim().is_empty() {
        return Err(Error::validation("Badge name cannot be empty"));
    }

    let badge = user_reward_badge::ActiveModel {
        user_id: Set(user_id.to_string()),
        badge_name: Set(badge_name.trim().to_string()),
        earned_date: Set(earned_date),
        created_date: Set(chrono::Utc::now()),
        ..Default::default()
    };
    badge
        .insert(db)
        .await
        .map_err(Error::persistence("Failed to award badge"))
}

/// The user's most recently earned badge (ties broken by write time, then id).
pub async fn get_current_badge(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Option<user_reward_badge::Model>> {
    UserRewardBadge::find()
        .filter(user_reward_badge::Column::UserId.eq(user_id))
        .order_by_desc(user_reward_badge::Column::EarnedDate)
        .order_by_desc(user_reward_badge::Column::CreatedDate)
        .order_by_desc(user_reward_badge::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

//! Reward rule catalog - Maps activities to point values.
//!
//! Activity lookups are case-insensitive and only consider active rules. A missing
//! rule is never an error: callers treat `None` as "no reward applies". The
//! `is_activity_*_exists` checks are advisory; the unique indexes on the table are
//! the final word when two admins race to create the same rule.

use crate::{
    config::rewards::RewardRuleConfig,
    entities::{RewardRule, reward_rule},
    errors::{Error, Result},
};
use sea_orm::{
    PaginatorTrait, QueryOrder, Set,
    prelude::*,
    sea_query::{Expr, Func, SimpleExpr},
};
use tracing::{info, instrument};

/// Activity whose repeats for the same prescription are always ignored.
pub const DELETE_PRESCRIPTION_ACTIVITY: &str = "DELETE_PRESCRIPTION";

/// How many sequence numbers to try before giving up on a free activity code.
const MAX_CODE_ATTEMPTS: u64 = 100;

/// Source of activity codes for new rules.
pub trait CodeGenerator: Send + Sync {
    /// Produces the code for the given 1-based sequence number.
    fn generate(&self, sequence: u64) -> String;
}

/// Generates codes like `RR-0007`.
#[derive(Debug, Clone)]
pub struct PrefixedCodeGenerator {
    prefix: String,
}

impl PrefixedCodeGenerator {
    /// Creates a generator that prepends `prefix` to a zero-padded sequence number.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for PrefixedCodeGenerator {
    fn default() -> Self {
        Self::new("RR")
    }
}

impl CodeGenerator for PrefixedCodeGenerator {
    fn generate(&self, sequence: u64) -> String {
        format!("{}-{sequence:04}", self.prefix)
    }
}

/// Editable fields of a reward rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRuleInput {
    /// Activity name the rule matches
    pub activity_name: String,
    /// Points per occurrence
    pub points: i32,
    /// Whether the activity consumes points
    pub is_deductible: bool,
    /// Ignored on create (new rules are always active)
    pub is_active: bool,
    /// Whether repeats for the same prescription are ignored
    pub is_idempotent: bool,
}

impl From<&RewardRuleConfig> for RewardRuleInput {
    fn from(config: &RewardRuleConfig) -> Self {
        Self {
            activity_name: config.activity_name.clone(),
            points: config.points,
            is_deductible: config.is_deductible,
            is_active: true,
            is_idempotent: config.is_idempotent,
        }
    }
}

/// Whether a rule with this name and flag deduplicates repeats.
#[must_use]
pub fn resolve_idempotent(activity_name: &str, requested: bool) -> bool {
    requested
        || activity_name
            .trim()
            .eq_ignore_ascii_case(DELETE_PRESCRIPTION_ACTIVITY)
}

fn activity_name_matches(name: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(reward_rule::Column::ActivityName)))
        .eq(name.trim().to_lowercase())
}

fn validate_input(input: &RewardRuleInput) -> Result<()> {
    if input.activity_name.trim().is_empty() {
        return Err(Error::validation("Activity name cannot be empty"));
    }
    if input.points < 0 {
        return Err(Error::validation(format!(
            "Points must not be negative (got {})",
            input.points
        )));
    }
    Ok(())
}

/// Finds the active rule for an activity, ignoring case.
pub async fn get_reward_rule_by_activity_name(
    db: &DatabaseConnection,
    activity_name: &str,
) -> Result<Option<reward_rule::Model>> {
    RewardRule::find()
        .filter(activity_name_matches(activity_name))
        .filter(reward_rule::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a rule by primary key, active or not.
pub async fn get_reward_rule_by_id(
    db: &DatabaseConnection,
    rule_id: i64,
) -> Result<Option<reward_rule::Model>> {
    RewardRule::find_by_id(rule_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all active rules ordered by activity name.
pub async fn get_all_active_reward_rules(
    db: &DatabaseConnection,
) -> Result<Vec<reward_rule::Model>> {
    RewardRule::find()
        .filter(reward_rule::Column::IsActive.eq(true))
        .order_by_asc(reward_rule::Column::ActivityName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Whether another rule already uses `activity_code`.
pub async fn is_activity_code_exists(
    db: &DatabaseConnection,
    activity_code: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let mut query = RewardRule::find().filter(reward_rule::Column::ActivityCode.eq(activity_code));
    if let Some(id) = exclude_id {
        query = query.filter(reward_rule::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

/// Whether another rule already uses `activity_name` (case-insensitive, active or not).
pub async fn is_activity_name_exists(
    db: &DatabaseConnection,
    activity_name: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let mut query = RewardRule::find().filter(activity_name_matches(activity_name));
    if let Some(id) = exclude_id {
        query = query.filter(reward_rule::Column::Id.ne(id));
    }
    Ok(query.count(db).await? > 0)
}

async fn next_activity_code(
    db: &DatabaseConnection,
    generator: &dyn CodeGenerator,
) -> Result<String> {
    let existing = RewardRule::find().count(db).await?;
    for sequence in existing + 1..=existing + MAX_CODE_ATTEMPTS {
        let code = generator.generate(sequence);
        if !is_activity_code_exists(db, &code, None).await? {
            return Ok(code);
        }
    }
    Err(Error::validation(format!(
        "No free activity code after {MAX_CODE_ATTEMPTS} attempts"
    )))
}

/// Creates a new active rule with a generated activity code.
///
/// Callers are expected to run [`is_activity_name_exists`] first; a duplicate name
/// that slips through is rejected by the unique index as a persistence error.
#[instrument(skip(db, generator))]
pub async fn create_reward_rule(
    db: &DatabaseConnection,
    generator: &dyn CodeGenerator,
    input: RewardRuleInput,
) -> Result<reward_rule::Model> {
    validate_input(&input)?;

    let activity_code = next_activity_code(db, generator).await?;
    let activity_name = input.activity_name.trim().to_string();
    let is_idempotent = resolve_idempotent(&activity_name, input.is_idempotent);

    let rule = reward_rule::ActiveModel {
        activity_code: Set(activity_code),
        activity_name: Set(activity_name),
        points: Set(input.points),
        is_deductible: Set(input.is_deductible),
        is_active: Set(true),
        is_idempotent: Set(is_idempotent),
        created_date: Set(chrono::Utc::now()),
        modified_date: Set(None),
        ..Default::default()
    };

    let created = rule
        .insert(db)
        .await
        .map_err(Error::persistence("Failed to create reward rule"))?;
    info!(
        activity_code = %created.activity_code,
        activity_name = %created.activity_name,
        "Created reward rule"
    );
    Ok(created)
}

/// Replaces every field of a rule except its activity code.
///
/// Returns `None` if the rule does not exist.
#[instrument(skip(db))]
pub async fn update_reward_rule(
    db: &DatabaseConnection,
    rule_id: i64,
    input: RewardRuleInput,
) -> Result<Option<reward_rule::Model>> {
    validate_input(&input)?;

    let Some(existing) = get_reward_rule_by_id(db, rule_id).await? else {
        return Ok(None);
    };

    let activity_name = input.activity_name.trim().to_string();
    let is_idempotent = resolve_idempotent(&activity_name, input.is_idempotent);
    let pinned_code = existing.activity_code.clone();

    let mut rule: reward_rule::ActiveModel = existing.into();
    rule.activity_code = Set(pinned_code);
    rule.activity_name = Set(activity_name);
    rule.points = Set(input.points);
    rule.is_deductible = Set(input.is_deductible);
    rule.is_active = Set(input.is_active);
    rule.is_idempotent = Set(is_idempotent);
    rule.modified_date = Set(Some(chrono::Utc::now()));

    let updated = rule
        .update(db)
        .await
        .map_err(Error::persistence("Failed to update reward rule"))?;
    Ok(Some(updated))
}

/// Soft-deletes a rule so activity lookups stop matching it.
///
/// Returns `None` if the rule does not exist.
pub async fn deactivate_reward_rule(
    db: &DatabaseConnection,
    rule_id: i64,
) -> Result<Option<reward_rule::Model>> {
    let Some(existing) = get_reward_rule_by_id(db, rule_id).await? else {
        return Ok(None);
    };

    let mut rule: reward_rule::ActiveModel = existing.into();
    rule.is_active = Set(false);
    rule.modified_date = Set(Some(chrono::Utc::now()));

    let updated = rule
        .update(db)
        .await
        .map_err(Error::persistence("Failed to deactivate reward rule"))?;
    Ok(Some(updated))
}

/// Creates any configured rules whose activity name is not in the catalog yet.
///
/// Returns the rules that were created.
pub async fn seed_reward_rules(
    db: &DatabaseConnection,
    generator: &dyn CodeGenerator,
    seeds: &[RewardRuleConfig],
) -> Result<Vec<reward_rule::Model>> {
    let mut created = Vec::new();
    for seed in seeds {
        if is_activity_name_exists(db, &seed.activity_name, None).await? {
            tracing::debug!(activity_name = %seed.activity_name, "Reward rule already present");
            continue;
        }
        created.push(create_reward_rule(db, generator, seed.into()).await?);
    }
    info!("Seeded {} reward rule(s)", created.len());
    Ok(created)
}

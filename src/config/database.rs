//! Database configuration module for the rewards ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema (including the unique indexes on
//! `activity_code`, `activity_name` and `idempotency_key`) always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{
    RewardBalance, RewardPointConversion, RewardRule, RewardTransaction, UserRewardBadge,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/smartrx_rewards.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!("Connecting to rewards database");
    debug!(%database_url);

    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all ledger tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, RewardRule).await?;
    create_table(db, &schema, RewardTransaction).await?;
    create_table(db, &schema, RewardPointConversion).await?;
    create_table(db, &schema, UserRewardBadge).await?;
    create_table(db, &schema, RewardBalance).await?;

    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{RewardRuleModel, RewardTransactionModel};
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Every table can be queried
        let _: Vec<RewardRuleModel> = RewardRule::find().limit(1).all(&db).await?;
        let _: Vec<RewardTransactionModel> = RewardTransaction::find().limit(1).all(&db).await?;
        RewardPointConversion::find().limit(1).all(&db).await?;
        UserRewardBadge::find().limit(1).all(&db).await?;
        RewardBalance::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}

use dotenvy::dotenv;
use smartrx_rewards::{
    bot,
    config::{database, rewards},
    core::reward_rule::{self, PrefixedCodeGenerator},
    errors::{Error, Result},
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the reward rule catalog configuration
    let rewards_config = rewards::load_default_config()
        .inspect_err(|e| error!("Failed to load rewards configuration: {e}"))?;
    info!(
        rules = rewards_config.rules.len(),
        "Loaded rewards configuration."
    );

    // 4. Connect and create tables
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {e}"))?;

    // 5. Seed rules that are not in the catalog yet
    let generator = PrefixedCodeGenerator::new(rewards_config.activity_code_prefix.clone());
    reward_rule::seed_reward_rules(&db, &generator, &rewards_config.rules)
        .await
        .inspect(|created| info!(created = created.len(), "Reward rules seeded."))
        .inspect_err(|e| error!("Failed to seed reward rules: {e}"))?;

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {e}"))
        .map_err(Error::EnvVar)?;

    bot::run_bot(token, db).await
}

/// Database configuration and connection management
pub mod database;

/// Reward rule seeding configuration from rewards.toml
pub mod rewards;

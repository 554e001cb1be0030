//! Unified error type for the rewards crate.
//!
//! Missing rules, transactions and conversions are not errors: lookups return
//! `Ok(None)`. Errors are either validation failures caught before anything is
//! written, or persistence failures that are fatal to the current operation.

use sea_orm::DbErr;
use thiserror::Error;

/// Errors produced by the reward ledger and its surfaces.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input rejected before persistence
    #[error("Validation error: {message}")]
    Validation {
        /// What was rejected
        message: String,
    },

    /// A monetary or point amount was negative, NaN or infinite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount
        amount: f64,
    },

    /// A ledger write failed; `context` names the write
    #[error("{context}: {source}")]
    Persistence {
        /// Description of the failed write
        context: String,
        /// Underlying database error
        source: DbErr,
    },

    /// Any other database error
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// Returns a mapper that wraps a [`DbErr`] with a description of the failed write.
    ///
    /// ```ignore
    /// model.insert(&txn).await.map_err(Error::persistence("Failed to insert conversion"))?;
    /// ```
    pub fn persistence(context: &'static str) -> impl FnOnce(DbErr) -> Self {
        move |source| Self::Persistence {
            context: context.to_string(),
            source,
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

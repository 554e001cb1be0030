//! Core business logic - framework-agnostic ledger, conversion and reporting operations.

/// User badge storage
pub mod badge;
/// Per-user balance projection and the single-bucket delta type
pub mod balance;
/// Point conversion ledger
pub mod conversion;
/// Display formatting for summaries and history
pub mod report;
/// Reward rule catalog
pub mod reward_rule;
/// Reward transaction ledger
pub mod reward_transaction;
/// Balance folding and merged history
pub mod summary;

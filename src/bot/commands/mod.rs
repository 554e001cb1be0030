//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// General utility commands
pub mod general;

/// Balance, history and conversion commands
pub mod rewards;

/// Reward rule catalog commands
pub mod rules;

// Export commands
pub use general::*;
pub use rewards::*;
pub use rules::*;

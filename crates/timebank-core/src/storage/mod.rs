//! Persistence layer
//!
//! SQLite-based storage for:
//! - Users, balances and profile skill names
//! - Bearer tokens
//! - Skill listings
//! - Exchange records
//!
//! Stores borrow a `Connection`, so the same store works against a plain
//! connection or inside a transaction from [`Database::immediate`].

use chrono::{DateTime, Utc};

mod database;
mod exchanges;
mod skills;
mod tokens;
mod users;

pub use database::Database;
pub use exchanges::ExchangeStore;
pub use skills::SkillStore;
pub use tokens::TokenStore;
pub use users::{NewUser, ProfileUpdate, User, UserStore};

/// Parse a stored RFC 3339 timestamp, falling back to now for bad rows
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

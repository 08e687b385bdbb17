//! Timebank Core Library
//!
//! Time-credit ledger, exchange lifecycle, skill catalog and storage for the
//! skill-exchange marketplace.

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod exchange;
pub mod ledger;
pub mod paths;
pub mod storage;

pub use accounts::{register, rotate_token, Registration};
pub use catalog::{Category, Difficulty, NewSkill, Skill, SkillFilter};
pub use config::MarketConfig;
pub use error::{MarketError, Result};
pub use exchange::{
    Exchange, ExchangeQuery, ExchangeService, ExchangeStatus, ExchangeUpdate, NewExchange,
    SessionMode, Settlement, SkillRef,
};
pub use ledger::{CreditReason, CreditTransaction, Ledger, RatePolicy, SettlementPolicy};
pub use storage::Database;

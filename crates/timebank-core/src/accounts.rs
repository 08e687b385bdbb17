//! User registration and token rotation

use serde::Serialize;

use crate::config::MarketConfig;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::storage::{Database, NewUser, TokenStore, User, UserStore};

/// A newly registered user and the bearer token handed out once
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: User,
    pub token: String,
}

/// Create a user, mint the configured starting balance and issue a token.
pub fn register(db: &Database, config: &MarketConfig, new_user: &NewUser) -> Result<Registration> {
    db.immediate(|tx| {
        let users = UserStore::new(tx);
        let user = users.create(new_user)?;
        if config.starting_credits > 0 {
            Ledger::new(tx).grant(&user.id, config.starting_credits)?;
        }
        let token = TokenStore::new(tx).issue(&user.id)?;
        Ok(Registration {
            user: users.require(&user.id)?,
            token,
        })
    })
}

/// Revoke every token a user holds and issue a fresh one.
pub fn rotate_token(db: &Database, user_id: &str) -> Result<String> {
    db.immediate(|tx| {
        UserStore::new(tx).require(user_id)?;
        let tokens = TokenStore::new(tx);
        let revoked = tokens.revoke_all(user_id)?;
        tracing::info!(user_id = %user_id, revoked, "Rotated bearer token");
        tokens.issue(user_id)
    })
}

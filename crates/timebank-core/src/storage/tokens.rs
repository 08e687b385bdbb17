//! Bearer token storage
//!
//! Tokens are random 32-byte values, base64url encoded and handed to the
//! client once. Only their SHA-256 digest is stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::error::Result;

pub struct TokenStore<'a> {
    conn: &'a Connection,
}

impl<'a> TokenStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Issue a fresh token for a user and return its plaintext
    pub fn issue(&self, user_id: &str) -> Result<String> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        self.conn.execute(
            "INSERT INTO auth_tokens (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token_hash(&token), user_id, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(user_id = %user_id, "Issued bearer token");
        Ok(token)
    }

    /// Resolve a presented token to its user id
    pub fn resolve(&self, token: &str) -> Result<Option<String>> {
        let user_id = self
            .conn
            .query_row(
                "SELECT user_id FROM auth_tokens WHERE token_hash = ?1",
                [token_hash(token.trim())],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }

    /// Revoke every token of a user, returning how many were removed
    pub fn revoke_all(&self, user_id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM auth_tokens WHERE user_id = ?1", [user_id])?;
        Ok(removed)
    }
}

fn token_hash(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::storage::{Database, NewUser, UserStore};

    #[test]
    fn test_issue_resolve_revoke() {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("test.db")).unwrap();
        let user = UserStore::new(db.conn())
            .create(&NewUser {
                username: "ola".to_string(),
                email: "ola@example.com".to_string(),
                hourly_rate: None,
            })
            .unwrap();

        let store = TokenStore::new(db.conn());
        let token = store.issue(&user.id).unwrap();
        assert_eq!(token.len(), 43);
        assert_eq!(store.resolve(&token).unwrap(), Some(user.id.clone()));
        assert_eq!(store.resolve("not-a-token").unwrap(), None);

        // Plaintext never hits the table
        let stored: String = db
            .conn()
            .query_row("SELECT token_hash FROM auth_tokens", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, token);
        assert_eq!(stored.len(), 64);

        assert_eq!(store.revoke_all(&user.id).unwrap(), 1);
        assert_eq!(store.resolve(&token).unwrap(), None);
    }
}

//! Time-credit ledger
//!
//! Every balance change goes through [`Ledger`], which operates on a
//! connection that is already inside a `BEGIN IMMEDIATE` transaction (see
//! [`Database::immediate`](crate::storage::Database::immediate)). Each user
//! row carries a `version` counter; writes are compare-and-swap against the
//! version read in the same transaction, and a mismatch surfaces as
//! [`MarketError::ConcurrentUpdateConflict`] with nothing applied.
//!
//! Every movement is journaled in `credit_transactions`.

mod policy;

pub use policy::{RatePolicy, SettlementPolicy};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MarketError, Result};
use crate::storage::parse_timestamp;

/// Why credits moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditReason {
    /// Credits minted into a balance (registration, admin top-up)
    Grant,
    /// Direct seeker → provider payment for a booking
    Booking,
    /// Seeker → escrow when a request is created
    EscrowHold,
    /// Escrow → provider when an exchange completes
    EscrowRelease,
    /// Reversal back to the seeker on cancellation
    Refund,
}

impl CreditReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditReason::Grant => "grant",
            CreditReason::Booking => "booking",
            CreditReason::EscrowHold => "escrow_hold",
            CreditReason::EscrowRelease => "escrow_release",
            CreditReason::Refund => "refund",
        }
    }
}

impl fmt::Display for CreditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditReason {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grant" => Ok(CreditReason::Grant),
            "booking" => Ok(CreditReason::Booking),
            "escrow_hold" => Ok(CreditReason::EscrowHold),
            "escrow_release" => Ok(CreditReason::EscrowRelease),
            "refund" => Ok(CreditReason::Refund),
            other => Err(MarketError::validation(format!(
                "unknown credit reason '{}'",
                other
            ))),
        }
    }
}

/// One journaled credit movement. A `None` side is the mint or the escrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: String,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub amount: i64,
    pub reason: CreditReason,
    pub exchange_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Balance operations against a transactional connection
pub struct Ledger<'a> {
    conn: &'a Connection,
}

impl<'a> Ledger<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Current balance of a user
    pub fn balance(&self, user_id: &str) -> Result<i64> {
        Ok(self.account(user_id)?.0)
    }

    /// Move `amount` from one user to another.
    ///
    /// Both rows are updated or neither is; the source may not go negative.
    pub fn transfer(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        amount: i64,
        reason: CreditReason,
        exchange_id: Option<&str>,
    ) -> Result<CreditTransaction> {
        check_amount(amount)?;
        if from_user_id == to_user_id {
            return Err(MarketError::validation(
                "cannot transfer credits to the same user",
            ));
        }

        // Rows are always read in canonical id order.
        let (first, second) = if from_user_id < to_user_id {
            (from_user_id, to_user_id)
        } else {
            (to_user_id, from_user_id)
        };
        let first_account = self.account(first)?;
        let second_account = self.account(second)?;
        let (from_account, to_account) = if first == from_user_id {
            (first_account, second_account)
        } else {
            (second_account, first_account)
        };

        ensure_funds(from_user_id, from_account.0, amount)?;
        let credited = to_account
            .0
            .checked_add(amount)
            .ok_or_else(|| MarketError::validation("credit balance overflow"))?;

        self.write_balance(from_user_id, from_account, from_account.0 - amount)?;
        self.write_balance(to_user_id, to_account, credited)?;

        let entry = self.journal(
            Some(from_user_id),
            Some(to_user_id),
            amount,
            reason,
            exchange_id,
        )?;
        tracing::info!(
            from = %from_user_id,
            to = %to_user_id,
            amount,
            reason = %reason,
            exchange_id = ?exchange_id,
            "Transferred credits"
        );
        Ok(entry)
    }

    /// Mint credits into a balance
    pub fn grant(&self, user_id: &str, amount: i64) -> Result<CreditTransaction> {
        self.credit(user_id, amount, CreditReason::Grant, None)
    }

    /// Debit a seeker into escrow for an exchange
    pub fn hold(&self, user_id: &str, amount: i64, exchange_id: &str) -> Result<CreditTransaction> {
        check_amount(amount)?;
        let account = self.account(user_id)?;
        ensure_funds(user_id, account.0, amount)?;
        self.write_balance(user_id, account, account.0 - amount)?;

        let entry = self.journal(
            Some(user_id),
            None,
            amount,
            CreditReason::EscrowHold,
            Some(exchange_id),
        )?;
        tracing::info!(user = %user_id, amount, exchange_id = %exchange_id, "Held credits in escrow");
        Ok(entry)
    }

    /// Pay escrowed credits out to a user (provider on completion, seeker on cancel)
    pub fn release(
        &self,
        user_id: &str,
        amount: i64,
        reason: CreditReason,
        exchange_id: &str,
    ) -> Result<CreditTransaction> {
        self.credit(user_id, amount, reason, Some(exchange_id))
    }

    /// Journal entries touching a user, newest first
    pub fn history(&self, user_id: &str) -> Result<Vec<CreditTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, from_user_id, to_user_id, amount, reason, exchange_id, created_at
             FROM credit_transactions
             WHERE from_user_id = ?1 OR to_user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(
                |(id, from_user_id, to_user_id, amount, reason, exchange_id, created_at)| {
                    Ok(CreditTransaction {
                        id,
                        from_user_id,
                        to_user_id,
                        amount,
                        reason: reason.parse()?,
                        exchange_id,
                        created_at: parse_timestamp(&created_at),
                    })
                },
            )
            .collect()
    }

    fn credit(
        &self,
        user_id: &str,
        amount: i64,
        reason: CreditReason,
        exchange_id: Option<&str>,
    ) -> Result<CreditTransaction> {
        check_amount(amount)?;
        let account = self.account(user_id)?;
        let credited = account
            .0
            .checked_add(amount)
            .ok_or_else(|| MarketError::validation("credit balance overflow"))?;
        self.write_balance(user_id, account, credited)?;

        let entry = self.journal(None, Some(user_id), amount, reason, exchange_id)?;
        tracing::info!(user = %user_id, amount, reason = %reason, "Credited account");
        Ok(entry)
    }

    /// (credits, version)
    fn account(&self, user_id: &str) -> Result<(i64, i64)> {
        self.conn
            .query_row(
                "SELECT credits, version FROM users WHERE id = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| MarketError::not_found("user", user_id))
    }

    fn write_balance(&self, user_id: &str, seen: (i64, i64), credits: i64) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE users SET credits = ?1, version = version + 1
             WHERE id = ?2 AND version = ?3",
            params![credits, user_id, seen.1],
        )?;
        if updated == 0 {
            tracing::warn!(user = %user_id, version = seen.1, "Balance version moved underneath us");
            return Err(MarketError::ConcurrentUpdateConflict(format!(
                "balance of user {}",
                user_id
            )));
        }
        Ok(())
    }

    fn journal(
        &self,
        from_user_id: Option<&str>,
        to_user_id: Option<&str>,
        amount: i64,
        reason: CreditReason,
        exchange_id: Option<&str>,
    ) -> Result<CreditTransaction> {
        let entry = CreditTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            from_user_id: from_user_id.map(str::to_string),
            to_user_id: to_user_id.map(str::to_string),
            amount,
            reason,
            exchange_id: exchange_id.map(str::to_string),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO credit_transactions
                (id, from_user_id, to_user_id, amount, reason, exchange_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.from_user_id,
                entry.to_user_id,
                entry.amount,
                entry.reason.as_str(),
                entry.exchange_id,
                entry.created_at.to_rfc3339()
            ],
        )?;
        Ok(entry)
    }
}

fn check_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(MarketError::validation(format!(
            "credit amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

fn ensure_funds(user_id: &str, available: i64, needed: i64) -> Result<()> {
    if available < needed {
        return Err(MarketError::InsufficientCredits {
            user_id: user_id.to_string(),
            needed,
            available,
        });
    }
    Ok(())
}

//! Exchange/booking requests
//!
//! An exchange is a seeker's request for hours of a provider's time. Its
//! lifecycle:
//!
//! ```text
//! pending ──► accepted ──► completed
//!    │            │
//!    └────────────┴──► cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal. Credits move according to the
//! configured [`SettlementPolicy`](crate::ledger::SettlementPolicy); the
//! [`Settlement`] field records where the cost currently sits so every
//! movement happens exactly once.

mod service;

pub use service::{ExchangeQuery, ExchangeService};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::market::{MAX_RATING, MIN_RATING};
use crate::error::{MarketError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl ExchangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Completed => "completed",
            ExchangeStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: ExchangeStatus) -> bool {
        use ExchangeStatus::*;
        matches!(
            (self, next),
            (Pending, Accepted) | (Accepted, Completed) | (Pending, Cancelled) | (Accepted, Cancelled)
        )
    }

    pub fn check_transition(&self, next: ExchangeStatus) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(MarketError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ExchangeStatus::Pending),
            "accepted" => Ok(ExchangeStatus::Accepted),
            "completed" => Ok(ExchangeStatus::Completed),
            "cancelled" | "canceled" => Ok(ExchangeStatus::Cancelled),
            other => Err(MarketError::validation(format!(
                "unknown exchange status '{}'",
                other
            ))),
        }
    }
}

/// Where an exchange's cost currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    /// Nothing moved (zero-cost exchange)
    None,
    /// Paid to the provider
    Provider,
    /// Debited from the seeker, not yet paid out
    Escrow,
    /// Returned to the seeker
    Refunded,
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Settlement::None => "none",
            Settlement::Provider => "provider",
            Settlement::Escrow => "escrow",
            Settlement::Refunded => "refunded",
        }
    }
}

impl FromStr for Settlement {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Settlement::None),
            "provider" => Ok(Settlement::Provider),
            "escrow" => Ok(Settlement::Escrow),
            "refunded" => Ok(Settlement::Refunded),
            other => Err(MarketError::validation(format!(
                "unknown settlement '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    #[default]
    Online,
    InPerson,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Online => "online",
            SessionMode::InPerson => "in-person",
        }
    }
}

impl FromStr for SessionMode {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "online" => Ok(SessionMode::Online),
            "in-person" => Ok(SessionMode::InPerson),
            other => Err(MarketError::validation(format!("unknown mode '{}'", other))),
        }
    }
}

/// What is being exchanged: a listed skill or a free-text label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillRef {
    Listed(String),
    Label(String),
}

impl SkillRef {
    /// Resolve the `skillId` / `skill` pair sent by clients
    pub fn from_parts(skill_id: Option<String>, label: Option<String>) -> Result<Self> {
        let skill_id = skill_id.filter(|s| !s.trim().is_empty());
        let label = label.filter(|s| !s.trim().is_empty());
        match (skill_id, label) {
            (Some(id), None) => Ok(SkillRef::Listed(id)),
            (None, Some(label)) => Ok(SkillRef::Label(label.trim().to_string())),
            (Some(_), Some(_)) => Err(MarketError::validation(
                "provide either skillId or skill, not both",
            )),
            (None, None) => Err(MarketError::validation("skillId or skill is required")),
        }
    }
}

/// Which side of an exchange a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Provider,
    Seeker,
}

/// A value each party may contribute once (ratings, reviews)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerParty<T> {
    pub provider: Option<T>,
    pub seeker: Option<T>,
}

impl<T> PerParty<T> {
    pub fn slot_mut(&mut self, party: Party) -> &mut Option<T> {
        match party {
            Party::Provider => &mut self.provider,
            Party::Seeker => &mut self.seeker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub id: String,
    pub provider_id: String,
    pub seeker_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(rename = "skill", skip_serializing_if = "Option::is_none")]
    pub skill_label: Option<String>,
    pub status: ExchangeStatus,
    pub duration: i64,
    pub cost: i64,
    pub settlement: Settlement,
    pub scheduled_date: DateTime<Utc>,
    pub mode: SessionMode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    /// Ratings keyed by the party who gave them
    pub rating: PerParty<u8>,
    /// Reviews keyed by the party who wrote them
    pub reviews: PerParty<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exchange {
    pub fn party(&self, user_id: &str) -> Option<Party> {
        if self.provider_id == user_id {
            Some(Party::Provider)
        } else if self.seeker_id == user_id {
            Some(Party::Seeker)
        } else {
            None
        }
    }

    /// Strip what only the two parties should read: the request message,
    /// completion notes and reviews. Ratings stay visible.
    pub fn redact_private(&mut self) {
        self.message.clear();
        self.completion_notes = None;
        self.reviews = PerParty::default();
    }
}

/// A seeker's request
#[derive(Debug, Clone)]
pub struct NewExchange {
    pub provider_id: String,
    pub seeker_id: String,
    pub skill: SkillRef,
    pub duration: i64,
    pub scheduled_date: DateTime<Utc>,
    pub message: String,
    pub mode: SessionMode,
}

/// Changes a party applies to an exchange
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeUpdate {
    pub status: Option<ExchangeStatus>,
    pub completion_notes: Option<String>,
    pub rating: Option<u8>,
    pub review: Option<String>,
}

impl ExchangeUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.completion_notes.is_none()
            && self.rating.is_none()
            && self.review.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(MarketError::validation(
                "at least one of status, completionNotes, rating or review must be provided",
            ));
        }
        if let Some(rating) = self.rating {
            if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                return Err(MarketError::validation(format!(
                    "rating must be between {} and {}",
                    MIN_RATING, MAX_RATING
                )));
            }
        }
        Ok(())
    }
}

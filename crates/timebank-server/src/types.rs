//! API request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use timebank_core::storage::User;
use timebank_core::{ExchangeStatus, MarketError, SessionMode};

// ============================================================================
// Users
// ============================================================================

/// Public view of another user's profile
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    pub hourly_rate: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            skills: user.skills,
            bio: user.bio,
            location: user.location,
            availability: user.availability,
            hourly_rate: user.hourly_rate,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddSkillNameRequest {
    pub name: String,
}

// ============================================================================
// Skills
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub provider_id: Option<String>,
}

// ============================================================================
// Exchanges
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExchangeRequest {
    pub provider_id: String,
    /// Must equal the caller when present
    pub seeker_id: Option<String>,
    pub skill_id: Option<String>,
    pub skill: Option<String>,
    pub duration: i64,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub mode: Option<SessionMode>,
}

/// Whose exchanges to list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeScope {
    #[default]
    Mine,
    All,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExchangeListQuery {
    #[serde(default)]
    pub scope: ExchangeScope,
    pub status: Option<String>,
}

impl ExchangeListQuery {
    /// Parse the status filter; empty or `all` means any status
    pub fn status(&self) -> Result<Option<ExchangeStatus>, MarketError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

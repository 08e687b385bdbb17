//! Pricing and settlement policies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::exchange::Settlement;

/// How many credits one hour costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// One hour taught is one credit, whatever the skill
    #[default]
    Flat,
    /// The provider's posted hourly rate
    ProviderRate,
}

impl RatePolicy {
    /// `rate × hours`, or `None` on overflow
    pub fn cost(&self, provider_hourly_rate: i64, duration_hours: i64) -> Option<i64> {
        let rate = match self {
            RatePolicy::Flat => 1,
            RatePolicy::ProviderRate => provider_hourly_rate,
        };
        rate.checked_mul(duration_hours)
    }
}

impl fmt::Display for RatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatePolicy::Flat => write!(f, "flat"),
            RatePolicy::ProviderRate => write!(f, "provider_rate"),
        }
    }
}

impl FromStr for RatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(RatePolicy::Flat),
            "provider_rate" | "provider" => Ok(RatePolicy::ProviderRate),
            other => Err(format!("unknown rate policy '{}'", other)),
        }
    }
}

/// When the seeker's credits reach the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Paid to the provider when the request is created; refunded on cancel
    #[default]
    OnRequest,
    /// Held in escrow at creation; paid out on completion, returned on cancel
    OnCompletion,
}

impl SettlementPolicy {
    /// Where the cost sits right after a request is created
    pub fn initial_settlement(&self, cost: i64) -> Settlement {
        if cost == 0 {
            return Settlement::None;
        }
        match self {
            SettlementPolicy::OnRequest => Settlement::Provider,
            SettlementPolicy::OnCompletion => Settlement::Escrow,
        }
    }
}

impl fmt::Display for SettlementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementPolicy::OnRequest => write!(f, "on_request"),
            SettlementPolicy::OnCompletion => write!(f, "on_completion"),
        }
    }
}

impl FromStr for SettlementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on_request" | "request" => Ok(SettlementPolicy::OnRequest),
            "on_completion" | "completion" | "escrow" => Ok(SettlementPolicy::OnCompletion),
            other => Err(format!("unknown settlement policy '{}'", other)),
        }
    }
}

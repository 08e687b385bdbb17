//! Exchange lifecycle service
//!
//! Each operation runs as one `BEGIN IMMEDIATE` transaction covering the
//! exchange row and every balance it touches.

use rusqlite::Connection;

use super::{
    Exchange, ExchangeStatus, ExchangeUpdate, NewExchange, Party, Settlement, SkillRef,
};
use crate::config::MarketConfig;
use crate::error::{MarketError, Result};
use crate::ledger::{CreditReason, Ledger};
use crate::storage::{Database, ExchangeStore, SkillStore, UserStore};

/// Which exchanges to list
#[derive(Debug, Clone, Default)]
pub struct ExchangeQuery {
    /// Only exchanges this user is a party to
    pub party: Option<String>,
    pub status: Option<ExchangeStatus>,
    /// Who is looking. Exchanges they are not a party to come back
    /// redacted; `None` lists everything in full.
    pub viewer: Option<String>,
}

pub struct ExchangeService<'a> {
    db: &'a Database,
    config: &'a MarketConfig,
}

impl<'a> ExchangeService<'a> {
    pub fn new(db: &'a Database, config: &'a MarketConfig) -> Self {
        Self { db, config }
    }

    /// Create a pending request and apply the opening settlement movement
    pub fn create(&self, request: NewExchange) -> Result<Exchange> {
        if request.duration < 1 {
            return Err(MarketError::InvalidDuration {
                requested: request.duration,
                reason: "at least one hour is required".to_string(),
            });
        }
        if request.seeker_id == request.provider_id {
            return Err(MarketError::validation(
                "cannot request an exchange with yourself",
            ));
        }

        let exchange = self.db.immediate(|tx| {
            let users = UserStore::new(tx);
            let seeker = users.require(&request.seeker_id)?;
            let provider = users.require(&request.provider_id)?;

            if let SkillRef::Listed(skill_id) = &request.skill {
                let skill = SkillStore::new(tx).require(skill_id)?;
                if skill.provider_id != provider.id {
                    return Err(MarketError::validation(format!(
                        "skill {} is not offered by user {}",
                        skill.id, provider.id
                    )));
                }
                if request.duration > skill.duration {
                    return Err(MarketError::InvalidDuration {
                        requested: request.duration,
                        reason: format!("'{}' offers at most {}h", skill.title, skill.duration),
                    });
                }
            }

            let cost = self
                .config
                .rate_policy
                .cost(provider.hourly_rate, request.duration)
                .ok_or_else(|| MarketError::validation("exchange cost overflows"))?;
            if seeker.credits < cost {
                return Err(MarketError::InsufficientCredits {
                    user_id: seeker.id,
                    needed: cost,
                    available: seeker.credits,
                });
            }

            let settlement = self.config.settlement.initial_settlement(cost);
            let exchange = ExchangeStore::new(tx).insert(&request, cost, settlement)?;

            let ledger = Ledger::new(tx);
            match settlement {
                Settlement::Provider => {
                    ledger.transfer(
                        &seeker.id,
                        &provider.id,
                        cost,
                        CreditReason::Booking,
                        Some(&exchange.id),
                    )?;
                }
                Settlement::Escrow => {
                    ledger.hold(&seeker.id, cost, &exchange.id)?;
                }
                Settlement::None | Settlement::Refunded => {}
            }
            Ok(exchange)
        })?;

        tracing::info!(
            exchange_id = %exchange.id,
            seeker = %exchange.seeker_id,
            provider = %exchange.provider_id,
            duration = exchange.duration,
            cost = exchange.cost,
            settlement = exchange.settlement.as_str(),
            "Created exchange request"
        );
        Ok(exchange)
    }

    /// Apply a party's status change, notes, rating or review
    pub fn update(&self, id: &str, actor_id: &str, update: ExchangeUpdate) -> Result<Exchange> {
        update.validate()?;

        let exchange = self.db.immediate(|tx| {
            let store = ExchangeStore::new(tx);
            let mut exchange = load_for_party(tx, id, actor_id)?;
            let party = exchange
                .party(actor_id)
                .ok_or_else(|| MarketError::not_found("exchange", id))?;

            if let Some(next) = update.status {
                exchange.status.check_transition(next)?;
                if next == ExchangeStatus::Accepted && party != Party::Provider {
                    return Err(MarketError::validation(
                        "only the provider can accept an exchange",
                    ));
                }
                settle(&Ledger::new(tx), &mut exchange, next)?;
                tracing::info!(
                    exchange_id = %exchange.id,
                    from = %exchange.status,
                    to = %next,
                    actor = %actor_id,
                    "Exchange status changed"
                );
                exchange.status = next;
            }

            let annotating = update.completion_notes.is_some()
                || update.rating.is_some()
                || update.review.is_some();
            if annotating && exchange.status != ExchangeStatus::Completed {
                return Err(MarketError::validation(
                    "notes, ratings and reviews can only be added to a completed exchange",
                ));
            }

            if let Some(notes) = update.completion_notes.as_deref() {
                exchange.completion_notes = Some(notes.trim().to_string());
            }
            if let Some(rating) = update.rating {
                let slot = exchange.rating.slot_mut(party);
                if slot.is_some() {
                    return Err(MarketError::validation("rating already submitted"));
                }
                *slot = Some(rating);
            }
            if let Some(review) = update.review.as_deref() {
                let slot = exchange.reviews.slot_mut(party);
                if slot.is_some() {
                    return Err(MarketError::validation("review already submitted"));
                }
                *slot = Some(review.trim().to_string());
            }

            store.save(&mut exchange)?;
            Ok(exchange)
        })?;

        Ok(exchange)
    }

    /// Fetch an exchange the actor is a party to
    pub fn get_for(&self, id: &str, actor_id: &str) -> Result<Exchange> {
        load_for_party(self.db.conn(), id, actor_id)
    }

    pub fn list(&self, query: &ExchangeQuery) -> Result<Vec<Exchange>> {
        let mut exchanges =
            ExchangeStore::new(self.db.conn()).list(query.party.as_deref(), query.status)?;
        if let Some(viewer) = query.viewer.as_deref() {
            exchanges
                .iter_mut()
                .filter(|exchange| exchange.party(viewer).is_none())
                .for_each(Exchange::redact_private);
        }
        Ok(exchanges)
    }
}

/// Non-parties see the exchange as missing.
fn load_for_party(conn: &Connection, id: &str, actor_id: &str) -> Result<Exchange> {
    let exchange = ExchangeStore::new(conn).require(id)?;
    if exchange.party(actor_id).is_none() {
        return Err(MarketError::not_found("exchange", id));
    }
    Ok(exchange)
}

/// Move credits for a status change and record where the cost now sits.
fn settle(ledger: &Ledger<'_>, exchange: &mut Exchange, next: ExchangeStatus) -> Result<()> {
    let next_settlement = match (next, exchange.settlement) {
        (ExchangeStatus::Completed, Settlement::Escrow) => {
            ledger.release(
                &exchange.provider_id,
                exchange.cost,
                CreditReason::EscrowRelease,
                &exchange.id,
            )?;
            Settlement::Provider
        }
        (ExchangeStatus::Cancelled, Settlement::Escrow) => {
            ledger.release(
                &exchange.seeker_id,
                exchange.cost,
                CreditReason::Refund,
                &exchange.id,
            )?;
            Settlement::Refunded
        }
        (ExchangeStatus::Cancelled, Settlement::Provider) => {
            ledger.transfer(
                &exchange.provider_id,
                &exchange.seeker_id,
                exchange.cost,
                CreditReason::Refund,
                Some(&exchange.id),
            )?;
            Settlement::Refunded
        }
        (_, current) => current,
    };
    exchange.settlement = next_settlement;
    Ok(())
}

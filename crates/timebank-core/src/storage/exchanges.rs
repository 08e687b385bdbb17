//! Exchange record storage
//!
//! Records are never deleted; `save` persists status and settlement changes
//! made by the lifecycle service.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::parse_timestamp;
use crate::error::{MarketError, Result};
use crate::exchange::{
    Exchange, ExchangeStatus, NewExchange, PerParty, Settlement, SkillRef,
};

const EXCHANGE_COLUMNS: &str = "id, provider_id, seeker_id, skill_id, skill_label, status, duration, cost,
     settlement, scheduled_date, mode, message, completion_notes, provider_rating, seeker_rating,
     provider_review, seeker_review, created_at, updated_at";

pub struct ExchangeStore<'a> {
    conn: &'a Connection,
}

impl<'a> ExchangeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(
        &self,
        request: &NewExchange,
        cost: i64,
        settlement: Settlement,
    ) -> Result<Exchange> {
        let now = Utc::now();
        let (skill_id, skill_label) = match &request.skill {
            SkillRef::Listed(id) => (Some(id.clone()), None),
            SkillRef::Label(label) => (None, Some(label.clone())),
        };

        let exchange = Exchange {
            id: uuid::Uuid::new_v4().to_string(),
            provider_id: request.provider_id.clone(),
            seeker_id: request.seeker_id.clone(),
            skill_id,
            skill_label,
            status: ExchangeStatus::Pending,
            duration: request.duration,
            cost,
            settlement,
            scheduled_date: request.scheduled_date,
            mode: request.mode,
            message: request.message.clone(),
            completion_notes: None,
            rating: PerParty::default(),
            reviews: PerParty::default(),
            created_at: now,
            updated_at: now,
        };

        self.conn.execute(
            "INSERT INTO exchanges (id, provider_id, seeker_id, skill_id, skill_label, status, duration,
                cost, settlement, scheduled_date, mode, message, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                exchange.id,
                exchange.provider_id,
                exchange.seeker_id,
                exchange.skill_id,
                exchange.skill_label,
                exchange.status.as_str(),
                exchange.duration,
                exchange.cost,
                exchange.settlement.as_str(),
                exchange.scheduled_date.to_rfc3339(),
                exchange.mode.as_str(),
                exchange.message,
                now.to_rfc3339()
            ],
        )?;

        Ok(exchange)
    }

    pub fn get(&self, id: &str) -> Result<Option<Exchange>> {
        let sql = format!("SELECT {} FROM exchanges WHERE id = ?1", EXCHANGE_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [id], Self::map_row)
            .optional()?;
        row.map(ExchangeRow::into_exchange).transpose()
    }

    pub fn require(&self, id: &str) -> Result<Exchange> {
        self.get(id)?
            .ok_or_else(|| MarketError::not_found("exchange", id))
    }

    /// Persist mutable fields and bump `updated_at`
    pub fn save(&self, exchange: &mut Exchange) -> Result<()> {
        exchange.updated_at = Utc::now();
        let updated = self.conn.execute(
            "UPDATE exchanges SET status = ?1, settlement = ?2, completion_notes = ?3,
                provider_rating = ?4, seeker_rating = ?5, provider_review = ?6, seeker_review = ?7,
                updated_at = ?8
             WHERE id = ?9",
            params![
                exchange.status.as_str(),
                exchange.settlement.as_str(),
                exchange.completion_notes,
                exchange.rating.provider,
                exchange.rating.seeker,
                exchange.reviews.provider,
                exchange.reviews.seeker,
                exchange.updated_at.to_rfc3339(),
                exchange.id
            ],
        )?;
        if updated == 0 {
            return Err(MarketError::not_found("exchange", exchange.id.clone()));
        }
        Ok(())
    }

    /// List exchanges, newest first.
    ///
    /// `party` restricts to exchanges where the user is provider or seeker.
    pub fn list(
        &self,
        party: Option<&str>,
        status: Option<ExchangeStatus>,
    ) -> Result<Vec<Exchange>> {
        let mut sql = format!("SELECT {} FROM exchanges", EXCHANGE_COLUMNS);
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<&dyn ToSql> = Vec::new();

        let status_str = status.map(|s| s.as_str());
        if let Some(uid) = party.as_ref() {
            clauses.push("(provider_id = ? OR seeker_id = ?)");
            args.push(uid);
            args.push(uid);
        }
        if let Some(s) = status_str.as_ref() {
            clauses.push("status = ?");
            args.push(s);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(args.as_slice(), Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(ExchangeRow::into_exchange).collect()
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ExchangeRow> {
        Ok(ExchangeRow {
            id: row.get(0)?,
            provider_id: row.get(1)?,
            seeker_id: row.get(2)?,
            skill_id: row.get(3)?,
            skill_label: row.get(4)?,
            status: row.get(5)?,
            duration: row.get(6)?,
            cost: row.get(7)?,
            settlement: row.get(8)?,
            scheduled_date: row.get(9)?,
            mode: row.get(10)?,
            message: row.get(11)?,
            completion_notes: row.get(12)?,
            provider_rating: row.get(13)?,
            seeker_rating: row.get(14)?,
            provider_review: row.get(15)?,
            seeker_review: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }
}

struct ExchangeRow {
    id: String,
    provider_id: String,
    seeker_id: String,
    skill_id: Option<String>,
    skill_label: Option<String>,
    status: String,
    duration: i64,
    cost: i64,
    settlement: String,
    scheduled_date: String,
    mode: String,
    message: String,
    completion_notes: Option<String>,
    provider_rating: Option<u8>,
    seeker_rating: Option<u8>,
    provider_review: Option<String>,
    seeker_review: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ExchangeRow {
    fn into_exchange(self) -> Result<Exchange> {
        Ok(Exchange {
            status: self.status.parse()?,
            settlement: self.settlement.parse()?,
            mode: self.mode.parse()?,
            scheduled_date: parse_timestamp(&self.scheduled_date),
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
            rating: PerParty {
                provider: self.provider_rating,
                seeker: self.seeker_rating,
            },
            reviews: PerParty {
                provider: self.provider_review,
                seeker: self.seeker_review,
            },
            id: self.id,
            provider_id: self.provider_id,
            seeker_id: self.seeker_id,
            skill_id: self.skill_id,
            skill_label: self.skill_label,
            duration: self.duration,
            cost: self.cost,
            message: self.message,
            completion_notes: self.completion_notes,
        })
    }
}

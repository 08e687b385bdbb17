//! User directory
//!
//! Balances are read here but only ever written through the ledger.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::parse_timestamp;
use crate::constants::market::DEFAULT_HOURLY_RATE;
use crate::error::{MarketError, Result};

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Skill names shown on the profile, in the order they were added
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-form, e.g. "Weekday evenings"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    pub credits: i64,
    pub hourly_rate: i64,
    /// Bumped on every balance write
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hourly_rate: Option<i64>,
}

impl NewUser {
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(MarketError::validation("username must not be empty"));
        }
        if !self.email.contains('@') {
            return Err(MarketError::validation(format!(
                "invalid email '{}'",
                self.email
            )));
        }
        if matches!(self.hourly_rate, Some(rate) if rate < 1) {
            return Err(MarketError::validation("hourly rate must be at least 1"));
        }
        Ok(())
    }
}

/// Profile fields a user may edit. Absent fields are left alone; an empty
/// string clears a text field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub hourly_rate: Option<i64>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub availability: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.hourly_rate.is_none()
            && self.bio.is_none()
            && self.location.is_none()
            && self.availability.is_none()
        {
            return Err(MarketError::validation(
                "at least one of hourlyRate, bio, location or availability must be provided",
            ));
        }
        if matches!(self.hourly_rate, Some(rate) if rate < 1) {
            return Err(MarketError::validation("hourly rate must be at least 1"));
        }
        Ok(())
    }
}

fn apply_text(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim) {
        *slot = (!value.is_empty()).then(|| value.to_string());
    }
}

const USER_COLUMNS: &str = "id, username, email, skills, bio, location, availability, credits,
     hourly_rate, version, created_at";

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a user with a zero balance
    pub fn create(&self, new_user: &NewUser) -> Result<User> {
        new_user.validate()?;
        let username = new_user.username.trim();

        let email = new_user.email.trim();

        let (username_taken, email_taken): (bool, bool) = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1),
                    EXISTS(SELECT 1 FROM users WHERE email = ?2 COLLATE NOCASE)",
            params![username, email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        if username_taken {
            return Err(MarketError::validation(format!(
                "username '{}' is already taken",
                username
            )));
        }
        if email_taken {
            return Err(MarketError::validation(format!(
                "email '{}' is already registered",
                email
            )));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            skills: Vec::new(),
            bio: None,
            location: None,
            availability: None,
            credits: 0,
            hourly_rate: new_user.hourly_rate.unwrap_or(DEFAULT_HOURLY_RATE),
            version: 0,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO users (id, username, email, skills, credits, hourly_rate, version, created_at)
             VALUES (?1, ?2, ?3, '[]', 0, ?4, 0, ?5)",
            params![
                user.id,
                user.username,
                user.email,
                user.hourly_rate,
                user.created_at.to_rfc3339()
            ],
        )?;

        tracing::info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    pub fn get(&self, id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [id], Self::map_row)
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    /// Fetch a user or fail with `NotFound`
    pub fn require(&self, id: &str) -> Result<User> {
        self.get(id)?
            .ok_or_else(|| MarketError::not_found("user", id))
    }

    pub fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [username], Self::map_row)
            .optional()?;
        row.map(UserRow::into_user).transpose()
    }

    /// All users in registration order
    pub fn list(&self) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at, rowid",
            USER_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    /// Apply profile edits. Never touches the balance or its version.
    ///
    /// Reads then writes, so callers run it inside [`Database::immediate`](super::Database::immediate).
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User> {
        update.validate()?;

        let mut user = self.require(id)?;
        if let Some(rate) = update.hourly_rate {
            user.hourly_rate = rate;
        }
        apply_text(&mut user.bio, update.bio.as_deref());
        apply_text(&mut user.location, update.location.as_deref());
        apply_text(&mut user.availability, update.availability.as_deref());

        self.conn.execute(
            "UPDATE users SET hourly_rate = ?1, bio = ?2, location = ?3, availability = ?4
             WHERE id = ?5",
            params![
                user.hourly_rate,
                user.bio,
                user.location,
                user.availability,
                id
            ],
        )?;
        tracing::info!(user_id = %id, "Updated profile");
        Ok(user)
    }

    /// Append a skill name to the user's profile, ignoring duplicates.
    ///
    /// Reads then writes, so callers run it inside [`Database::immediate`](super::Database::immediate).
    pub fn add_skill_name(&self, id: &str, name: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MarketError::validation("skill name must not be empty"));
        }

        let mut user = self.require(id)?;
        if !user.skills.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            user.skills.push(name.to_string());
            let skills = serde_json::to_string(&user.skills)
                .map_err(|e| MarketError::validation(e.to_string()))?;
            self.conn.execute(
                "UPDATE users SET skills = ?1 WHERE id = ?2",
                params![skills, id],
            )?;
        }
        Ok(user)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            skills: row.get(3)?,
            bio: row.get(4)?,
            location: row.get(5)?,
            availability: row.get(6)?,
            credits: row.get(7)?,
            hourly_rate: row.get(8)?,
            version: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

struct UserRow {
    id: String,
    username: String,
    email: String,
    skills: String,
    bio: Option<String>,
    location: Option<String>,
    availability: Option<String>,
    credits: i64,
    hourly_rate: i64,
    version: i64,
    created_at: String,
}

impl UserRow {
    fn into_user(self) -> Result<User> {
        let skills: Vec<String> = serde_json::from_str(&self.skills).unwrap_or_else(|e| {
            tracing::warn!(user_id = %self.id, "Unreadable skills column: {}", e);
            Vec::new()
        });
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            skills,
            bio: self.bio,
            location: self.location,
            availability: self.availability,
            credits: self.credits,
            hourly_rate: self.hourly_rate,
            version: self.version,
            created_at: parse_timestamp(&self.created_at),
        })
    }
}

//! SQLite connection and schema management

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::constants::storage::DEFAULT_BUSY_TIMEOUT_MS;
use crate::error::Result;

/// Bumped whenever `SCHEMA` changes shape.
const SCHEMA_VERSION: i32 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    skills TEXT NOT NULL DEFAULT '[]',
    bio TEXT,
    location TEXT,
    availability TEXT,
    credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
    hourly_rate INTEGER NOT NULL DEFAULT 1 CHECK (hourly_rate >= 1),
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_tokens (
    token_hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skills (
    id TEXT PRIMARY KEY,
    provider_id TEXT NOT NULL REFERENCES users(id),
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL,
    duration INTEGER NOT NULL CHECK (duration >= 1),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_skills_provider ON skills(provider_id);

CREATE TABLE IF NOT EXISTS exchanges (
    id TEXT PRIMARY KEY,
    provider_id TEXT NOT NULL REFERENCES users(id),
    seeker_id TEXT NOT NULL REFERENCES users(id),
    skill_id TEXT REFERENCES skills(id),
    skill_label TEXT,
    status TEXT NOT NULL,
    duration INTEGER NOT NULL CHECK (duration >= 1),
    cost INTEGER NOT NULL CHECK (cost >= 0),
    settlement TEXT NOT NULL,
    scheduled_date TEXT NOT NULL,
    mode TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    completion_notes TEXT,
    provider_rating INTEGER,
    seeker_rating INTEGER,
    provider_review TEXT,
    seeker_review TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exchanges_provider ON exchanges(provider_id);
CREATE INDEX IF NOT EXISTS idx_exchanges_seeker ON exchanges(seeker_id);

CREATE TABLE IF NOT EXISTS credit_transactions (
    id TEXT PRIMARY KEY,
    from_user_id TEXT REFERENCES users(id),
    to_user_id TEXT REFERENCES users(id),
    amount INTEGER NOT NULL CHECK (amount > 0),
    reason TEXT NOT NULL,
    exchange_id TEXT REFERENCES exchanges(id),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_credit_tx_from ON credit_transactions(from_user_id);
CREATE INDEX IF NOT EXISTS idx_credit_tx_to ON credit_transactions(to_user_id);
";

/// Owned SQLite connection with the schema applied.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database with the default busy timeout
    pub fn new(path: &Path) -> Result<Self> {
        Self::open(path, Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Open (or create) the database, waiting up to `busy_timeout` for locks
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn,
            path: path.to_path_buf(),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        self.conn.execute_batch(SCHEMA)?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::info!(
            path = %self.path.display(),
            from = version,
            to = SCHEMA_VERSION,
            "Migrated database schema"
        );
        Ok(())
    }

    /// Borrow the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front so concurrent writers serialize
    /// instead of failing at commit. Any error rolls the whole unit back.
    pub fn immediate<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

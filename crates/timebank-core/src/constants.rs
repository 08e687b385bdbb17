//! Shared constants

pub mod storage {
    pub const CONFIG_DIR_NAME: &str = ".timebank";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
    pub const DATABASE_FILE_NAME: &str = "timebank.db";
    /// How long a writer waits for the SQLite write lock before giving up.
    pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
}

pub mod market {
    /// Credits minted for every newly registered user.
    pub const DEFAULT_STARTING_CREDITS: i64 = 10;
    pub const DEFAULT_HOURLY_RATE: i64 = 1;
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;
}

pub mod server {
    pub const DEFAULT_PORT: u16 = 5000;
}

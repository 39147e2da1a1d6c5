//! SQLite account store.
//!
//! Accounts are a username, an argon2 password hash and an opaque JSON
//! bag of the player's persisted fields. The storage schema knows
//! nothing about the game's data model beyond that.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::warn;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqlitePool};
use sqlx::Row;

use crate::entities::PlayerRecord;

const CREATE_ACCOUNTS: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0,
        data TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        last_login DATETIME
    )";

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| e.to_string())
}

/// Check a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// SQLite-backed account storage
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file and ensure the schema exists
    pub async fn connect(path: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        sqlx::query(CREATE_ACCOUNTS).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Create a new account with a hashed password
    pub async fn register(&self, username: &str, password: &str) -> Result<(), RegisterError> {
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RegisterError::Database(e.to_string()))?;
        if taken.is_some() {
            return Err(RegisterError::UsernameTaken);
        }

        let password_hash = hash_password(password).map_err(RegisterError::PasswordHash)?;

        sqlx::query("INSERT INTO accounts (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(&password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| RegisterError::Database(e.to_string()))?;
        Ok(())
    }

    /// Verify a password against the stored hash
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let stored_hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM accounts WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::Database(e.to_string()))?;
        let stored_hash = stored_hash.ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &stored_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        sqlx::query("UPDATE accounts SET last_login = CURRENT_TIMESTAMP WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        Ok(())
    }

    pub async fn is_admin(&self, username: &str) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT is_admin FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0) != 0).unwrap_or(false))
    }

    /// Load the opaque player record, if one has been saved
    pub async fn load_account(&self, username: &str) -> Result<Option<PlayerRecord>, sqlx::Error> {
        let data: Option<Option<String>> =
            sqlx::query_scalar("SELECT data FROM accounts WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        let Some(Some(json)) = data else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // A corrupt record should not lock the account out
                warn!("Discarding unreadable record for '{}': {}", username, e);
                Ok(None)
            }
        }
    }

    /// Store the opaque player record
    pub async fn save_account(
        &self,
        username: &str,
        record: &PlayerRecord,
    ) -> Result<(), sqlx::Error> {
        let json = serde_json::to_string(record).expect("player records always serialize");
        sqlx::query("UPDATE accounts SET data = ? WHERE username = ?")
            .bind(json)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Registration errors
#[derive(Debug)]
pub enum RegisterError {
    UsernameTaken,
    PasswordHash(String),
    Database(String),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UsernameTaken => write!(f, "Username already exists"),
            Self::PasswordHash(e) => write!(f, "Password hashing failed: {}", e),
            Self::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for RegisterError {}

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    Database(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "Invalid username or password"),
            Self::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for AuthError {}

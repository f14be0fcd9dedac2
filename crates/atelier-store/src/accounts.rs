//! Accounts and session tokens.
//!
//! The store only persists opaque hash/salt strings; computing and verifying
//! credentials is the server's concern.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Account, Session};

impl Database {
    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Insert a new account. Fails if the email is already registered.
    pub fn create_account(&self, account: &Account) -> Result<()> {
        self.conn().execute(
            "INSERT INTO accounts (email, password_hash, salt, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.email,
                account.password_hash,
                account.salt,
                account.is_admin,
                account.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch an account by email.
    pub fn get_account(&self, email: &str) -> Result<Account> {
        self.conn()
            .query_row(
                "SELECT email, password_hash, salt, is_admin, created_at
                 FROM accounts WHERE email = ?1",
                params![email],
                row_to_account,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Persist an issued session token.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn().execute(
            "INSERT INTO sessions (token, email, is_admin, remember, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.token,
                session.email,
                session.is_admin,
                session.remember,
                session.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up a session by its bearer token.
    pub fn get_session(&self, token: &str) -> Result<Session> {
        self.conn()
            .query_row(
                "SELECT token, email, is_admin, remember, created_at
                 FROM sessions WHERE token = ?1",
                params![token],
                row_to_session,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Revoke a session.  Returns `true` if a row was deleted.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(affected > 0)
    }

    /// Delete non-remembered sessions older than `ttl`.  Returns how many
    /// were purged.
    pub fn purge_expired_sessions(&self, ttl: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - ttl).to_rfc3339();
        let affected = self.conn().execute(
            "DELETE FROM sessions WHERE remember = 0 AND created_at < ?1",
            params![cutoff],
        )?;
        Ok(affected)
    }
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let created_str: String = row.get(4)?;
    let created_at = parse_timestamp(&created_str, 4)?;

    Ok(Account {
        email: row.get(0)?,
        password_hash: row.get(1)?,
        salt: row.get(2)?,
        is_admin: row.get(3)?,
        created_at,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    let created_str: String = row.get(4)?;
    let created_at = parse_timestamp(&created_str, 4)?;

    Ok(Session {
        token: row.get(0)?,
        email: row.get(1)?,
        is_admin: row.get(2)?,
        remember: row.get(3)?,
        created_at,
    })
}

fn parse_timestamp(s: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

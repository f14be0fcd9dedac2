//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `clients`, `posts`, `projects`,
//! `accounts`, and `sessions`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Clients (project records)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS clients (
    id             TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    contact_email  TEXT NOT NULL,               -- lookup key; not UNIQUE on purpose
    status         TEXT NOT NULL DEFAULT '',
    progress       INTEGER NOT NULL DEFAULT 0,
    due_date       TEXT NOT NULL DEFAULT '',
    next_milestone TEXT NOT NULL DEFAULT '',
    staging_url    TEXT,
    payment_url    TEXT,
    messages       TEXT NOT NULL DEFAULT '[]',  -- JSON array, append order
    assets         TEXT NOT NULL DEFAULT '[]',  -- JSON array, append order
    created_at     TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_clients_contact ON clients(contact_email);

-- ----------------------------------------------------------------
-- Blog posts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    title      TEXT NOT NULL,
    category   TEXT NOT NULL DEFAULT '',
    date       TEXT NOT NULL DEFAULT '',        -- display string, verbatim
    body       TEXT NOT NULL DEFAULT '',        -- newline-delimited paragraphs
    image      TEXT,
    excerpt    TEXT,
    views      INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Portfolio items
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS projects (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    title      TEXT NOT NULL,
    category   TEXT NOT NULL DEFAULT '',
    image      TEXT,
    sort_order INTEGER,                         -- nullable; missing sorts last
    created_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Accounts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS accounts (
    email         TEXT PRIMARY KEY NOT NULL,
    password_hash TEXT NOT NULL,                -- hex, salted
    salt          TEXT NOT NULL,                -- hex
    is_admin      INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    created_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Sessions
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sessions (
    token      TEXT PRIMARY KEY NOT NULL,
    email      TEXT NOT NULL,
    is_admin   INTEGER NOT NULL DEFAULT 0,
    remember   INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,

    FOREIGN KEY (email) REFERENCES accounts(email) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_sessions_email ON sessions(email);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

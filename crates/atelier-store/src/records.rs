//! Repository methods for the `clients` collection (project records).
//!
//! Array fields (`messages`, `assets`) are stored as JSON text. Two write
//! contracts are exposed:
//!
//! - [`Database::set_messages`] / [`Database::set_assets`] replace the whole
//!   array. This is the write-back half of the read-modify-write pattern the
//!   portal UIs use. Two writers working from stale copies can silently lose
//!   each other's appends; callers accept that contract knowingly.
//! - [`Database::append_message`] / [`Database::append_asset`] append one
//!   entry inside a single SQL statement (`json_insert` with the `$[#]`
//!   path), so concurrent appends all land.

use chrono::{DateTime, Utc};
use rusqlite::params;

use atelier_shared::models::{AssetEntry, MessageEntry, ProjectRecord};
use atelier_shared::protocol::StatusUpdate;
use atelier_shared::types::{RecordId, SenderTag};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new project record.
    pub fn create_record(&self, record: &ProjectRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO clients (id, contact_email, status, progress, due_date,
                                  next_milestone, staging_url, payment_url,
                                  messages, assets, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id.to_string(),
                record.contact_email,
                record.status,
                record.progress,
                record.due_date,
                record.next_milestone,
                record.staging_url,
                record.payment_url,
                serde_json::to_string(&record.messages)?,
                serde_json::to_string(&record.assets)?,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single record by id.
    pub fn get_record(&self, id: RecordId) -> Result<ProjectRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM clients WHERE id = ?1"),
                params![id.to_string()],
                row_to_record,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Equality-filtered lookup by contact address.
    ///
    /// Nothing enforces uniqueness of `contact_email`, so this returns every
    /// match in store order (insertion order); callers that expect "the"
    /// record take the first.
    pub fn find_records_by_contact(&self, contact_email: &str) -> Result<Vec<ProjectRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM clients
             WHERE contact_email = ?1
             ORDER BY created_at ASC"
        ))?;

        let rows = stmt.query_map(params![contact_email], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// List all records, newest first (admin console overview).
    pub fn list_records(&self) -> Result<Vec<ProjectRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM clients ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Field-level status update. `None` fields keep their current value.
    ///
    /// Returns the updated record.
    pub fn update_status(&self, id: RecordId, update: &StatusUpdate) -> Result<ProjectRecord> {
        let affected = self.conn().execute(
            "UPDATE clients SET
                 status         = COALESCE(?2, status),
                 progress       = COALESCE(?3, progress),
                 due_date       = COALESCE(?4, due_date),
                 next_milestone = COALESCE(?5, next_milestone),
                 staging_url    = COALESCE(?6, staging_url),
                 payment_url    = COALESCE(?7, payment_url)
             WHERE id = ?1",
            params![
                id.to_string(),
                update.status,
                update.progress,
                update.due_date,
                update.next_milestone,
                update.staging_url,
                update.payment_url,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_record(id)
    }

    /// Replace the whole message array (read-modify-write write-back).
    ///
    /// Last write wins: an array computed from a stale snapshot overwrites
    /// whatever another writer committed in between.
    pub fn set_messages(&self, id: RecordId, messages: &[MessageEntry]) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE clients SET messages = ?2 WHERE id = ?1",
            params![id.to_string(), serde_json::to_string(messages)?],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Replace the whole asset array. Same contract as [`Self::set_messages`].
    pub fn set_assets(&self, id: RecordId, assets: &[AssetEntry]) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE clients SET assets = ?2 WHERE id = ?1",
            params![id.to_string(), serde_json::to_string(assets)?],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Atomic append of one message entry, stamped with the current time.
    ///
    /// The append happens inside a single `UPDATE ... json_insert` statement,
    /// so concurrent appenders cannot lose each other's entries.
    pub fn append_message(
        &self,
        id: RecordId,
        sender: SenderTag,
        text: &str,
    ) -> Result<MessageEntry> {
        let entry = MessageEntry {
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        let affected = self.conn().execute(
            "UPDATE clients SET messages = json_insert(messages, '$[#]', json(?2))
             WHERE id = ?1",
            params![id.to_string(), serde_json::to_string(&entry)?],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(entry)
    }

    /// Atomic append of one asset entry. Counterpart of
    /// [`Self::append_message`] for the asset log.
    pub fn append_asset(&self, id: RecordId, entry: &AssetEntry) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE clients SET assets = json_insert(assets, '$[#]', json(?2))
             WHERE id = ?1",
            params![id.to_string(), serde_json::to_string(entry)?],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a record by id.  Returns `true` if a row was deleted.
    ///
    /// Stored asset blobs are not cleaned up here; orphaned blobs are an
    /// accepted gap of the upload contract.
    pub fn delete_record(&self, id: RecordId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM clients WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

const RECORD_COLUMNS: &str = "id, contact_email, status, progress, due_date, next_milestone,
                              staging_url, payment_url, messages, assets, created_at";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`ProjectRecord`].
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectRecord> {
    let id_str: String = row.get(0)?;
    let contact_email: String = row.get(1)?;
    let status: String = row.get(2)?;
    let progress: i64 = row.get(3)?;
    let due_date: String = row.get(4)?;
    let next_milestone: String = row.get(5)?;
    let staging_url: Option<String> = row.get(6)?;
    let payment_url: Option<String> = row.get(7)?;
    let messages_json: String = row.get(8)?;
    let assets_json: String = row.get(9)?;
    let created_str: String = row.get(10)?;

    let id: RecordId = id_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let messages: Vec<MessageEntry> = serde_json::from_str(&messages_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let assets: Vec<AssetEntry> = serde_json::from_str(&assets_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(ProjectRecord {
        id,
        contact_email,
        status,
        progress,
        due_date,
        next_milestone,
        staging_url,
        payment_url,
        messages,
        assets,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn message(sender: SenderTag, text: &str) -> MessageEntry {
        MessageEntry {
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_round_trip() {
        let (db, _dir) = test_db();
        let record = ProjectRecord::new("client@example.com");

        db.create_record(&record).unwrap();
        let loaded = db.get_record(record.id).unwrap();
        assert_eq!(loaded.contact_email, "client@example.com");
        assert_eq!(loaded.progress, 0);
        assert!(loaded.messages.is_empty());
    }

    #[test]
    fn get_missing_is_not_found() {
        let (db, _dir) = test_db();
        assert!(matches!(
            db.get_record(RecordId::new()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn find_by_contact_returns_matches_in_store_order() {
        let (db, _dir) = test_db();

        let mut first = ProjectRecord::new("dup@example.com");
        first.status = "first".into();
        first.created_at = Utc::now() - chrono::Duration::hours(1);
        let mut second = ProjectRecord::new("dup@example.com");
        second.status = "second".into();

        db.create_record(&second).unwrap();
        db.create_record(&first).unwrap();
        db.create_record(&ProjectRecord::new("other@example.com"))
            .unwrap();

        let found = db.find_records_by_contact("dup@example.com").unwrap();
        assert_eq!(found.len(), 2);
        // Store order is creation order, so "the" record is the oldest.
        assert_eq!(found[0].status, "first");

        assert!(db.find_records_by_contact("nobody@example.com").unwrap().is_empty());
    }

    #[test]
    fn update_status_is_field_level() {
        let (db, _dir) = test_db();
        let mut record = ProjectRecord::new("c@example.com");
        record.status = "Design".into();
        db.create_record(&record).unwrap();

        let updated = db
            .update_status(
                record.id,
                &StatusUpdate {
                    progress: Some(42),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.progress, 42);
        // Untouched fields keep their value.
        assert_eq!(updated.status, "Design");
    }

    #[test]
    fn set_messages_is_last_write_wins() {
        let (db, _dir) = test_db();
        let record = ProjectRecord::new("c@example.com");
        db.create_record(&record).unwrap();

        // Two writers capture the same (empty) snapshot...
        let snapshot_a = db.get_record(record.id).unwrap().messages;
        let snapshot_b = db.get_record(record.id).unwrap().messages;

        // ...and each appends locally before writing the whole array back.
        let mut a = snapshot_a;
        a.push(message(SenderTag::Client, "from the dashboard"));
        db.set_messages(record.id, &a).unwrap();

        let mut b = snapshot_b;
        b.push(message(SenderTag::Agency, "from the console"));
        db.set_messages(record.id, &b).unwrap();

        // The second write clobbered the first: one entry was lost. This is
        // the documented behavior of the write-back contract, not a bug.
        let log = db.get_record(record.id).unwrap().messages;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "from the console");
    }

    #[test]
    fn append_message_keeps_concurrent_entries() {
        let (db, _dir) = test_db();
        let record = ProjectRecord::new("c@example.com");
        db.create_record(&record).unwrap();

        // Same interleaving as the write-back test, through the atomic
        // primitive instead: both entries survive.
        db.append_message(record.id, SenderTag::Client, "from the dashboard")
            .unwrap();
        db.append_message(record.id, SenderTag::Agency, "from the console")
            .unwrap();

        let log = db.get_record(record.id).unwrap().messages;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].sender, SenderTag::Client);
        assert_eq!(log[1].sender, SenderTag::Agency);
    }

    #[test]
    fn append_asset_preserves_order() {
        let (db, _dir) = test_db();
        let record = ProjectRecord::new("c@example.com");
        db.create_record(&record).unwrap();

        for name in ["brief.pdf", "logo.png"] {
            db.append_asset(
                record.id,
                &AssetEntry {
                    name: name.to_string(),
                    url: format!("http://localhost/assets/{}/{}", record.id, name),
                    uploader: SenderTag::Client,
                    timestamp: Utc::now(),
                },
            )
            .unwrap();
        }

        let assets = db.get_record(record.id).unwrap().assets;
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].name, "brief.pdf");
        assert_eq!(assets[1].name, "logo.png");
    }

    #[test]
    fn delete_record() {
        let (db, _dir) = test_db();
        let record = ProjectRecord::new("c@example.com");
        db.create_record(&record).unwrap();

        assert!(db.delete_record(record.id).unwrap());
        assert!(!db.delete_record(record.id).unwrap());
        assert!(matches!(db.get_record(record.id), Err(StoreError::NotFound)));
    }
}

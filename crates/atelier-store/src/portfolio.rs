//! Portfolio items (`projects` collection).

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use atelier_shared::models::{sort_portfolio, PortfolioItem};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Insert a portfolio item.
    pub fn create_portfolio_item(&self, item: &PortfolioItem) -> Result<()> {
        self.conn().execute(
            "INSERT INTO projects (id, title, category, image, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id.to_string(),
                item.title,
                item.category,
                item.image,
                item.order,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All portfolio items, sorted by explicit order with missing values
    /// last. The sort happens here in code, not in SQL, so the
    /// missing-order default is the one stated on the model.
    pub fn list_portfolio(&self) -> Result<Vec<PortfolioItem>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, title, category, image, sort_order FROM projects")?;

        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let id = Uuid::parse_str(&id_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(PortfolioItem {
                id,
                title: row.get(1)?,
                category: row.get(2)?,
                image: row.get(3)?,
                order: row.get(4)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        sort_portfolio(&mut items);
        Ok(items)
    }

    /// Delete a portfolio item.  Returns `true` if a row was deleted.
    pub fn delete_portfolio_item(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

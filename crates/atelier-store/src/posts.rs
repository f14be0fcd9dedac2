//! CRUD operations for blog [`Post`] entries.

use chrono::{DateTime, Utc};
use rusqlite::params;

use atelier_shared::models::Post;
use atelier_shared::protocol::PostInput;
use atelier_shared::types::PostId;

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Insert a new post.
    pub fn create_post(&self, post: &Post) -> Result<()> {
        self.conn().execute(
            "INSERT INTO posts (id, title, category, date, body, image, excerpt, views, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                post.id.to_string(),
                post.title,
                post.category,
                post.date,
                post.body,
                post.image,
                post.excerpt,
                post.views,
                post.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a post without touching its view counter (admin editing).
    pub fn get_post(&self, id: PostId) -> Result<Post> {
        self.conn()
            .query_row(
                "SELECT id, title, category, date, body, image, excerpt, views, created_at
                 FROM posts WHERE id = ?1",
                params![id.to_string()],
                row_to_post,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Public fetch: bump the view counter atomically, then return the post.
    ///
    /// The increment is a single `UPDATE views = views + 1`, so concurrent
    /// readers never lose counts.
    pub fn fetch_post(&self, id: PostId) -> Result<Post> {
        let affected = self.conn().execute(
            "UPDATE posts SET views = views + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_post(id)
    }

    /// List all posts, newest first.
    pub fn list_posts(&self) -> Result<Vec<Post>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, title, category, date, body, image, excerpt, views, created_at
             FROM posts ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_post)?;

        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    /// Overwrite an existing post's content fields.
    pub fn update_post(&self, id: PostId, input: &PostInput) -> Result<Post> {
        let affected = self.conn().execute(
            "UPDATE posts SET title = ?2, category = ?3, date = ?4, body = ?5,
                              image = ?6, excerpt = ?7
             WHERE id = ?1",
            params![
                id.to_string(),
                input.title,
                input.category,
                input.date,
                input.body,
                input.image,
                input.excerpt,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_post(id)
    }

    /// Delete a post by id.  Returns `true` if a row was deleted.
    pub fn delete_post(&self, id: PostId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let id_str: String = row.get(0)?;
    let created_str: String = row.get(8)?;

    let id = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Post {
        id: PostId(id),
        title: row.get(1)?,
        category: row.get(2)?,
        date: row.get(3)?,
        body: row.get(4)?,
        image: row.get(5)?,
        excerpt: row.get(6)?,
        views: row.get(7)?,
        created_at,
    })
}

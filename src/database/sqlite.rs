use crate::database::EntryRepository;
use crate::domain::{Entry, EntryDraft};
use crate::features::entries::model::DbEntry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, QueryBuilder, Sqlite};
use std::collections::HashMap;

pub struct SqliteRepository {
    pool: Pool<Sqlite>,
}

impl SqliteRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    // one query for the whole batch; the original per-request scheme built
    // the IN list by string concatenation, bind parameters fix that
    async fn get_tags_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut tags_by_entry: HashMap<i64, Vec<String>> = HashMap::new();
        if ids.is_empty() {
            return Ok(tags_by_entry);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT entry_id, tag FROM tags WHERE entry_id IN (");
        {
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
        }
        builder.push(")");

        let rows: Vec<(i64, String)> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("Failed to load tags")?;

        for (entry_id, tag) in rows {
            tags_by_entry.entry(entry_id).or_default().push(tag);
        }

        Ok(tags_by_entry)
    }
}

#[async_trait]
impl EntryRepository for SqliteRepository {
    async fn get_visible_entries(&self) -> Result<Vec<Entry>> {
        let db_entries = sqlx::query_as::<_, DbEntry>(
            "SELECT id, title, body, posted FROM entries WHERE visible = 1 ORDER BY posted DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to query entries")?;

        let ids: Vec<i64> = db_entries.iter().map(|e| e.id).collect();
        let mut tags_by_entry = self.get_tags_for(&ids).await?;

        let entries = db_entries
            .into_iter()
            .map(|db_entry| {
                let tags = tags_by_entry.remove(&db_entry.id).unwrap_or_default();
                db_entry.into_entry(tags)
            })
            .collect();

        Ok(entries)
    }

    async fn get_entry_by_id(&self, id: i64) -> Result<Option<Entry>> {
        let db_entry_opt = sqlx::query_as::<_, DbEntry>(
            "SELECT id, title, body, posted FROM entries WHERE id = ? AND visible = 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query entry")?;

        match db_entry_opt {
            Some(db_entry) => {
                let mut tags_by_entry = self.get_tags_for(&[db_entry.id]).await?;
                let tags = tags_by_entry.remove(&db_entry.id).unwrap_or_default();
                Ok(Some(db_entry.into_entry(tags)))
            }
            None => Ok(None),
        }
    }

    async fn get_all_filenames(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT filename FROM entries")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list entry filenames")?;

        Ok(rows.into_iter().map(|(filename,)| filename).collect())
    }

    async fn save_entry(&self, draft: &EntryDraft) -> Result<()> {
        // nifty UPSERT, keyed on filename so edits keep the same row (and id)
        sqlx::query(
            r#"
            INSERT INTO entries (filename, title, body, posted, visible)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(filename) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                posted = excluded.posted,
                visible = excluded.visible
            "#,
        )
        .bind(&draft.filename)
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(draft.posted)
        .bind(draft.visible)
        .execute(&self.pool)
        .await
        .context(format!("Failed to save entry {}", draft.filename))?;

        let (entry_id,): (i64,) = sqlx::query_as("SELECT id FROM entries WHERE filename = ?")
            .bind(&draft.filename)
            .fetch_one(&self.pool)
            .await
            .context(format!("Failed to look up entry id for {}", draft.filename))?;

        // replace the tag set wholesale, diffing is not worth it at this size
        sqlx::query("DELETE FROM tags WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;

        for tag in &draft.tags {
            sqlx::query("INSERT INTO tags (entry_id, tag) VALUES (?, ?)")
                .bind(entry_id)
                .bind(tag)
                .execute(&self.pool)
                .await
                .context(format!("Failed to save tag {} for {}", tag, draft.filename))?;
        }

        Ok(())
    }

    async fn delete_entry(&self, filename: &str) -> Result<()> {
        // explicit tag delete rather than leaning on the cascade pragma
        sqlx::query("DELETE FROM tags WHERE entry_id IN (SELECT id FROM entries WHERE filename = ?)")
            .bind(filename)
            .execute(&self.pool)
            .await?;

        sqlx::query("DELETE FROM entries WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await
            .context(format!("Failed to delete entry {}", filename))?;

        Ok(())
    }
}

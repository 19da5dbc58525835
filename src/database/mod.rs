use crate::domain::{Entry, EntryDraft};
use anyhow::Result;
use async_trait::async_trait;

pub mod sqlite;

// an entryrepository can be shared between threads (referencable)
// sqlx::Pool is thread safe
// generic interface over entry storage, db specific implementations in
// "sqlite.rs", future: "postgresql.rs", "mysql.rs"
#[async_trait]
pub trait EntryRepository: Send + Sync {
    // only visible entries, newest first; the returned order is what the
    // HTTP layer serializes
    async fn get_visible_entries(&self) -> Result<Vec<Entry>>;
    async fn get_entry_by_id(&self, id: i64) -> Result<Option<Entry>>;
    // every known filename, hidden entries included; the sync service
    // diffs this against the files actually on disk
    async fn get_all_filenames(&self) -> Result<Vec<String>>;

    // write operations, driven by the content sync service
    async fn save_entry(&self, draft: &EntryDraft) -> Result<()>;
    async fn delete_entry(&self, filename: &str) -> Result<()>;
}

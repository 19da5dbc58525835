use chrono::NaiveDateTime;
use derive_more::derive::Display;

/// A blog entry as handed to the HTTP layer.
///
/// `body` starts out as the content hash key recorded in the database and is
/// replaced with rendered HTML by the assembler before serialization.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{}", title)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub posted: NaiveDateTime,
    pub tags: Vec<String>,
}

// everything the sync service needs to upsert an entry row
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub filename: String,
    pub title: String,
    // content hash key into the asset store
    pub body: String,
    pub posted: NaiveDateTime,
    pub visible: bool,
    pub tags: Vec<String>,
}

use crate::domain::Entry;
use chrono::NaiveDateTime;
use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

// row shape of the entries table; tags ride in a separate table and are
// attached by the repository
#[derive(sqlx::FromRow, Eq, PartialEq, Clone, Display)]
#[display("{}", title)]
pub struct DbEntry {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub posted: NaiveDateTime,
}

impl DbEntry {
    pub fn into_entry(self, tags: Vec<String>) -> Entry {
        Entry {
            id: self.id,
            title: self.title,
            body: self.body,
            posted: self.posted,
            tags,
        }
    }
}

// wire format, field names fixed by the existing frontend
#[derive(Serialize, Deserialize)]
pub struct JsonEntry {
    #[serde(rename = "uniqueId")]
    pub unique_id: i64,
    pub title: String,
    pub body: String,
    pub posted: String,
    pub tags: Vec<String>,
}

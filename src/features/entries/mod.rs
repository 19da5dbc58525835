pub mod model;

use crate::domain::Entry;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use model::JsonEntry;

pub fn entries_router() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries_handler))
        .route("/entries/{id}", get(get_entry_handler))
}

async fn list_entries_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<JsonEntry>>, StatusCode> {
    // all or nothing: one unresolvable body fails the whole response, a
    // partially rendered list would misrepresent what's published
    match state.assembler.assemble_entries().await {
        Ok(entries) => Ok(Json(
            entries
                .iter()
                .map(|e| entry_to_json(e, "%Y-%m-%d %H:%M:%S"))
                .collect(),
        )),
        Err(e) => {
            eprintln!("Failed to assemble entries: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn get_entry_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JsonEntry>, StatusCode> {
    match state.assembler.assemble_entry(id).await {
        Ok(Some(entry)) => Ok(Json(entry_to_json(&entry, "%Y-%m-%d %H:%M:%S"))),

        Ok(None) => Err(StatusCode::NOT_FOUND),

        Err(e) => {
            eprintln!("Failed to assemble entry {}: {:#}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn entry_to_json(entry: &Entry, format: &str) -> JsonEntry {
    JsonEntry {
        unique_id: entry.id,
        title: entry.title.to_owned(),
        body: entry.body.to_owned(),
        posted: entry.posted.format(format).to_string(),
        tags: entry.tags.to_owned(),
    }
}

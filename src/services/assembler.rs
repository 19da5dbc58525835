use crate::cache::RenderGate;
use crate::database::EntryRepository;
use crate::domain::Entry;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Turns repository records into servable entries.
///
/// Entry rows carry a content hash key in `body`; the assembler swaps that
/// key for rendered HTML via the render gate before anything leaves the API.
pub struct EntryAssembler {
    repo: Box<dyn EntryRepository>,
    gate: Arc<RenderGate>,
}

impl EntryAssembler {
    pub fn new(repo: Box<dyn EntryRepository>, gate: Arc<RenderGate>) -> Self {
        Self { repo, gate }
    }

    pub async fn assemble_entries(&self) -> Result<Vec<Entry>> {
        let mut entries = self.repo.get_visible_entries().await?;
        for entry in &mut entries {
            self.fill_body(entry).await?;
        }
        Ok(entries)
    }

    pub async fn assemble_entry(&self, id: i64) -> Result<Option<Entry>> {
        match self.repo.get_entry_by_id(id).await? {
            Some(mut entry) => {
                self.fill_body(&mut entry).await?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    async fn fill_body(&self, entry: &mut Entry) -> Result<()> {
        let html = self
            .gate
            .resolve(&entry.body)
            .await
            .with_context(|| format!("Failed to resolve body for entry {}", entry.id))?;

        entry.body = String::from_utf8(html).context("rendered HTML is not valid utf-8")?;

        Ok(())
    }
}

use crate::cache::{content_digest, ContentStore};
use crate::config::TintaConfig;
use crate::database::EntryRepository;
use crate::domain::EntryDraft;
use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDateTime, Utc};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Deserialize, Debug, Default)]
struct EntryFrontMatter {
    title: Option<String>,
    posted: Option<String>,
    tags: Option<Vec<String>>,
    visible: Option<bool>,
}

/// Keeps the database and the asset store in step with the markdown files on
/// disk. The markdown body goes into the content store under its own digest;
/// the entry row only keeps that key.
pub struct SyncService {
    repo: Box<dyn EntryRepository>,
    store: Arc<ContentStore>,
    config: Arc<TintaConfig>,
}

impl SyncService {
    pub fn new(
        repo: Box<dyn EntryRepository>,
        store: Arc<ContentStore>,
        config: Arc<TintaConfig>,
    ) -> Self {
        Self {
            repo,
            store,
            config,
        }
    }

    /// Walks the whole content directory and syncs every markdown file,
    /// then deletes db rows whose file no longer exists (covers removals
    /// that happened while the service was down). Returns how many entries
    /// were synced.
    pub async fn full_sync(&self) -> Result<usize> {
        let mut synced = 0;
        let mut seen: HashSet<String> = HashSet::new();

        for result_entry in WalkDir::new(&self.config.content_dir) {
            let entry = match result_entry {
                Ok(val) => val,

                // somehow this is not a valid entry
                Err(_) => continue,
            };

            if !entry.file_type().is_file() {
                continue;
            }

            // work with only markdown files (for now)
            if entry.path().extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }

            // the file is on disk, so its row is not stale even if this
            // particular sync of it fails
            seen.insert(self.relative_filename(entry.path()));

            match self.sync_file(entry.path()).await {
                Ok(()) => synced += 1,
                Err(e) => {
                    eprintln!("Error occurred syncing {}: {:#}", entry.path().display(), e);
                }
            }
        }

        // anything in the db the walk did not see is gone from disk
        for filename in self.repo.get_all_filenames().await? {
            if !seen.contains(&filename) {
                if let Err(e) = self.repo.delete_entry(&filename).await {
                    eprintln!("Failed to delete stale entry {}: {:#}", filename, e);
                }
            }
        }

        Ok(synced)
    }

    pub async fn sync_file(&self, path: &Path) -> Result<()> {
        let filename = self.relative_filename(path);

        let raw_markdown = fs::read_to_string(path)
            .with_context(|| format!("Unable to read file {}", path.display()))?;

        // parse frontmatter and separate it from the content
        let matter = Matter::<YAML>::new();
        let parsed_matter = matter
            .parse::<EntryFrontMatter>(&raw_markdown)
            .map_err(|e| anyhow!("Failed to parse frontmatter in {}: {}", filename, e))?;

        let frontmatter = parsed_matter.data.unwrap_or_default();
        let body = parsed_matter.content;

        // content-addressed: the digest is both the blob's name in the store
        // and the key the entry row carries
        let key = content_digest(body.as_bytes());
        self.store.put(&key, body.as_bytes())?;

        let title = frontmatter.title.unwrap_or_else(|| default_title(path));
        let posted = resolve_datetime(frontmatter.posted, os_modified(path));

        let draft = EntryDraft {
            filename,
            title,
            body: key,
            posted,
            visible: frontmatter.visible.unwrap_or(true),
            tags: frontmatter.tags.unwrap_or_default(),
        };

        self.repo.save_entry(&draft).await
    }

    pub async fn remove_file(&self, path: &Path) -> Result<()> {
        let filename = self.relative_filename(path);
        self.repo.delete_entry(&filename).await
    }

    fn relative_filename(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.config.content_dir).unwrap_or(path);
        relative.to_string_lossy().replace("\\", "/")
    }
}

fn default_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

fn resolve_datetime(frontmatter_date: Option<String>, os_date: Option<NaiveDateTime>) -> NaiveDateTime {
    // tier 1: frontmatter
    if let Some(date_str) = frontmatter_date {
        // attempt to parse RFC3339
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&date_str) {
            return dt.naive_utc();
        }

        // fallback to YYYY-MM-DD
        if let Ok(d) = chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") {
            return d.and_hms_opt(0, 0, 0).unwrap_or_default();
        }
    }

    // tier 2: file modification time, tier 3: now
    os_date.unwrap_or_else(|| Utc::now().naive_utc())
}

fn os_modified(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let secs = modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    chrono::DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.naive_utc())
}

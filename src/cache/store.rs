use crate::cache::CacheError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

const CONTENT_DIR: &str = ".content";

// canonical hex digest for a blob, shared with the sync service so entry rows
// and store names always agree on the key format
pub fn content_digest(content: &[u8]) -> String {
    format!("{:016x}", xxh3_64(content))
}

/// Deduplicated on-disk blob storage.
///
/// The layout is:
///
/// ```text
/// root/
///     .content/<hex-digest>    one file per unique blob
///     <name>                   hard link into .content
/// ```
///
/// Identical content occupies a single file no matter how many names point at
/// it. Blobs are written once and never overwritten; names are created once
/// and never retargeted.
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(root.join(CONTENT_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /*
    four cases:
    content new, name new          create blob, create link
    content new, name exists       error, would clobber the existing name
    content exists, name new       new name for an existing blob, link only
    content exists, name exists    name and blob already match, do nothing
    */
    pub fn put(&self, name: &str, content: &[u8]) -> Result<(), CacheError> {
        let digest = content_digest(content);
        let content_path = self.root.join(CONTENT_DIR).join(&digest);
        let name_path = self.root.join(name);

        let content_exists = content_path.exists();

        if name_path.exists() {
            if !content_exists {
                return Err(CacheError::WouldClobber(name.to_string()));
            }
            return Ok(());
        }

        if !content_exists {
            // write to a temp file and rename into place so a partially
            // written blob is never visible under its digest
            let tmp_path = self
                .root
                .join(CONTENT_DIR)
                .join(format!(".tmp-{}", Uuid::new_v4()));
            fs::write(&tmp_path, content)?;
            fs::rename(&tmp_path, &content_path)?;
        }

        match fs::hard_link(&content_path, &name_path) {
            Ok(()) => Ok(()),
            // a concurrent put linked the same name first; the content under
            // a given digest is identical by construction
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    pub fn get(&self, name: &str) -> Result<Vec<u8>, CacheError> {
        let name_path = self.root.join(name);
        match fs::read(&name_path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CacheError::NotFound(name.to_string()))
            }
            Err(e) => Err(CacheError::SourceUnavailable {
                key: name.to_string(),
                source: e,
            }),
        }
    }
}

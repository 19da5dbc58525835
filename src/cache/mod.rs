pub mod gate;
pub mod pages;
pub mod store;

pub use self::gate::RenderGate;
pub use self::pages::PageCache;
pub use self::store::{content_digest, ContentStore};

use thiserror::Error;

// one error family for the whole asset pipeline: the on-disk store, the
// in-memory page cache, and the render gate all speak it
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no content stored under \"{0}\"")]
    NotFound(String),

    // the name already exists but its backing blob is gone, so repointing it
    // could lose whatever it used to reference
    #[error("storing new content under \"{0}\" would clobber it")]
    WouldClobber(String),

    #[error("failed to read backing content for \"{key}\": {source}")]
    SourceUnavailable {
        key: String,
        source: std::io::Error,
    },

    #[error("failed to render \"{key}\": {reason}")]
    Render { key: String, reason: String },

    // promote() was called for a key that was never loaded with get()
    #[error("\"{0}\" was never loaded into the cache")]
    NotCached(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

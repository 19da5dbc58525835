use crate::cache::{CacheError, ContentStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

// a cache line holds exactly one of the two forms, never both, so promotion
// structurally frees the raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Raw(Vec<u8>),
    Rendered(Vec<u8>),
}

struct CacheLine {
    payload: Payload,
    last_used: u64,
}

struct CacheInner {
    lines: HashMap<String, CacheLine>,
    // logical clock, bumped on every access; avoids wall-clock ties
    clock: u64,
}

/// Bounded in-memory table over the [`ContentStore`].
///
/// A miss reads the backing blob and inserts it raw; when the table is at
/// capacity the least-recently-used line is evicted first. Lines move from
/// raw to rendered exactly once, via [`PageCache::promote`].
pub struct PageCache {
    store: Arc<ContentStore>,
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

impl PageCache {
    pub fn new(store: Arc<ContentStore>, max_entries: usize) -> Self {
        Self {
            store,
            max_entries,
            inner: Mutex::new(CacheInner {
                lines: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Returns the cached bytes for `key` plus whether they are rendered.
    /// On a miss the raw blob is loaded from the store; the table is left
    /// untouched when that load fails.
    pub async fn get(&self, key: &str) -> Result<(Vec<u8>, bool), CacheError> {
        {
            let mut inner = self.inner.lock().await;
            inner.clock += 1;
            let clock = inner.clock;
            if let Some(line) = inner.lines.get_mut(key) {
                line.last_used = clock;
                return Ok(snapshot(line));
            }
        }

        // miss: read the blob without holding the table lock
        let raw = self.store.get(key)?;

        let mut inner = self.inner.lock().await;
        inner.clock += 1;
        let clock = inner.clock;

        // another task may have loaded (or even rendered) the key meanwhile
        if let Some(line) = inner.lines.get_mut(key) {
            line.last_used = clock;
            return Ok(snapshot(line));
        }

        if inner.lines.len() >= self.max_entries {
            inner.evict_oldest();
        }
        inner.lines.insert(
            key.to_string(),
            CacheLine {
                payload: Payload::Raw(raw.clone()),
                last_used: clock,
            },
        );

        Ok((raw, false))
    }

    /// Replaces the raw payload for an already-loaded key with its rendered
    /// form, dropping the raw bytes. First writer wins: a line some other
    /// task already promoted is left as it is.
    pub async fn promote(&self, key: &str, rendered: Vec<u8>) -> Result<(), CacheError> {
        let mut inner = self.inner.lock().await;
        let line = inner
            .lines
            .get_mut(key)
            .ok_or_else(|| CacheError::NotCached(key.to_string()))?;

        if let Payload::Raw(_) = line.payload {
            line.payload = Payload::Rendered(rendered);
        }

        Ok(())
    }
}

fn snapshot(line: &CacheLine) -> (Vec<u8>, bool) {
    match &line.payload {
        Payload::Rendered(bytes) => (bytes.clone(), true),
        Payload::Raw(bytes) => (bytes.clone(), false),
    }
}

impl CacheInner {
    // strict LRU by access clock; ties (impossible with the logical clock,
    // but cheap to pin down) break on the smaller key
    fn evict_oldest(&mut self) {
        let oldest = self
            .lines
            .iter()
            .min_by(|a, b| {
                a.1.last_used
                    .cmp(&b.1.last_used)
                    .then_with(|| a.0.cmp(b.0))
            })
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            self.lines.remove(&key);
        }
    }
}

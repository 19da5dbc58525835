use crate::cache::{CacheError, PageCache};
use crate::render::Renderer;
use std::sync::Arc;
use std::time::Duration;

/// Decides, per request, whether a cached entry still needs rendering.
///
/// The cache itself is payload-agnostic; the gate is what guarantees the
/// markdown conversion runs at most once per key per cache residency, and
/// that callers always get HTML back.
pub struct RenderGate {
    cache: PageCache,
    renderer: Arc<dyn Renderer>,
    render_timeout: Duration,
}

impl RenderGate {
    pub fn new(cache: PageCache, renderer: Arc<dyn Renderer>, render_timeout: Duration) -> Self {
        Self {
            cache,
            renderer,
            render_timeout,
        }
    }

    pub async fn resolve(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let (bytes, is_rendered) = self.cache.get(key).await?;
        if is_rendered {
            return Ok(bytes);
        }

        // the conversion can be slow, so it runs on the blocking pool with
        // no cache lock held; the line stays raw until promotion
        let renderer = self.renderer.clone();
        let job = tokio::task::spawn_blocking(move || renderer.render(&bytes));

        let html = match tokio::time::timeout(self.render_timeout, job).await {
            Err(_) => {
                return Err(CacheError::Render {
                    key: key.to_string(),
                    reason: "render timed out".to_string(),
                });
            }
            Ok(Err(join_err)) => {
                return Err(CacheError::Render {
                    key: key.to_string(),
                    reason: join_err.to_string(),
                });
            }
            Ok(Ok(Err(e))) => {
                // the line stays raw, a later request re-attempts the render
                return Err(CacheError::Render {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
            Ok(Ok(Ok(html))) => html,
        };

        match self.cache.promote(key, html.clone()).await {
            Ok(()) => {}
            // the line can be evicted while we were rendering; the output is
            // still good, the cache just lost residency
            Err(CacheError::NotCached(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(html)
    }
}

use std::num::NonZeroUsize;

use log::debug;
use lru::LruCache;
use tokio::sync::Mutex;

/// Rendered-page cache keyed by request path plus query string
///
/// Every revalidation bumps a generation counter. A page rendered before a
/// revalidation carries the older generation and is refused by
/// `put_if_current`.
pub struct PageCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    pages: LruCache<String, String>,
    generation: u64,
}

fn path_of(key: &str) -> &str {
    key.split_once('?').map_or(key, |(path, _)| path)
}

impl PageCache {
    /// Create a cache holding at most `capacity` pages (minimum one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        PageCache {
            inner: Mutex::new(CacheInner {
                pages: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().await.pages.get(key).cloned()
    }

    /// Current generation; capture it before reading the store for a render
    pub async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    #[cfg(test)]
    pub async fn put(&self, key: &str, html: String) {
        self.inner.lock().await.pages.put(key.to_string(), html);
    }

    /// Store `html` unless a revalidation happened since `generation` was captured
    pub async fn put_if_current(&self, key: &str, html: String, generation: u64) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!("Discarded stale rendering of {}", key);
            return false;
        }
        inner.pages.put(key.to_string(), html);
        true
    }

    /// Drop every cached rendering of `path`, whatever its query string
    pub async fn revalidate_path(&self, path: &str) {
        let mut inner = self.inner.lock().await;
        inner.generation = inner.generation.wrapping_add(1);
        let pages = &mut inner.pages;
        let stale: Vec<String> = pages
            .iter()
            .filter(|(key, _)| path_of(key) == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            pages.pop(key);
        }
        debug!("Revalidated {} ({} cached pages dropped)", path, stale.len());
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.pages.len()
    }
}

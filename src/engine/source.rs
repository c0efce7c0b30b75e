//! URL to media source lookup
//!
//! The engine only accepts URLs, so each attached source is published under
//! a unique URL in a registry the engine's scheme handler resolves from.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A live stream the engine can play (opaque to GhostRelay)
pub trait MediaSource: Send + Sync {
    fn describe(&self) -> String;
}

/// Map of `<scheme>://<id>` URLs to media sources
pub struct SchemeRegistry {
    scheme: String,
    sources: RwLock<HashMap<String, Arc<dyn MediaSource>>>,
    counter: AtomicU64,
}

impl SchemeRegistry {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            sources: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Publish `source` under a fresh URL and return it
    pub fn register(&self, source: Arc<dyn MediaSource>) -> String {
        let url = self.unique_url();
        tracing::debug!("Registered {} as {}", source.describe(), url);
        self.sources.write().insert(url.clone(), source);
        url
    }

    pub fn resolve(&self, url: &str) -> Option<Arc<dyn MediaSource>> {
        self.sources.read().get(url).cloned()
    }

    pub fn remove(&self, url: &str) -> bool {
        self.sources.write().remove(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn unique_url(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        format!(
            "{}://{:08x}-{:016x}-{:08x}",
            self.scheme,
            std::process::id(),
            nanos,
            seq
        )
    }
}

impl std::fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemeRegistry")
            .field("scheme", &self.scheme)
            .field("sources", &self.len())
            .finish()
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Encoded values collected by the agent during one solve.
#[derive(Clone, Default)]
pub struct EncodedValues(Arc<Mutex<HashSet<String>>>);

impl EncodedValues {
    pub async fn insert(&self, value: impl Into<String>) -> bool {
        self.0.lock().await.insert(value.into())
    }

    pub async fn len(&self) -> usize { self.0.lock().await.len() }

    pub async fn is_empty(&self) -> bool { self.0.lock().await.is_empty() }

    pub async fn snapshot(&self) -> Vec<String> {
        self.0.lock().await.iter().cloned().collect()
    }
}

#[derive(Default)]
struct Inner {
    url_time: HashMap<String, f64>,
    encoded: EncodedValues,
}

/// Per-solve bookkeeping: when each target URL was started and what the
/// agent has collected so far.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<Inner>>,
}

impl SharedStore {
    pub fn new() -> Self { Self::default() }

    /// Drops everything from the previous solve and starts tracking `url`.
    /// The returned accumulator is the only one visible through this store
    /// until the next reset; older handles keep working but are detached.
    pub async fn reset(&self, url: &str, now: f64) -> EncodedValues {
        let mut inner = self.inner.lock().await;
        inner.url_time.clear();
        inner.url_time.insert(url.to_string(), now);
        inner.encoded = EncodedValues::default();
        inner.encoded.clone()
    }

    pub async fn url_time(&self) -> HashMap<String, f64> {
        self.inner.lock().await.url_time.clone()
    }

    pub async fn encoded(&self) -> EncodedValues {
        self.inner.lock().await.encoded.clone()
    }
}

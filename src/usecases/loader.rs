//! Request-scoped coalescing cache.
//!
//! At most one resolution runs per distinct key. Callers that ask for a key
//! already in flight await the same shared future; completed results stay
//! cached until the owning scope is dropped.

use crate::domain::DomainError;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

type Pending<V> = Shared<BoxFuture<'static, Result<V, DomainError>>>;

/// Per-key cache of in-flight or completed resolutions.
pub struct Coalescer<K, V> {
    name: &'static str,
    missing: Option<fn(&K) -> DomainError>,
    entries: Mutex<HashMap<K, Pending<V>>>,
}

impl<K, V> Coalescer<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            missing: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Error for keys a batch response leaves out. Without it such keys fail
    /// with `DomainError::Query`.
    pub fn with_missing(mut self, missing: fn(&K) -> DomainError) -> Self {
        self.missing = Some(missing);
        self
    }

    /// Resolve a single key, running `resolve` only if the key is not cached.
    pub async fn load<F, Fut>(&self, key: K, resolve: F) -> Result<V, DomainError>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, DomainError>> + Send + 'static,
    {
        let pending = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .entry(key.clone())
                .or_insert_with(|| {
                    debug!(loader = self.name, ?key, "resolving key");
                    resolve(key).boxed().shared()
                })
                .clone()
        };
        pending.await
    }

    /// Resolve many keys. Keys not yet cached are handed to `batch` in one
    /// call; results come back in the order of `keys`, one per key.
    pub async fn load_many<F, Fut>(&self, keys: &[K], batch: F) -> Vec<Result<V, DomainError>>
    where
        F: FnOnce(Vec<K>) -> Fut,
        Fut: Future<Output = Result<HashMap<K, V>, DomainError>> + Send + 'static,
    {
        let pending: Vec<Pending<V>> = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            let mut missing_keys: Vec<K> = Vec::new();
            for key in keys {
                if !entries.contains_key(key) && !missing_keys.contains(key) {
                    missing_keys.push(key.clone());
                }
            }

            if !missing_keys.is_empty() {
                debug!(
                    loader = self.name,
                    requested = keys.len(),
                    batched = missing_keys.len(),
                    "dispatching batch"
                );
                let shared_batch = batch(missing_keys.clone())
                    .map(|res| res.map(Arc::new))
                    .boxed()
                    .shared();
                for key in missing_keys {
                    let batch = shared_batch.clone();
                    let missing = self.missing;
                    let name = self.name;
                    let lookup = key.clone();
                    let fut = async move {
                        let values = batch.await?;
                        values.get(&lookup).cloned().ok_or_else(|| match missing {
                            Some(missing) => missing(&lookup),
                            None => DomainError::Query(format!(
                                "{} batch returned no value for {:?}",
                                name, lookup
                            )),
                        })
                    };
                    entries.insert(key, fut.boxed().shared());
                }
            }

            keys.iter()
                .filter_map(|key| entries.get(key).cloned())
                .collect()
        };
        join_all(pending).await
    }
}

//! Opt-in caching decorator for discovery.
//!
//! The router re-discovers on every call. Wrapping a discovery client in
//! `CachedDiscovery` trades topology freshness for fewer registry lookups.
//! Only successful lookups are cached.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{Discovery, InstanceSet, Result};

struct Entry {
    fetched_at: Instant,
    instances: InstanceSet,
}

/// TTL cache around another discovery client.
pub struct CachedDiscovery<D> {
    inner: D,
    ttl: Duration,
    entries: RwLock<HashMap<(String, String), Entry>>,
}

impl<D: Discovery> CachedDiscovery<D> {
    pub fn new(inner: D, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached entry.
    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    /// Drop the cached entry for one service.
    pub async fn invalidate(&self, namespace: &str, service: &str) {
        self.entries
            .write()
            .await
            .remove(&(namespace.to_string(), service.to_string()));
    }
}

#[async_trait]
impl<D: Discovery> Discovery for CachedDiscovery<D> {
    async fn discover(&self, namespace: &str, service: &str) -> Result<InstanceSet> {
        let key = (namespace.to_string(), service.to_string());

        // Check cache
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    debug!(namespace = %namespace, service = %service, "Discovery cache hit");
                    return Ok(entry.instances.clone());
                }
            }
        }

        let instances = self.inner.discover(namespace, service).await?;

        self.entries.write().await.insert(
            key,
            Entry {
                fetched_at: Instant::now(),
                instances: instances.clone(),
            },
        );

        Ok(instances)
    }
}

//! Static service discovery with environment variable configuration.
//!
//! Provides discovery without a remote registry. Instances are registered
//! manually or loaded at startup from configuration / environment.
//!
//! # Environment Variable Configuration
//!
//! ```bash
//! SVCDISPATCH_INSTANCES='[
//!   {"namespace":"billing","service":"invoices","id":"render","type":"function","arn":"arn:aws:lambda:..."},
//!   {"service":"jobs","id":"jobs","type":"queue","url":"https://sqs.../jobs"}
//! ]'
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Discovery, DiscoveredInstance, DiscoveryError, InstanceSet, Result};
use crate::config::StaticInstanceConfig;

/// Environment variable holding a JSON array of static instances.
pub const INSTANCES_ENV_VAR: &str = "SVCDISPATCH_INSTANCES";

type Key = (String, String);

/// In-memory discovery keyed by `(namespace, service)`.
#[derive(Default)]
pub struct StaticDiscovery {
    services: RwLock<HashMap<Key, InstanceSet>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration, usable outside a runtime.
    pub fn with_instance(
        mut self,
        namespace: impl Into<String>,
        service: impl Into<String>,
        instance: DiscoveredInstance,
    ) -> Self {
        self.services
            .get_mut()
            .entry((namespace.into(), service.into()))
            .or_default()
            .push(instance);
        self
    }

    /// Build from configuration entries.
    pub fn from_entries(entries: &[StaticInstanceConfig]) -> Self {
        let mut discovery = Self::new();
        for entry in entries {
            debug!(
                namespace = %entry.namespace,
                service = %entry.service,
                id = %entry.id,
                "Registered static instance"
            );
            discovery = discovery.with_instance(
                entry.namespace.clone(),
                entry.service.clone(),
                entry.to_instance(),
            );
        }
        discovery
    }

    /// Configured entries followed by any from `SVCDISPATCH_INSTANCES`.
    pub fn from_config(entries: &[StaticInstanceConfig]) -> Result<Self> {
        let mut all = entries.to_vec();
        if let Ok(json) = std::env::var(INSTANCES_ENV_VAR) {
            let from_env: Vec<StaticInstanceConfig> = serde_json::from_str(&json)
                .map_err(|e| DiscoveryError::InvalidConfig(format!("{}: {}", INSTANCES_ENV_VAR, e)))?;
            all.extend(from_env);
        }
        info!(instances = all.len(), "Static discovery initialized");
        Ok(Self::from_entries(&all))
    }

    /// Create from the `SVCDISPATCH_INSTANCES` environment variable.
    ///
    /// A missing variable yields an empty registry.
    pub fn from_env() -> Result<Self> {
        match std::env::var(INSTANCES_ENV_VAR) {
            Ok(json) => Self::from_json(&json),
            Err(_) => {
                warn!(var = INSTANCES_ENV_VAR, "No static instances configured");
                Ok(Self::new())
            }
        }
    }

    /// Parse a JSON array of instance entries.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<StaticInstanceConfig> = serde_json::from_str(json)
            .map_err(|e| DiscoveryError::InvalidConfig(e.to_string()))?;
        let discovery = Self::from_entries(&entries);
        info!(instances = entries.len(), "Static discovery initialized");
        Ok(discovery)
    }

    pub async fn register(
        &self,
        namespace: &str,
        service: &str,
        instance: DiscoveredInstance,
    ) {
        info!(
            namespace = %namespace,
            service = %service,
            id = %instance.id,
            "Registering static instance"
        );
        self.services
            .write()
            .await
            .entry((namespace.to_string(), service.to_string()))
            .or_default()
            .push(instance);
    }

    /// Remove one instance by id; returns whether anything was removed.
    pub async fn deregister(&self, namespace: &str, service: &str, id: &str) -> bool {
        let mut services = self.services.write().await;
        let key = (namespace.to_string(), service.to_string());
        let Some(instances) = services.get_mut(&key) else {
            return false;
        };
        let before = instances.len();
        instances.retain(|i| i.id != id);
        let removed = instances.len() != before;
        if instances.is_empty() {
            services.remove(&key);
        }
        removed
    }

    /// Number of registered `(namespace, service)` pairs.
    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self, namespace: &str, service: &str) -> Result<InstanceSet> {
        let services = self.services.read().await;
        Ok(services
            .get(&(namespace.to_string(), service.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

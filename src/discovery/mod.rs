//! Service discovery.
//!
//! Provides the discovery boundary the router resolves through:
//! - `Discovery` trait: instances for a `(namespace, service)` pair
//! - `StaticDiscovery`: in-memory registry loaded from config or env
//! - `CachedDiscovery`: opt-in TTL cache decorator around any discovery
//! - `CloudMapDiscovery`: AWS Cloud Map lookup (`aws` feature)

use std::sync::Arc;

use async_trait::async_trait;

pub mod cached;
#[cfg(feature = "aws")]
pub mod cloud_map;
pub mod instance;
pub mod static_discovery;

pub use cached::CachedDiscovery;
#[cfg(feature = "aws")]
pub use cloud_map::CloudMapDiscovery;
pub use instance::{BackendKind, DiscoveredInstance, InstanceSet, UnknownKind};
pub use static_discovery::StaticDiscovery;

/// Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Error types for service discovery.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Registry lookup failed for {namespace}.{service}: {message}")]
    Lookup {
        namespace: String,
        service: String,
        message: String,
    },

    #[error("Invalid static instance configuration: {0}")]
    InvalidConfig(String),
}

/// Lookup of live backend instances.
///
/// An unknown service is an empty set, not an error; errors are reserved for
/// registry failures.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, namespace: &str, service: &str) -> Result<InstanceSet>;
}

#[async_trait]
impl<T: Discovery + ?Sized> Discovery for Arc<T> {
    async fn discover(&self, namespace: &str, service: &str) -> Result<InstanceSet> {
        (**self).discover(namespace, service).await
    }
}

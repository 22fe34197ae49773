//! The client-facing router.
//!
//! Every operation follows the same path: parse the address, discover the
//! service's instances, select one, dispatch by backend kind. Nothing is kept
//! between calls, so each call sees the registry's current topology unless
//! the discovery client is wrapped in a `CachedDiscovery`.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::adapters::{Backends, PublishReceipt, ReceiveSettings, SendOptions};
use crate::address::{CallTarget, ServiceAddress, DEFAULT_NAMESPACE};
use crate::config::{Config, DiscoveryType};
use crate::discovery::{
    BackendKind, CachedDiscovery, Discovery, DiscoveryError, InstanceSet, StaticDiscovery,
};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::listen::ListenSession;
use crate::selector::{select, select_kind};

/// Envelope for a request/response call.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// `[namespace.]service`, optionally with `->handler`.
    pub service: String,
    /// Instance id; takes precedence over a handler in `service`.
    pub handler: Option<String>,
    pub body: Value,
}

impl DispatchRequest {
    pub fn new(service: impl Into<String>, body: Value) -> Self {
        Self {
            service: service.into(),
            handler: None,
            body,
        }
    }

    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }
}

/// Routes logical service addresses to discovered backends.
#[derive(Clone)]
pub struct Router {
    discovery: Arc<dyn Discovery>,
    dispatcher: Dispatcher,
    default_namespace: String,
}

impl Router {
    pub fn new(discovery: Arc<dyn Discovery>, backends: Backends) -> Self {
        Self {
            discovery,
            dispatcher: Dispatcher::new(backends),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// Namespace used for addresses that omit one.
    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn with_listen_settings(mut self, settings: ReceiveSettings) -> Self {
        self.dispatcher = self.dispatcher.with_receive_settings(settings);
        self
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Build a router over the given adapters using configured discovery.
    ///
    /// Only static discovery can be built this way; Cloud Map needs the SDK
    /// config that `from_config` loads.
    pub fn from_config_with_backends(config: &Config, backends: Backends) -> Result<Self> {
        let discovery: Arc<dyn Discovery> = match config.discovery.discovery_type {
            DiscoveryType::Static => {
                Arc::new(StaticDiscovery::from_config(&config.discovery.services)?)
            }
            DiscoveryType::CloudMap => {
                return Err(DiscoveryError::InvalidConfig(
                    "cloud_map discovery requires the aws feature".to_string(),
                )
                .into())
            }
        };
        Ok(Self::assemble(config, discovery, backends))
    }

    /// Build a fully AWS-backed router from configuration.
    #[cfg(feature = "aws")]
    pub async fn from_config(config: &Config) -> Result<Self> {
        use crate::adapters::aws::{load_sdk_config, AwsBackends};
        use crate::discovery::CloudMapDiscovery;

        let sdk_config = load_sdk_config(&config.aws).await;
        let backends = AwsBackends::from_sdk_config(&sdk_config);

        let discovery: Arc<dyn Discovery> = match config.discovery.discovery_type {
            DiscoveryType::Static => {
                Arc::new(StaticDiscovery::from_config(&config.discovery.services)?)
            }
            DiscoveryType::CloudMap => {
                let mut cloud_map = CloudMapDiscovery::from_sdk_config(&sdk_config);
                if let Some(stage) = &config.stage {
                    cloud_map = cloud_map.with_stage(stage.clone());
                }
                Arc::new(cloud_map)
            }
        };
        Ok(Self::assemble(config, discovery, backends))
    }

    fn assemble(config: &Config, discovery: Arc<dyn Discovery>, backends: Backends) -> Self {
        let cache = &config.discovery.cache;
        let discovery: Arc<dyn Discovery> = if cache.enabled {
            info!(ttl_secs = cache.ttl_secs, "Discovery cache enabled");
            Arc::new(CachedDiscovery::new(discovery, cache.ttl()))
        } else {
            discovery
        };

        info!(
            discovery = ?config.discovery.discovery_type,
            default_namespace = %config.default_namespace,
            stage = ?config.stage,
            "Router configured"
        );

        Self::new(discovery, backends)
            .with_default_namespace(config.default_namespace.clone())
            .with_listen_settings(config.listen.to_receive_settings())
    }

    /// Invoke a function, state machine or automation document.
    #[tracing::instrument(skip_all, fields(service = %request.service))]
    pub async fn call(&self, request: DispatchRequest) -> Result<Value> {
        let target = CallTarget::parse_with_default(&request.service, &self.default_namespace)?;
        let handler = request.handler.or(target.handler);
        self.dispatch_request(&target.address, handler.as_deref(), &request.body)
            .await
    }

    /// Call `[namespace.]service->handler` with `body`.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn request(&self, address: &str, body: Value) -> Result<Value> {
        let target = CallTarget::parse_with_default(address, &self.default_namespace)?;
        self.dispatch_request(&target.address, target.handler.as_deref(), &body)
            .await
    }

    /// Publish `event` to the sns instance behind `[namespace.]topic`.
    pub async fn publish(&self, address: &str, event: Value) -> Result<PublishReceipt> {
        self.publish_with(address, event, SendOptions::default())
            .await
    }

    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn publish_with(
        &self,
        address: &str,
        event: Value,
        options: SendOptions,
    ) -> Result<PublishReceipt> {
        let address = self.parse(address)?;
        let instances = self.discover(&address).await?;
        let instance = select_kind(address.service(), &instances, BackendKind::Sns)?;
        self.dispatcher.publish(instance, &event, &options).await
    }

    /// Send `message` to the queue behind `[namespace.]queue`.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn queue(
        &self,
        address: &str,
        message: Value,
        options: Option<SendOptions>,
    ) -> Result<PublishReceipt> {
        let address = self.parse(address)?;
        let instances = self.discover(&address).await?;
        let instance = select_kind(address.service(), &instances, BackendKind::Queue)?;
        self.dispatcher
            .send(instance, &message, &options.unwrap_or_default())
            .await
    }

    /// Open a listen session on the queue behind `[namespace.]queue`.
    ///
    /// Receive failures after this returns are reported through the session,
    /// not here.
    #[tracing::instrument(skip_all, fields(address = %address))]
    pub async fn listen(&self, address: &str) -> Result<ListenSession> {
        let address = self.parse(address)?;
        let instances = self.discover(&address).await?;
        let instance = select_kind(address.service(), &instances, BackendKind::Queue)?;
        self.dispatcher.listen(instance)
    }

    fn parse(&self, address: &str) -> Result<ServiceAddress> {
        Ok(ServiceAddress::parse_with_default(
            address,
            &self.default_namespace,
        )?)
    }

    async fn discover(&self, address: &ServiceAddress) -> Result<InstanceSet> {
        let instances = self
            .discovery
            .discover(address.namespace(), address.service())
            .await?;
        debug!(
            namespace = %address.namespace(),
            service = %address.service(),
            instances = instances.len(),
            "Discovered instances"
        );
        Ok(instances)
    }

    async fn dispatch_request(
        &self,
        address: &ServiceAddress,
        handler: Option<&str>,
        body: &Value,
    ) -> Result<Value> {
        let instances = self.discover(address).await?;
        let instance = select(address.service(), &instances, handler)?;
        self.dispatcher.request(instance, body).await
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("dispatcher", &self.dispatcher)
            .field("default_namespace", &self.default_namespace)
            .finish()
    }
}

//! AWS Cloud Map discovery.
//!
//! Resolves `(namespace, service)` with `DiscoverInstances`. When a stage is
//! configured the registry namespace is `{namespace}-{stage}`, so one
//! logical namespace maps onto per-environment registries.

use async_trait::async_trait;
use aws_sdk_servicediscovery::operation::discover_instances::DiscoverInstancesError;
use aws_sdk_servicediscovery::Client;
use tracing::debug;

use super::{Discovery, DiscoveredInstance, DiscoveryError, InstanceSet, Result};

/// Discovery backed by Cloud Map HTTP namespaces.
pub struct CloudMapDiscovery {
    client: Client,
    stage: Option<String>,
}

impl CloudMapDiscovery {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            stage: None,
        }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Registry namespace queried for a logical namespace.
    pub fn registry_namespace(&self, namespace: &str) -> String {
        qualify_namespace(namespace, self.stage.as_deref())
    }
}

fn qualify_namespace(namespace: &str, stage: Option<&str>) -> String {
    match stage {
        Some(stage) => format!("{}-{}", namespace, stage),
        None => namespace.to_string(),
    }
}

/// Whether a lookup failure means the service or its namespace does not exist.
fn is_unknown_service(err: &DiscoverInstancesError) -> bool {
    matches!(
        err,
        DiscoverInstancesError::ServiceNotFound(_) | DiscoverInstancesError::NamespaceNotFound(_)
    )
}

#[async_trait]
impl Discovery for CloudMapDiscovery {
    async fn discover(&self, namespace: &str, service: &str) -> Result<InstanceSet> {
        let registry_namespace = self.registry_namespace(namespace);

        let result = self
            .client
            .discover_instances()
            .namespace_name(&registry_namespace)
            .service_name(service)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(is_unknown_service) => {
                debug!(
                    namespace = %registry_namespace,
                    service = %service,
                    "Service not registered"
                );
                return Ok(InstanceSet::new());
            }
            Err(e) => {
                return Err(DiscoveryError::Lookup {
                    namespace: registry_namespace,
                    service: service.to_string(),
                    message: e.to_string(),
                })
            }
        };

        let instances: InstanceSet = output
            .instances()
            .iter()
            .filter_map(|summary| {
                let id = summary.instance_id()?;
                Some(DiscoveredInstance {
                    id: id.to_string(),
                    attributes: summary.attributes().cloned().unwrap_or_default(),
                })
            })
            .collect();

        debug!(
            namespace = %registry_namespace,
            service = %service,
            instances = instances.len(),
            "Discovered instances"
        );

        Ok(instances)
    }
}

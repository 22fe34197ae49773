//! Backend type dispatch.
//!
//! A selected instance is converted into a closed `Backend` variant and the
//! matching adapter is called. There is no fallthrough: an instance whose
//! kind or locator cannot be resolved, or whose kind does not serve the
//! requested operation, fails with `UnsupportedBackend`.
//!
//! Payloads and options pass through untouched; results come back exactly as
//! the adapter produced them.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::adapters::{Backends, PublishReceipt, ReceiveSettings, SendOptions};
use crate::discovery::{BackendKind, DiscoveredInstance};
use crate::error::{Operation, Result, RouterError};
use crate::listen::ListenSession;

/// A dispatchable backend resolved from an instance's attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Function { arn: String },
    StateMachine { arn: String },
    Automation { document: String },
    Topic { arn: String },
    Queue { url: String },
}

impl Backend {
    /// Resolve an instance's declared kind and locator.
    pub fn resolve(instance: &DiscoveredInstance, operation: Operation) -> Result<Self> {
        let unsupported = |reason: String| RouterError::UnsupportedBackend {
            operation,
            instance: instance.id.clone(),
            reason,
        };

        let tag = instance
            .type_tag()
            .ok_or_else(|| unsupported("no type attribute".to_string()))?;
        let kind: BackendKind = tag
            .parse()
            .map_err(|_| unsupported(format!("unknown type '{}'", tag)))?;
        let locator = instance
            .locator(kind)
            .ok_or_else(|| unsupported(format!("{} instance has no locator", kind)))?
            .to_string();

        Ok(match kind {
            BackendKind::Function => Backend::Function { arn: locator },
            BackendKind::StateMachine => Backend::StateMachine { arn: locator },
            BackendKind::Automation => Backend::Automation { document: locator },
            BackendKind::Sns => Backend::Topic { arn: locator },
            BackendKind::Queue => Backend::Queue { url: locator },
        })
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Function { .. } => BackendKind::Function,
            Backend::StateMachine { .. } => BackendKind::StateMachine,
            Backend::Automation { .. } => BackendKind::Automation,
            Backend::Topic { .. } => BackendKind::Sns,
            Backend::Queue { .. } => BackendKind::Queue,
        }
    }
}

/// Routes calls on a selected instance to the adapter for its kind.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    backends: Backends,
    receive: ReceiveSettings,
}

impl Dispatcher {
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            receive: ReceiveSettings::default(),
        }
    }

    pub fn with_receive_settings(mut self, receive: ReceiveSettings) -> Self {
        self.receive = receive;
        self
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    /// Request/response dispatch for function, state machine and automation
    /// instances.
    pub async fn request(&self, instance: &DiscoveredInstance, body: &Value) -> Result<Value> {
        let op = Operation::Call;
        let backend = Backend::resolve(instance, op)?;
        debug!(instance = %instance.id, kind = %backend.kind(), "Dispatching request");

        let result = match &backend {
            Backend::Function { arn } => {
                configured(&self.backends.functions, instance, op, backend.kind())?
                    .invoke(arn, body)
                    .await?
            }
            Backend::StateMachine { arn } => {
                configured(&self.backends.state_machines, instance, op, backend.kind())?
                    .start_execution(arn, body)
                    .await?
            }
            Backend::Automation { document } => {
                configured(&self.backends.automation, instance, op, backend.kind())?
                    .run(document, body)
                    .await?
            }
            Backend::Topic { .. } | Backend::Queue { .. } => {
                return Err(mismatch(instance, op, backend.kind()))
            }
        };
        Ok(result)
    }

    /// Publish to an sns instance.
    pub async fn publish(
        &self,
        instance: &DiscoveredInstance,
        event: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt> {
        let op = Operation::Publish;
        let arn = match Backend::resolve(instance, op)? {
            Backend::Topic { arn } => arn,
            other => return Err(mismatch(instance, op, other.kind())),
        };
        debug!(instance = %instance.id, topic_arn = %arn, "Dispatching publish");

        let topics = configured(&self.backends.topics, instance, op, BackendKind::Sns)?;
        Ok(topics.publish(&arn, event, options).await?)
    }

    /// Send to a queue instance.
    pub async fn send(
        &self,
        instance: &DiscoveredInstance,
        message: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt> {
        let op = Operation::Queue;
        let url = match Backend::resolve(instance, op)? {
            Backend::Queue { url } => url,
            other => return Err(mismatch(instance, op, other.kind())),
        };
        debug!(instance = %instance.id, queue_url = %url, "Dispatching send");

        let queues = configured(&self.backends.queues, instance, op, BackendKind::Queue)?;
        Ok(queues.send(&url, message, options).await?)
    }

    /// Open a listen session on a queue instance.
    pub fn listen(&self, instance: &DiscoveredInstance) -> Result<ListenSession> {
        let op = Operation::Listen;
        let url = match Backend::resolve(instance, op)? {
            Backend::Queue { url } => url,
            other => return Err(mismatch(instance, op, other.kind())),
        };

        let queues = configured(&self.backends.queues, instance, op, BackendKind::Queue)?;
        Ok(ListenSession::start(url, queues.clone(), self.receive.clone()))
    }
}

/// The adapter in `slot`, or `UnsupportedBackend` when none is configured.
fn configured<'a, T: ?Sized>(
    slot: &'a Option<Arc<T>>,
    instance: &DiscoveredInstance,
    operation: Operation,
    kind: BackendKind,
) -> Result<&'a Arc<T>> {
    slot.as_ref().ok_or_else(|| RouterError::UnsupportedBackend {
        operation,
        instance: instance.id.clone(),
        reason: format!("no {} adapter configured", kind),
    })
}

fn mismatch(instance: &DiscoveredInstance, operation: Operation, kind: BackendKind) -> RouterError {
    RouterError::UnsupportedBackend {
        operation,
        instance: instance.id.clone(),
        reason: format!("{} instances do not support {}", kind, operation),
    }
}

//! Backend adapters.
//!
//! This module contains:
//! - One trait per backend operation (function invoke, state machine start,
//!   automation run, topic publish, queue send/receive/delete)
//! - `Backends`: the set of adapters a router dispatches to
//! - Implementations: mock (testing), AWS SDK (`aws` feature)
//!
//! Payloads are opaque `serde_json::Value`s; adapters own serialization.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "aws")]
pub mod aws;
pub mod mock;

#[cfg(feature = "aws")]
pub use aws::AwsBackends;
pub use mock::{MockFunctions, MockQueue, MockStateMachines, MockAutomation, MockTopics};

// ============================================================================
// Types
// ============================================================================

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors raised by backend adapters.
///
/// The router surfaces these unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("Function invocation failed: {0}")]
    Invoke(String),

    #[error("Function returned {kind}: {payload}")]
    FunctionError { kind: String, payload: String },

    #[error("State machine execution failed to start: {0}")]
    StartExecution(String),

    #[error("Automation execution failed to start: {0}")]
    Automation(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(e: serde_json::Error) -> Self {
        AdapterError::Serialization(e.to_string())
    }
}

/// Options forwarded verbatim to topic publish and queue send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendOptions {
    /// Ordering group for FIFO topics/queues.
    pub group_id: Option<String>,
    /// Deduplication id for FIFO topics/queues.
    pub deduplication_id: Option<String>,
    /// Per-message delay (queues only).
    pub delay_seconds: Option<i32>,
    /// String message attributes.
    pub attributes: HashMap<String, String>,
}

impl SendOptions {
    pub fn fifo(group_id: impl Into<String>, deduplication_id: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            deduplication_id: Some(deduplication_id.into()),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Result of a publish or queue send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishReceipt {
    pub message_id: String,
}

impl PublishReceipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// Long-poll parameters for one receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveSettings {
    pub max_messages: i32,
    pub wait_time_secs: i32,
    pub visibility_timeout_secs: Option<i32>,
}

impl Default for ReceiveSettings {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time_secs: 20,
            visibility_timeout_secs: None,
        }
    }
}

/// A message as returned by a queue receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    /// Handle required to delete the message; absent handles cannot be acked.
    pub receipt_handle: Option<String>,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

/// Render an opaque payload as a message body.
///
/// Strings are sent verbatim; everything else is JSON-encoded.
pub fn message_body(payload: &Value) -> Result<String> {
    match payload {
        Value::String(s) => Ok(s.clone()),
        other => Ok(serde_json::to_string(other)?),
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Synchronous function invocation.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, arn: &str, body: &Value) -> Result<Value>;
}

/// State machine execution start.
#[async_trait]
pub trait StateMachineStarter: Send + Sync {
    async fn start_execution(&self, arn: &str, input: &Value) -> Result<Value>;
}

/// Automation document run.
#[async_trait]
pub trait AutomationRunner: Send + Sync {
    async fn run(&self, document: &str, parameters: &Value) -> Result<Value>;
}

/// Topic publish.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    async fn publish(
        &self,
        arn: &str,
        event: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt>;
}

/// Queue send plus the receive/delete primitives listen sessions poll with.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn send(&self, url: &str, message: &Value, options: &SendOptions)
        -> Result<PublishReceipt>;

    async fn receive(&self, url: &str, settings: &ReceiveSettings)
        -> Result<Vec<ReceivedMessage>>;

    async fn delete(&self, url: &str, receipt_handle: &str) -> Result<()>;
}

// ============================================================================
// Registry
// ============================================================================

/// Adapters available to a router, one optional slot per backend kind.
#[derive(Clone, Default)]
pub struct Backends {
    pub functions: Option<Arc<dyn FunctionInvoker>>,
    pub state_machines: Option<Arc<dyn StateMachineStarter>>,
    pub automation: Option<Arc<dyn AutomationRunner>>,
    pub topics: Option<Arc<dyn TopicPublisher>>,
    pub queues: Option<Arc<dyn QueueClient>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(mut self, adapter: Arc<dyn FunctionInvoker>) -> Self {
        self.functions = Some(adapter);
        self
    }

    pub fn with_state_machines(mut self, adapter: Arc<dyn StateMachineStarter>) -> Self {
        self.state_machines = Some(adapter);
        self
    }

    pub fn with_automation(mut self, adapter: Arc<dyn AutomationRunner>) -> Self {
        self.automation = Some(adapter);
        self
    }

    pub fn with_topics(mut self, adapter: Arc<dyn TopicPublisher>) -> Self {
        self.topics = Some(adapter);
        self
    }

    pub fn with_queues(mut self, adapter: Arc<dyn QueueClient>) -> Self {
        self.queues = Some(adapter);
        self
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("functions", &self.functions.is_some())
            .field("state_machines", &self.state_machines.is_some())
            .field("automation", &self.automation.is_some())
            .field("topics", &self.topics.is_some())
            .field("queues", &self.queues.is_some())
            .finish()
    }
}

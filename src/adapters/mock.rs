//! Mock adapters for testing.
//!
//! Each mock records the calls it receives and returns a configurable
//! response, or fails when told to.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use super::{
    message_body, AdapterError, AutomationRunner, FunctionInvoker, PublishReceipt, QueueClient,
    ReceiveSettings, ReceivedMessage, Result, SendOptions, StateMachineStarter, TopicPublisher,
};

/// How long an empty mock receive waits for a message before returning.
const EMPTY_RECEIVE_WAIT: Duration = Duration::from_millis(10);

/// Shared request/response recorder for the value-returning mocks.
#[derive(Default)]
struct Recorder {
    calls: RwLock<Vec<(String, Value)>>,
    response: RwLock<Value>,
    failure: RwLock<Option<AdapterError>>,
}

impl Recorder {
    async fn record(&self, locator: &str, body: &Value) -> Result<Value> {
        self.calls
            .write()
            .await
            .push((locator.to_string(), body.clone()));
        if let Some(err) = self.failure.read().await.clone() {
            return Err(err);
        }
        Ok(self.response.read().await.clone())
    }
}

macro_rules! value_mock {
    ($(#[$doc:meta])* $name:ident, $trait:ident, $method:ident) => {
        $(#[$doc])*
        #[derive(Default)]
        pub struct $name {
            recorder: Recorder,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Return `response` from every subsequent call.
            pub async fn set_response(&self, response: Value) {
                *self.recorder.response.write().await = response;
            }

            /// Fail every subsequent call with `error`; `None` clears it.
            pub async fn set_failure(&self, error: Option<AdapterError>) {
                *self.recorder.failure.write().await = error;
            }

            /// `(locator, payload)` pairs received so far.
            pub async fn calls(&self) -> Vec<(String, Value)> {
                self.recorder.calls.read().await.clone()
            }
        }

        #[async_trait]
        impl $trait for $name {
            async fn $method(&self, locator: &str, body: &Value) -> Result<Value> {
                self.recorder.record(locator, body).await
            }
        }
    };
}

value_mock!(
    /// Mock function invoker.
    MockFunctions,
    FunctionInvoker,
    invoke
);
value_mock!(
    /// Mock state machine starter.
    MockStateMachines,
    StateMachineStarter,
    start_execution
);
value_mock!(
    /// Mock automation runner.
    MockAutomation,
    AutomationRunner,
    run
);

/// Mock topic publisher.
#[derive(Default)]
pub struct MockTopics {
    published: RwLock<Vec<(String, Value, SendOptions)>>,
    message_id: RwLock<Option<String>>,
    failure: RwLock<Option<AdapterError>>,
}

impl MockTopics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed message id instead of a random one.
    pub async fn set_message_id(&self, id: impl Into<String>) {
        *self.message_id.write().await = Some(id.into());
    }

    pub async fn set_failure(&self, error: Option<AdapterError>) {
        *self.failure.write().await = error;
    }

    pub async fn published(&self) -> Vec<(String, Value, SendOptions)> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl TopicPublisher for MockTopics {
    async fn publish(
        &self,
        arn: &str,
        event: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt> {
        if let Some(err) = self.failure.read().await.clone() {
            return Err(err);
        }
        self.published
            .write()
            .await
            .push((arn.to_string(), event.clone(), options.clone()));
        let id = self
            .message_id
            .read()
            .await
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(PublishReceipt::new(id))
    }
}

/// In-memory queue.
///
/// Sent messages become receivable; `push` injects messages directly.
/// Receives return at most `max_messages` and wait briefly when empty.
#[derive(Default)]
pub struct MockQueue {
    sent: RwLock<Vec<(String, Value, SendOptions)>>,
    pending: RwLock<VecDeque<ReceivedMessage>>,
    arrived: Notify,
    deleted: RwLock<Vec<String>>,
    receive_calls: AtomicUsize,
    receive_failure: RwLock<Option<AdapterError>>,
    send_failure: RwLock<Option<AdapterError>>,
    delete_failure: RwLock<Option<AdapterError>>,
}

impl MockQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a message available to the next receive; returns its id.
    pub async fn push(&self, body: impl Into<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.pending.write().await.push_back(ReceivedMessage {
            message_id: message_id.clone(),
            receipt_handle: Some(format!("receipt-{}", message_id)),
            body: body.into(),
            attributes: Default::default(),
        });
        self.arrived.notify_one();
        message_id
    }

    pub async fn set_receive_failure(&self, error: Option<AdapterError>) {
        *self.receive_failure.write().await = error;
    }

    pub async fn set_send_failure(&self, error: Option<AdapterError>) {
        *self.send_failure.write().await = error;
    }

    pub async fn set_delete_failure(&self, error: Option<AdapterError>) {
        *self.delete_failure.write().await = error;
    }

    pub async fn sent(&self) -> Vec<(String, Value, SendOptions)> {
        self.sent.read().await.clone()
    }

    /// Receipt handles deleted so far, in order.
    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    async fn take_batch(&self, max: usize) -> Vec<ReceivedMessage> {
        let mut pending = self.pending.write().await;
        let n = max.min(pending.len());
        pending.drain(..n).collect()
    }
}

#[async_trait]
impl QueueClient for MockQueue {
    async fn send(
        &self,
        url: &str,
        message: &Value,
        options: &SendOptions,
    ) -> Result<PublishReceipt> {
        if let Some(err) = self.send_failure.read().await.clone() {
            return Err(err);
        }
        let body = message_body(message)?;
        self.sent
            .write()
            .await
            .push((url.to_string(), message.clone(), options.clone()));
        let id = self.push(body).await;
        Ok(PublishReceipt::new(id))
    }

    async fn receive(
        &self,
        _url: &str,
        settings: &ReceiveSettings,
    ) -> Result<Vec<ReceivedMessage>> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.receive_failure.read().await.clone() {
            return Err(err);
        }

        let max = settings.max_messages.max(1) as usize;
        let batch = self.take_batch(max).await;
        if !batch.is_empty() {
            return Ok(batch);
        }

        let _ = tokio::time::timeout(EMPTY_RECEIVE_WAIT, self.arrived.notified()).await;
        Ok(self.take_batch(max).await)
    }

    async fn delete(&self, _url: &str, receipt_handle: &str) -> Result<()> {
        if let Some(err) = self.delete_failure.read().await.clone() {
            return Err(err);
        }
        self.deleted.write().await.push(receipt_handle.to_string());
        Ok(())
    }
}

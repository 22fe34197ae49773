//! Messages delivered by a listen session.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::adapters::{AdapterError, QueueClient, ReceivedMessage};

struct MessageInner {
    received: ReceivedMessage,
    queue_url: String,
    queue: Arc<dyn QueueClient>,
    deleted: AtomicBool,
    deleting: Mutex<()>,
}

/// One inbound queue message.
///
/// Clones share acknowledgment state, so a successful `delete` reaches the
/// queue once per message no matter how many clones call it.
#[derive(Clone)]
pub struct QueueMessage {
    inner: Arc<MessageInner>,
}

impl QueueMessage {
    pub(crate) fn new(
        received: ReceivedMessage,
        queue_url: String,
        queue: Arc<dyn QueueClient>,
    ) -> Self {
        Self {
            inner: Arc::new(MessageInner {
                received,
                queue_url,
                queue,
                deleted: AtomicBool::new(false),
                deleting: Mutex::new(()),
            }),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.inner.received.message_id
    }

    /// Raw message body.
    pub fn body(&self) -> &str {
        &self.inner.received.body
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.body())
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.inner.received.attributes
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::SeqCst)
    }

    /// Acknowledge the message by deleting it from the queue.
    ///
    /// Repeat calls after a successful delete are no-ops. Concurrent calls
    /// wait for the one in flight; if it fails the next caller retries. A
    /// failed delete leaves the message unacknowledged.
    pub async fn delete(&self) -> Result<(), AdapterError> {
        let _deleting = self.inner.deleting.lock().await;
        if self.is_deleted() {
            debug!(message_id = %self.message_id(), "Message already deleted");
            return Ok(());
        }

        match self.inner.received.receipt_handle.as_deref() {
            Some(receipt) => {
                self.inner
                    .queue
                    .delete(&self.inner.queue_url, receipt)
                    .await?
            }
            None => {
                return Err(AdapterError::Delete(format!(
                    "message {} has no receipt handle",
                    self.message_id()
                )))
            }
        }

        self.inner.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for QueueMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueMessage")
            .field("message_id", &self.message_id())
            .field("queue_url", &self.inner.queue_url)
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

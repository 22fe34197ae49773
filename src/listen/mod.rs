//! Queue listen sessions.
//!
//! A `ListenSession` turns a queue's receive primitive into push-style
//! delivery with explicit lifecycle control:
//! - one poll task per session, started when the session is created
//! - polling begins once a message handler is registered
//! - strictly sequential delivery: a handler future completes before the
//!   next message is delivered or fetched
//! - `stop()` is terminal; the in-flight receive completes but nothing
//!   more is delivered
//! - receive errors are fatal and end the session; handler errors are not

mod message;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use message::QueueMessage;

use crate::adapters::{AdapterError, QueueClient, ReceiveSettings};

/// Error type handlers may return.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler for messages delivered by a listen session.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: QueueMessage) -> BoxFuture<'static, Result<(), HandlerError>>;
}

struct FnHandler<F>(F);

impl<F, Fut> MessageHandler for FnHandler<F>
where
    F: Fn(QueueMessage) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle(&self, message: QueueMessage) -> BoxFuture<'static, Result<(), HandlerError>> {
        Box::pin((self.0)(message))
    }
}

/// Session-level events reported to the error handler.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A handler failed; the message was left unacknowledged.
    ProcessingError { message_id: String, error: String },
    /// Receiving failed; the session has stopped.
    Fatal(AdapterError),
}

type ErrorHandler = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Stopped,
}

#[derive(Debug, Clone)]
enum Lifecycle {
    Active,
    Stopped,
    Failed(AdapterError),
}

struct SessionInner {
    queue_url: String,
    lifecycle: watch::Sender<Lifecycle>,
    handler: watch::Sender<Option<Arc<dyn MessageHandler>>>,
    error_handler: watch::Sender<Option<ErrorHandler>>,
}

impl SessionInner {
    fn is_active(&self) -> bool {
        matches!(*self.lifecycle.borrow(), Lifecycle::Active)
    }

    fn current_handler(&self) -> Option<Arc<dyn MessageHandler>> {
        self.handler.borrow().clone()
    }

    fn stop(&self) {
        let stopped = self.lifecycle.send_if_modified(|state| {
            if matches!(state, Lifecycle::Active) {
                *state = Lifecycle::Stopped;
                true
            } else {
                false
            }
        });
        if stopped {
            info!(queue_url = %self.queue_url, "Listen session stopped");
        }
    }

    fn fail(&self, err: AdapterError) {
        let failed = self.lifecycle.send_if_modified(|state| {
            if matches!(state, Lifecycle::Active) {
                *state = Lifecycle::Failed(err.clone());
                true
            } else {
                false
            }
        });
        if failed {
            error!(queue_url = %self.queue_url, error = %err, "Listen session failed");
            self.emit(&SessionEvent::Fatal(err));
        }
    }

    fn emit(&self, event: &SessionEvent) {
        let handler = self.error_handler.borrow().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }

    /// Release handler slots so closures capturing a stop handle don't form
    /// a cycle that outlives the poll task.
    fn release_handlers(&self) {
        self.handler.send_replace(None);
        self.error_handler.send_replace(None);
    }
}

/// A live subscription to one queue.
///
/// Cheap to clone; all clones control the same session. The poll task owns
/// the session too, so it keeps running after every handle is dropped,
/// until `stop()` or a fatal receive error.
#[derive(Clone)]
pub struct ListenSession {
    inner: Arc<SessionInner>,
}

/// Stop control for use inside handlers.
#[derive(Clone)]
pub struct StopHandle {
    inner: Arc<SessionInner>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }
}

impl ListenSession {
    /// Start a session over `queue_url`. Must be called within a tokio
    /// runtime.
    pub fn start(
        queue_url: impl Into<String>,
        queue: Arc<dyn QueueClient>,
        settings: ReceiveSettings,
    ) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::Active);
        let (handler, _) = watch::channel(None);
        let (error_handler, _) = watch::channel(None);

        let inner = Arc::new(SessionInner {
            queue_url: queue_url.into(),
            lifecycle,
            handler,
            error_handler,
        });

        info!(
            queue_url = %inner.queue_url,
            max_messages = settings.max_messages,
            wait_time_secs = settings.wait_time_secs,
            "Listen session started"
        );

        tokio::spawn(poll(inner.clone(), queue, settings));

        Self { inner }
    }

    pub fn queue_url(&self) -> &str {
        &self.inner.queue_url
    }

    /// Register the message handler, replacing any previous one.
    pub fn on_message<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(QueueMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.set_handler(Arc::new(FnHandler(handler)))
    }

    /// Register a trait-object handler, replacing any previous one.
    pub fn set_handler(&self, handler: Arc<dyn MessageHandler>) -> &Self {
        if self.inner.is_active() {
            self.inner.handler.send_replace(Some(handler));
        } else {
            warn!(queue_url = %self.inner.queue_url, "Handler registered on stopped session");
        }
        self
    }

    /// Register the error handler, replacing any previous one.
    pub fn on_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        if self.inner.is_active() {
            self.inner.error_handler.send_replace(Some(Arc::new(handler)));
        }
        self
    }

    /// Stop the session. Terminal and idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            inner: self.inner.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.inner.is_active() {
            SessionState::Active
        } else {
            SessionState::Stopped
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// The fatal error that ended the session, if any.
    pub fn fatal_error(&self) -> Option<AdapterError> {
        match &*self.inner.lifecycle.borrow() {
            Lifecycle::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Wait until the session has stopped; returns the fatal error, if any.
    pub async fn closed(&self) -> Option<AdapterError> {
        let mut rx = self.inner.lifecycle.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                Lifecycle::Active => {}
                Lifecycle::Stopped => return None,
                Lifecycle::Failed(err) => return Some(err),
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

impl std::fmt::Debug for ListenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenSession")
            .field("queue_url", &self.inner.queue_url)
            .field("state", &self.state())
            .finish()
    }
}

/// Wait for a handler, or return false if the session stopped first.
async fn wait_for_handler(inner: &SessionInner) -> bool {
    let mut handler_rx = inner.handler.subscribe();
    let mut lifecycle_rx = inner.lifecycle.subscribe();
    loop {
        if !inner.is_active() {
            return false;
        }
        if inner.current_handler().is_some() {
            return true;
        }
        tokio::select! {
            changed = handler_rx.changed() => if changed.is_err() { return false; },
            changed = lifecycle_rx.changed() => if changed.is_err() { return false; },
        }
    }
}

async fn poll(inner: Arc<SessionInner>, queue: Arc<dyn QueueClient>, settings: ReceiveSettings) {
    if wait_for_handler(&inner).await {
        receive_loop(&inner, &queue, &settings).await;
    }
    inner.release_handlers();
    debug!(queue_url = %inner.queue_url, "Poll loop exited");
}

async fn receive_loop(
    inner: &SessionInner,
    queue: &Arc<dyn QueueClient>,
    settings: &ReceiveSettings,
) {
    while inner.is_active() {
        let batch = match queue.receive(&inner.queue_url, settings).await {
            Ok(batch) => batch,
            Err(e) => {
                inner.fail(e);
                return;
            }
        };

        if !batch.is_empty() {
            debug!(queue_url = %inner.queue_url, count = batch.len(), "Received batch");
        }

        for received in batch {
            if !inner.is_active() {
                debug!(queue_url = %inner.queue_url, "Session stopped mid-batch");
                return;
            }
            let Some(handler) = inner.current_handler() else {
                return;
            };

            let message = QueueMessage::new(received, inner.queue_url.clone(), queue.clone());
            let message_id = message.message_id().to_string();

            if let Err(e) = handler.handle(message).await {
                warn!(
                    queue_url = %inner.queue_url,
                    message_id = %message_id,
                    error = %e,
                    "Message handler failed"
                );
                inner.emit(&SessionEvent::ProcessingError {
                    message_id,
                    error: e.to_string(),
                });
            }
        }
    }
}

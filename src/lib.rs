//! svcdispatch - logical service addressing over serverless backends.
//!
//! Callers name a service (`[namespace.]service[->handler]`); the router
//! discovers the live instances behind it, selects one, and dispatches to
//! the adapter for its backend kind: functions, state machines, automation
//! documents, topics and queues. Queues can also be consumed through
//! long-lived listen sessions.

pub mod adapters;
pub mod address;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod listen;
pub mod router;
pub mod selector;
pub mod utils;

pub use adapters::{AdapterError, Backends, PublishReceipt, ReceiveSettings, SendOptions};
pub use address::{CallTarget, ServiceAddress};
pub use config::Config;
pub use discovery::{BackendKind, DiscoveredInstance, Discovery, DiscoveryError};
pub use error::{Operation, Result, RouterError};
pub use listen::{ListenSession, QueueMessage, SessionEvent, SessionState};
pub use router::{DispatchRequest, Router};

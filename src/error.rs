//! Router error taxonomy.

use crate::adapters::AdapterError;
use crate::address::AddressError;
use crate::discovery::DiscoveryError;

/// Result type for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Errors surfaced by router operations.
///
/// The router never recovers locally: adapter and discovery failures are
/// passed through unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RouterError {
    #[error("Invalid address: {0}")]
    Parse(#[from] AddressError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No unambiguous target for {service}: {candidates} instances and no handler given")]
    AmbiguousTarget { service: String, candidates: usize },

    #[error("Unsupported backend for {operation} on instance '{instance}': {reason}")]
    UnsupportedBackend {
        operation: Operation,
        instance: String,
        reason: String,
    },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl RouterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RouterError::NotFound(_))
    }
}

/// Client-facing operation, used for error context and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Call,
    Publish,
    Queue,
    Listen,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Call => "call",
            Operation::Publish => "publish",
            Operation::Queue => "queue",
            Operation::Listen => "listen",
        };
        f.write_str(name)
    }
}

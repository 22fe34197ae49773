//! Service address parsing.
//!
//! Two address forms are understood:
//! - `namespace.service` for publish, queue and listen addressing
//! - `[namespace.]service->handler` for request addressing
//!
//! Only the first separator occurrence splits; anything after it belongs to
//! the right-hand side verbatim (`a.b.c` is namespace `a`, service `b.c`).

use std::fmt;

/// Namespace used when an address carries none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Separator between namespace and service.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Separator between service and handler in request addresses.
pub const HANDLER_SEPARATOR: &str = "->";

/// Errors produced while parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Empty service address")]
    Empty,

    #[error("Address '{0}' has an empty service name")]
    EmptyService(String),

    #[error("Address '{0}' has an empty handler after '->'")]
    EmptyHandler(String),
}

/// A resolved `(namespace, service)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceAddress {
    namespace: String,
    service: String,
}

impl ServiceAddress {
    pub fn new(namespace: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            service: service.into(),
        }
    }

    /// Parse `namespace.service`, falling back to [`DEFAULT_NAMESPACE`].
    pub fn parse(identifier: &str) -> Result<Self, AddressError> {
        Self::parse_with_default(identifier, DEFAULT_NAMESPACE)
    }

    /// Parse `namespace.service`, falling back to `default_namespace`.
    pub fn parse_with_default(
        identifier: &str,
        default_namespace: &str,
    ) -> Result<Self, AddressError> {
        if identifier.is_empty() {
            return Err(AddressError::Empty);
        }

        let (namespace, service) = match identifier.split_once(NAMESPACE_SEPARATOR) {
            Some((namespace, service)) => (namespace, service),
            None => (default_namespace, identifier),
        };

        if service.is_empty() {
            return Err(AddressError::EmptyService(identifier.to_string()));
        }

        Ok(Self::new(namespace, service))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, NAMESPACE_SEPARATOR, self.service)
    }
}

/// A service address plus the handler (instance id) it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub address: ServiceAddress,
    pub handler: Option<String>,
}

impl CallTarget {
    /// Parse `[namespace.]service->handler`.
    ///
    /// Without `->` the whole string is a service address and no handler is
    /// selected.
    pub fn parse(identifier: &str) -> Result<Self, AddressError> {
        Self::parse_with_default(identifier, DEFAULT_NAMESPACE)
    }

    pub fn parse_with_default(
        identifier: &str,
        default_namespace: &str,
    ) -> Result<Self, AddressError> {
        match identifier.split_once(HANDLER_SEPARATOR) {
            Some((service, handler)) => {
                if handler.is_empty() {
                    return Err(AddressError::EmptyHandler(identifier.to_string()));
                }
                if service.is_empty() {
                    return Err(AddressError::EmptyService(identifier.to_string()));
                }
                Ok(Self {
                    address: ServiceAddress::parse_with_default(service, default_namespace)?,
                    handler: Some(handler.to_string()),
                })
            }
            None => Ok(Self {
                address: ServiceAddress::parse_with_default(identifier, default_namespace)?,
                handler: None,
            }),
        }
    }
}

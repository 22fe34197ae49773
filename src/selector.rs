//! Instance selection.
//!
//! Narrows a discovered instance set down to the single instance a call
//! targets. Side-effect free apart from logging.

use tracing::warn;

use crate::discovery::{BackendKind, DiscoveredInstance};
use crate::error::{Result, RouterError};

/// Pick the instance a call targets.
///
/// - With a handler: the first instance whose id equals it. Duplicate ids
///   break a discovery-layer invariant; they are logged and the first match
///   is kept.
/// - Without a handler: the sole instance, otherwise `NotFound` (empty) or
///   `AmbiguousTarget` (several).
pub fn select<'a>(
    service: &str,
    instances: &'a [DiscoveredInstance],
    handler: Option<&str>,
) -> Result<&'a DiscoveredInstance> {
    match handler {
        Some(handler) => {
            let mut matches = instances.iter().filter(|i| i.id == handler);
            let first = matches.next().ok_or_else(|| {
                RouterError::NotFound(format!("no instance '{}' for {}", handler, service))
            })?;
            let duplicates = matches.count();
            if duplicates > 0 {
                warn!(
                    service = %service,
                    handler = %handler,
                    duplicates,
                    "Duplicate instance ids discovered, using first match"
                );
            }
            Ok(first)
        }
        None => sole(service, instances.iter()),
    }
}

/// Pick the sole instance of `kind`, ignoring instances of other or unknown
/// kinds.
pub fn select_kind<'a>(
    service: &str,
    instances: &'a [DiscoveredInstance],
    kind: BackendKind,
) -> Result<&'a DiscoveredInstance> {
    if instances.is_empty() {
        return Err(RouterError::NotFound(format!("no instances for {}", service)));
    }
    sole(service, instances.iter().filter(|i| i.kind() == Some(kind))).map_err(|e| match e {
        RouterError::NotFound(_) => {
            RouterError::NotFound(format!("no {} instance for {}", kind, service))
        }
        other => other,
    })
}

fn sole<'a>(
    service: &str,
    mut candidates: impl Iterator<Item = &'a DiscoveredInstance>,
) -> Result<&'a DiscoveredInstance> {
    let first = candidates
        .next()
        .ok_or_else(|| RouterError::NotFound(format!("no instances for {}", service)))?;
    let rest = candidates.count();
    if rest > 0 {
        return Err(RouterError::AmbiguousTarget {
            service: service.to_string(),
            candidates: rest + 1,
        });
    }
    Ok(first)
}

//! Resolves a human-supplied container name to its stable identifier.
//!
//! Resolution scans the full listing, which is more expensive than
//! inspecting by id; sessions therefore cache the result and only call the
//! resolver again while nothing has been found.

use dockstream_common::error::StreamError;
use dockstream_common::types::{ContainerId, ContainerSummary};

/// Finds the single listing entry whose canonical alias equals `name`.
///
/// Returns `None` when nothing matches or when the match is ambiguous.
#[must_use]
pub fn match_alias<'a>(listing: &'a [ContainerSummary], name: &str) -> Option<&'a ContainerId> {
    if name.is_empty() {
        return None;
    }
    let mut matches = listing.iter().filter(|summary| summary.alias() == name);
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(&only.id),
        _ => None,
    }
}

/// Resolver bound to one requested name.
#[derive(Debug, Clone)]
pub struct NameResolver {
    name: String,
}

impl NameResolver {
    /// Creates a resolver for `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the name being resolved.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves the name against a freshly fetched listing.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::ResolutionNotFound` if the listing holds no
    /// unique match.
    pub fn resolve(&self, listing: &[ContainerSummary]) -> Result<ContainerId, StreamError> {
        match_alias(listing, &self.name)
            .cloned()
            .ok_or_else(|| StreamError::ResolutionNotFound {
                name: self.name.clone(),
            })
    }
}

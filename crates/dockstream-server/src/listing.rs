//! Presentation of the container listing for the services pages.

use dockstream_common::types::ContainerSummary;
use serde::Serialize;

/// One row of the services page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSummary {
    /// Container identifier, used as the detail page slug.
    pub slug: String,
    /// First declared name without its leading `/`.
    pub title: String,
    /// Human-readable status reported by the daemon.
    pub status: String,
}

impl From<&ContainerSummary> for ServiceSummary {
    fn from(summary: &ContainerSummary) -> Self {
        Self {
            slug: summary.id.to_string(),
            title: summary
                .primary_name()
                .unwrap_or_else(|| summary.id.as_str())
                .to_string(),
            status: summary.status.clone(),
        }
    }
}

/// Formats a listing as services page rows, in daemon order.
#[must_use]
pub fn service_summaries(listing: &[ContainerSummary]) -> Vec<ServiceSummary> {
    listing.iter().map(ServiceSummary::from).collect()
}

//! Domain primitive types used across the dockstream workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a container, as assigned by the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one stream session, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Generates a random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the daemon's container listing.
///
/// Only the fields dockstream reasons about are typed. Everything else the
/// daemon reports is kept in `extra` so that streamed snapshots carry the
/// full listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    /// Container identifier.
    pub id: ContainerId,
    /// Declared names, each usually prefixed with `/`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Image the container was created from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Machine-readable state (`running`, `exited`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub state: String,
    /// Human-readable status (`Up 3 minutes`, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Remaining fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContainerSummary {
    /// Returns the canonical alias: every declared name with its leading
    /// `/` stripped, joined in declared order.
    #[must_use]
    pub fn alias(&self) -> String {
        self.names
            .iter()
            .map(|name| strip_name_prefix(name))
            .collect::<Vec<_>>()
            .join(crate::constants::ALIAS_SEPARATOR)
    }

    /// Returns the first declared name without its leading `/`, if any.
    #[must_use]
    pub fn primary_name(&self) -> Option<&str> {
        self.names.first().map(|name| strip_name_prefix(name))
    }
}

/// Strips the path-separator prefix the daemon puts in front of names.
#[must_use]
pub fn strip_name_prefix(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

/// Detailed record returned by inspecting one container.
///
/// Kept opaque: dockstream streams it without interpreting its fields.
pub type ContainerDetail = serde_json::Value;

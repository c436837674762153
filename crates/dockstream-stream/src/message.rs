//! Messages pushed to a stream subscriber.
//!
//! On the wire every message is one server-sent event line
//! `data: <json>\n\n`, where the JSON object carries a `status`
//! discriminant:
//!
//! ```text
//! {"status":"loading"}
//! {"status":"transmitting","contents":<snapshot>}
//! {"status":"error","error":"<reason>"}
//! ```

use serde::{Deserialize, Serialize};

/// A state transition observed by a stream session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Message {
    /// Sent once, immediately after the session starts.
    Loading,
    /// A snapshot whose digest differs from the previously transmitted one.
    Transmitting {
        /// The fetched snapshot.
        contents: serde_json::Value,
    },
    /// A recoverable failure; the session keeps running.
    #[serde(rename = "error")]
    ErrorOccurred {
        /// Human-readable description of the failure.
        #[serde(rename = "error")]
        reason: String,
    },
}

impl Message {
    /// Short label used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Transmitting { .. } => "transmitting",
            Self::ErrorOccurred { .. } => "error",
        }
    }

    /// Encodes the message as one server-sent event line.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn to_event_line(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

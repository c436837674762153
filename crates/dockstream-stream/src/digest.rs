//! Canonical snapshot digests.
//!
//! Two snapshots produce the same digest exactly when they are structurally
//! equal. Object keys are visited in sorted order and every value is
//! written with a type tag and, for strings, a length prefix, so neither key
//! order nor textual coincidences leak into the comparison.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical encoding of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotDigest(String);

impl SnapshotDigest {
    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Computes the digest of a snapshot.
#[must_use]
pub fn digest(snapshot: &Value) -> SnapshotDigest {
    let mut hasher = Sha256::new();
    write_canonical(&mut hasher, snapshot);
    SnapshotDigest(format!("{:x}", hasher.finalize()))
}

fn write_canonical(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update(b"n"),
        Value::Bool(true) => hasher.update(b"t"),
        Value::Bool(false) => hasher.update(b"f"),
        Value::Number(n) => {
            hasher.update(b"d");
            write_str(hasher, &n.to_string());
        }
        Value::String(s) => {
            hasher.update(b"s");
            write_str(hasher, s);
        }
        Value::Array(items) => {
            hasher.update(b"[");
            write_len(hasher, items.len());
            for item in items {
                write_canonical(hasher, item);
            }
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            hasher.update(b"{");
            write_len(hasher, entries.len());
            for (key, item) in entries {
                write_str(hasher, key);
                write_canonical(hasher, item);
            }
        }
    }
}

fn write_str(hasher: &mut Sha256, s: &str) {
    write_len(hasher, s.len());
    hasher.update(s.as_bytes());
}

fn write_len(hasher: &mut Sha256, len: usize) {
    hasher.update((len as u64).to_le_bytes());
}

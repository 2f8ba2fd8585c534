//! Deterministic fingerprinting for server/tool identity (spec §4.1).
//!
//! `server_fingerprint`/`tool_fingerprint` are pure hex-encoded SHA-256
//! digests, stable across restarts. `point_id` derives a UUIDv5 from the same
//! name for use as a vector-index point ID, mirroring the original's
//! `uuid5(NAMESPACE_DNS, name)` (`services/index.py`).

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Fingerprint of a server name: `hash(name)`.
pub fn server_fingerprint(name: &str) -> String {
    hash_hex(name.as_bytes())
}

/// Fingerprint of a `server::tool` pair: `hash(server::tool)`.
pub fn tool_fingerprint(server: &str, tool: &str) -> String {
    hash_hex(tool_key(server, tool).as_bytes())
}

/// The `server::tool` key used both for the tool fingerprint and the point ID.
pub fn tool_key(server: &str, tool: &str) -> String {
    format!("{server}::{tool}")
}

/// Stable UUIDv5 point ID for a vector-index entry, derived from `name`
/// under a fixed namespace (DNS namespace, matching the original).
pub fn point_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

fn hash_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_fingerprint_stable() {
        let a = server_fingerprint("fs");
        let b = server_fingerprint("fs");
        assert_eq!(a, b);
        assert_ne!(a, server_fingerprint("other"));
    }

    #[test]
    fn test_tool_fingerprint_is_scoped_by_server() {
        let a = tool_fingerprint("fs", "read");
        let b = tool_fingerprint("other", "read");
        assert_ne!(a, b);
    }

    #[test]
    fn test_point_id_stable_and_distinct() {
        let a = point_id("fs");
        let b = point_id("fs");
        assert_eq!(a, b);

        let c = point_id(&tool_key("fs", "read"));
        assert_ne!(a, c);
    }
}

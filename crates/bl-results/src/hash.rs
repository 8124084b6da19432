//! Content-based hashing for run ids.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ResultsResult;

/// Fingerprint of a request payload and the engine that will solve it.
///
/// Identical payloads give identical ids; the id is used to correlate log
/// lines and responses, not as a cache key. A payload that cannot be
/// serialized has no id.
pub fn compute_run_id<T: Serialize + ?Sized>(
    payload: &T,
    engine_version: &str,
) -> ResultsResult<String> {
    let payload_json = serde_json::to_vec(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(&payload_json);
    hasher.update(engine_version.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// First 12 hex digits, for log lines.
pub fn short_id(run_id: &str) -> &str {
    run_id.get(..12).unwrap_or(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hash_stability() {
        let payload = json!({"Type": "NMC", "Cycles": 2});
        let hash1 = compute_run_id(&payload, "reference-0.1.0").unwrap();
        let hash2 = compute_run_id(&payload, "reference-0.1.0").unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let a = compute_run_id(&json!({"Type": "NMC"}), "v1").unwrap();
        let b = compute_run_id(&json!({"Type": "LFP"}), "v1").unwrap();
        let c = compute_run_id(&json!({"Type": "NMC"}), "v2").unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unserializable_payload_has_no_id() {
        use std::collections::BTreeMap;

        let mut payload = BTreeMap::new();
        payload.insert((1u8, 2u8), "tuple keys are not JSON object keys");
        let err = compute_run_id(&payload, "v1").unwrap_err();
        assert!(matches!(err, crate::ResultsError::Json(_)));
    }

    #[test]
    fn short_id_truncates() {
        let id = compute_run_id(&json!({}), "v1").unwrap();
        assert_eq!(short_id(&id).len(), 12);
        assert_eq!(short_id("abc"), "abc");
    }
}

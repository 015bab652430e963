//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Canonical serialisation — the stable, key-sorted byte representation used
//! for every hash and every signature input in this crate.

use serde_json::Value;

/// Recursively key-sort a JSON value. Arrays preserve element order; object
/// keys are sorted lexicographically; scalars pass through unchanged.
pub fn canonicalize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), canonicalize_value(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_value).collect()),
        other => other.clone(),
    }
}

/// Canonical JSON bytes for `value`: key-sorted, compact, stable across
/// machines and library versions because the sort happens before
/// serialisation rather than relying on a map's iteration order.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    // serde_json::Map is a BTreeMap by default (no "preserve_order" feature),
    // so serializing the sorted value already yields sorted key order; we
    // still sort explicitly above so behaviour doesn't depend on that feature.
    serde_json::to_vec(&canonicalize_value(value)).expect("canonical value always serialises")
}

/// Canonical JSON string for `value`.
pub fn canonical_string(value: &Value) -> String {
    String::from_utf8(canonical_bytes(value)).expect("canonical JSON is valid UTF-8")
}

/// Canonicalise any `Serialize` value by round-tripping through `serde_json::Value`.
pub fn canonicalize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    Ok(canonical_bytes(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_is_irrelevant() {
        let a = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        let b = json!({"a": 2, "c": {"y": 2, "z": 1}, "b": 1});
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[test]
    fn array_order_is_preserved() {
        let a = json!({"list": [3, 1, 2]});
        let b = json!({"list": [1, 2, 3]});
        assert_ne!(canonical_bytes(&a), canonical_bytes(&b));
    }

    #[test]
    fn nested_structures_canonicalize_recursively() {
        let v = json!({"outer": {"z": [{"b": 1, "a": 2}]}});
        let s = canonical_string(&v);
        assert!(s.find("\"a\"").unwrap() < s.find("\"b\"").unwrap());
    }

    #[test]
    fn stable_across_repeated_calls() {
        let v = json!({"k1": "v1", "k2": [1, 2, 3], "k3": {"nested": true}});
        assert_eq!(canonical_bytes(&v), canonical_bytes(&v.clone()));
    }
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Append-only evidence log — SHA-256 back-linked records, verifiable
//! offline by replaying the chain end-to-end. Modeled on the continuity
//! chaining in `chain.rs`, generalized from BLAKE3 over fixed segments to
//! SHA-256 over arbitrary canonical JSON payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canon::canonical_bytes;
use crate::crypto::hash::sha256_hex;

/// All-zero sentinel used as `prevHash` for the first record in a log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
    pub prev_hash: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceLog {
    records: Vec<EvidenceRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub valid: bool,
    pub record_count: usize,
    pub first_bad_index: Option<usize>,
}

impl EvidenceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EvidenceRecord] {
        &self.records
    }

    fn tail_hash(&self) -> String {
        self.records
            .last()
            .map(|r| r.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }

    /// Append `payload` as a new record, linking it to the current tail.
    pub fn append(&mut self, payload: Value, timestamp: DateTime<Utc>) -> &EvidenceRecord {
        let prev_hash = self.tail_hash();
        let hash = Self::compute_hash(&prev_hash, &payload);
        let record = EvidenceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            payload,
            prev_hash,
            hash,
        };
        self.records.push(record);
        self.records.last().expect("just pushed")
    }

    fn compute_hash(prev_hash: &str, payload: &Value) -> String {
        let linked = serde_json::json!({ "prevHash": prev_hash, "payload": payload });
        sha256_hex(&canonical_bytes(&linked))
    }

    /// Replay the chain end-to-end, recomputing every hash and confirming
    /// the back-links match. `O(n)` in the record count.
    pub fn verify(&self) -> VerificationOutcome {
        let mut expected_prev = GENESIS_HASH.to_string();
        for (i, record) in self.records.iter().enumerate() {
            if record.prev_hash != expected_prev {
                return VerificationOutcome {
                    valid: false,
                    record_count: self.records.len(),
                    first_bad_index: Some(i),
                };
            }
            let recomputed = Self::compute_hash(&record.prev_hash, &record.payload);
            if recomputed != record.hash {
                return VerificationOutcome {
                    valid: false,
                    record_count: self.records.len(),
                    first_bad_index: Some(i),
                };
            }
            expected_prev = record.hash.clone();
        }
        VerificationOutcome {
            valid: true,
            record_count: self.records.len(),
            first_bad_index: None,
        }
    }
}

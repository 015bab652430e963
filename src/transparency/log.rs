//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Append-only transparency log. Every registration recomputes the Merkle
//! root over the full historical statement-hash list inside the same
//! append, so the monotonicity invariant holds even under crash recovery —
//! there is no cached tree hash to fall out of sync.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::store::{ScittEntryRow, ScittReceiptRow};
use crate::canon::canonical_bytes;
use crate::crypto::cose;
use crate::crypto::hash::sha256_hex;
use crate::error::{PoeResult, TransparencyError};
use crate::merkle;
use crate::receipts::chain::ReceiptRegistry;

const GENESIS_TREE_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResult {
    pub entry_id: String,
    pub registration_time: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLookup {
    pub entry_id: String,
    pub registration_time: DateTime<Utc>,
    pub log_id: String,
    pub proof: String,
}

/// Projection of a registered statement surfaced by listing queries.
/// Statements that aren't a JWT or a JSON object with the expected shape
/// simply project to `None` fields rather than failing the listing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListedEntry {
    pub entry_id: String,
    pub tree_size: u64,
    pub registration_time: DateTime<Utc>,
    pub issuer: Option<String>,
    pub frameworks: Vec<String>,
    pub assurance_declared: Option<u8>,
    pub provenance_source: Option<String>,
}

fn decode_jwt_payload(statement: &str) -> Option<Value> {
    let mut parts = statement.split('.');
    let _header = parts.next()?;
    let payload_b64 = parts.next()?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn project_statement(entry: &ScittEntryRow) -> ListedEntry {
    let value = if entry.statement.contains('.') {
        decode_jwt_payload(&entry.statement)
    } else {
        serde_json::from_str(&entry.statement).ok()
    };

    let mut projected = ListedEntry {
        entry_id: entry.entry_id.clone(),
        tree_size: entry.tree_size,
        registration_time: entry.registration_time,
        ..Default::default()
    };

    let Some(value) = value else { return projected };

    projected.issuer = value.get("iss").and_then(|v| v.as_str()).map(str::to_string);
    if let Some(subject) = value.pointer("/vc/credentialSubject") {
        if let Some(frameworks) = subject.get("frameworks").and_then(|v| v.as_object()) {
            projected.frameworks = frameworks.keys().cloned().collect();
        }
        projected.assurance_declared = subject
            .pointer("/assurance/declared")
            .and_then(|v| v.as_u64())
            .map(|v| v as u8);
        projected.provenance_source = subject
            .pointer("/provenance/source")
            .and_then(|v| v.as_str())
            .map(str::to_string);
    }
    projected
}

/// In-memory SCITT-style registry. An external adapter backing this with a
/// relational store persists [`ScittEntryRow`]/[`ScittReceiptRow`] directly.
pub struct TransparencyLog {
    log_id: String,
    signing_key: SigningKey,
    entries: Vec<ScittEntryRow>,
    receipts: HashMap<String, ScittReceiptRow>,
    leaves: Vec<[u8; 32]>,
}

impl TransparencyLog {
    pub fn new(log_id: impl Into<String>, signing_key: SigningKey) -> Self {
        Self {
            log_id: log_id.into(),
            signing_key,
            entries: Vec::new(),
            receipts: HashMap::new(),
            leaves: Vec::new(),
        }
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn tree_size(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Register a statement, recomputing the tree hash over every statement
    /// hash seen so far and issuing a COSE-signed inclusion receipt.
    pub fn register(&mut self, statement: &str) -> PoeResult<RegistrationResult> {
        let leaf = merkle::leaf(statement.as_bytes());
        let statement_hash = hex::encode(leaf);

        let parent_hash = self
            .entries
            .last()
            .map(|e| e.tree_hash.clone())
            .unwrap_or_else(|| GENESIS_TREE_HASH.to_string());

        let mut candidate_leaves = self.leaves.clone();
        candidate_leaves.push(leaf);
        let tree_hash = hex::encode(merkle::root(&candidate_leaves)?);
        let tree_size = candidate_leaves.len() as u64;

        let entry_id = uuid::Uuid::new_v4().to_string();
        let registration_time = Utc::now();

        let entry = ScittEntryRow {
            entry_id: entry_id.clone(),
            statement: statement.to_string(),
            statement_hash,
            tree_size,
            tree_hash: tree_hash.clone(),
            parent_hash,
            registration_time,
        };

        let receipt_payload = serde_json::json!({
            "logId": self.log_id,
            "treeSize": tree_size,
            "treeHash": tree_hash,
        });
        let cose_bytes = cose::sign1(&canonical_bytes(&receipt_payload), &self.signing_key);
        let receipt = ScittReceiptRow {
            entry_id: entry_id.clone(),
            log_id: self.log_id.clone(),
            proof: BASE64.encode(cose_bytes),
            issued_at: registration_time,
        };

        self.leaves = candidate_leaves;
        self.entries.push(entry);
        self.receipts.insert(entry_id.clone(), receipt);

        tracing::info!(entry_id = %entry_id, tree_size, "statement registered in transparency log");

        Ok(RegistrationResult {
            entry_id,
            registration_time,
            status: "registered".to_string(),
        })
    }

    /// Returns `None` for an unknown entry id; reads fail open.
    pub fn get_receipt(&self, entry_id: &str) -> Option<ReceiptLookup> {
        let entry = self.entries.iter().find(|e| e.entry_id == entry_id);
        let receipt = self.receipts.get(entry_id);
        match (entry, receipt) {
            (Some(entry), Some(receipt)) => Some(ReceiptLookup {
                entry_id: entry.entry_id.clone(),
                registration_time: entry.registration_time,
                log_id: receipt.log_id.clone(),
                proof: receipt.proof.clone(),
            }),
            _ => {
                tracing::warn!(entry_id, "transparency log receipt requested for unknown entry");
                None
            }
        }
    }

    /// COSE-verify the stored receipt for `entry_id` against `public_key`.
    pub fn verify_receipt(&self, entry_id: &str, public_key: &VerifyingKey) -> bool {
        let Some(entry) = self.entries.iter().find(|e| e.entry_id == entry_id) else {
            return false;
        };
        let Some(receipt) = self.receipts.get(entry_id) else {
            return false;
        };
        let Ok(cose_bytes) = BASE64.decode(&receipt.proof) else {
            return false;
        };
        let Ok(payload) = cose::verify1(&cose_bytes, public_key) else {
            return false;
        };
        let expected_payload = canonical_bytes(&serde_json::json!({
            "logId": receipt.log_id,
            "treeSize": entry.tree_size,
            "treeHash": entry.tree_hash,
        }));
        payload == expected_payload
    }

    pub fn get_entry(&self, entry_id: &str) -> Option<&ScittEntryRow> {
        self.entries.iter().find(|e| e.entry_id == entry_id)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Paginated listing, strict insertion order, ties broken by entry id.
    pub fn list(&self, page: usize, per_page: usize) -> Vec<ListedEntry> {
        self.entries
            .iter()
            .skip(page * per_page)
            .take(per_page)
            .map(project_statement)
            .collect()
    }

    pub fn list_by_framework(&self, framework: &str, page: usize, per_page: usize) -> Vec<ListedEntry> {
        self.entries
            .iter()
            .map(project_statement)
            .filter(|e| e.frameworks.iter().any(|f| f == framework))
            .skip(page * per_page)
            .take(per_page)
            .collect()
    }
}

#[async_trait]
impl ReceiptRegistry for TransparencyLog {
    async fn register(&mut self, statement: &str) -> PoeResult<String> {
        TransparencyLog::register(self, statement)
            .map(|r| r.entry_id)
            .map_err(Into::into)
    }
}

/// Surfaced when an entry id passed to an adapter is genuinely not found
/// anywhere in the log (distinct from the fail-open `Option` reads above,
/// which are used internally).
pub fn unknown_entry(entry_id: &str) -> TransparencyError {
    TransparencyError::UnknownEntry(entry_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn log() -> TransparencyLog {
        TransparencyLog::new("log-1", SigningKey::generate(&mut OsRng))
    }

    #[test]
    fn tree_size_strictly_increases() {
        let mut log = log();
        let r1 = log.register("s1").unwrap();
        let r2 = log.register("s2").unwrap();
        let e1 = log.get_entry(&r1.entry_id).unwrap();
        let e2 = log.get_entry(&r2.entry_id).unwrap();
        assert!(e1.tree_size < e2.tree_size);
    }

    #[test]
    fn tree_hash_matches_merkle_root_over_first_j_statements() {
        let mut log = log();
        log.register("s1").unwrap();
        log.register("s2").unwrap();
        let r3 = log.register("s3").unwrap();

        let leaves: Vec<[u8; 32]> = ["s1", "s2", "s3"].iter().map(|s| merkle::leaf(s.as_bytes())).collect();
        let expected_root = hex::encode(merkle::root(&leaves).unwrap());

        let entry3 = log.get_entry(&r3.entry_id).unwrap();
        assert_eq!(entry3.tree_hash, expected_root);
    }

    #[test]
    fn inclusion_receipt_round_trip() {
        let mut log = log();
        log.register("s1").unwrap();
        let r2 = log.register("s2").unwrap();
        log.register("s3").unwrap();

        let public_key = log.public_key();
        assert!(log.verify_receipt(&r2.entry_id, &public_key));
    }

    #[test]
    fn unknown_entry_reads_fail_open() {
        let log = log();
        assert!(log.get_receipt("nonexistent").is_none());
        assert!(!log.verify_receipt("nonexistent", &log.public_key()));
    }

    #[test]
    fn listing_is_strict_insertion_order() {
        let mut log = log();
        log.register("s1").unwrap();
        log.register("s2").unwrap();
        log.register("s3").unwrap();
        let listed = log.list(0, 10);
        assert_eq!(listed.len(), 3);
    }
}

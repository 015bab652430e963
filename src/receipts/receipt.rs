//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! A single process receipt: an in-toto-style statement over one pipeline
//! step, signed with COSE_Sign1. `signature` and `scittEntryId` are always
//! excluded from the bytes that get signed, so either can be attached or
//! updated after the fact without invalidating the signature.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canon::canonical_bytes;
use crate::crypto::cose;
use crate::crypto::hash::sha256_hex;
use crate::keys::KeyAttestationMetadata;

pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v1";
pub const PREDICATE_TYPE: &str = "https://poetrustlabs.com/attestations/process-step/v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Digest {
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub digest: Digest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderAttestation {
    pub id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_attestation: Option<KeyAttestationMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAttestation {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAttestation {
    pub model: String,
    pub prompt_digest: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousReceiptLink {
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scitt_entry_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub step_name: String,
    pub builder: BuilderAttestation,
    pub reproducible: bool,
    pub materials: Vec<Subject>,
    pub metadata: ReceiptMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_attestation: Option<ToolAttestation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_attestation: Option<LlmAttestation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_receipt: Option<PreviousReceiptLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    #[serde(rename = "_type")]
    pub statement_type: String,
    pub subject: Vec<Subject>,
    pub predicate_type: String,
    pub predicate: Predicate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scitt_entry_id: Option<String>,
}

/// Inputs to [`generate_receipt`].
pub struct GenerateReceiptInput {
    pub step_name: String,
    pub input_data: Value,
    pub output_data: Value,
    pub builder: BuilderAttestation,
    pub reproducible: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tool_attestation: Option<ToolAttestation>,
    pub llm_attestation: Option<LlmAttestation>,
    pub previous: Option<PreviousReceiptLink>,
}

fn digest_of(value: &Value) -> Digest {
    Digest {
        sha256: sha256_hex(&canonical_bytes(value)),
    }
}

/// The hash of everything in `receipt` except `signature` and
/// `scittEntryId`. Stable regardless of whether those two fields are
/// present, absent, or updated after signing.
pub fn body_hash(receipt: &Receipt) -> String {
    let body = serde_json::json!({
        "_type": receipt.statement_type,
        "subject": receipt.subject,
        "predicateType": receipt.predicate_type,
        "predicate": receipt.predicate,
    });
    sha256_hex(&canonical_bytes(&body))
}

/// Build and sign a process receipt for one pipeline step.
pub fn generate_receipt(input: GenerateReceiptInput, private_key: &SigningKey) -> Receipt {
    generate_receipt_with_signer(input, |data| cose::sign1(data, private_key))
}

/// As [`generate_receipt`], but signs through a caller-supplied COSE_Sign1
/// producer instead of a raw key.
pub fn generate_receipt_with_signer(input: GenerateReceiptInput, sign1: impl FnOnce(&[u8]) -> Vec<u8>) -> Receipt {
    let output_digest = digest_of(&input.output_data);
    let input_digest = digest_of(&input.input_data);

    let predicate = Predicate {
        step_name: input.step_name,
        builder: input.builder,
        reproducible: input.reproducible,
        materials: vec![Subject {
            name: "input".to_string(),
            digest: input_digest,
        }],
        metadata: ReceiptMetadata {
            started_at: input.started_at,
            finished_at: input.finished_at,
        },
        tool_attestation: input.tool_attestation,
        llm_attestation: input.llm_attestation,
        previous_receipt: input.previous,
    };

    let mut receipt = Receipt {
        statement_type: STATEMENT_TYPE.to_string(),
        subject: vec![Subject {
            name: "output".to_string(),
            digest: output_digest,
        }],
        predicate_type: PREDICATE_TYPE.to_string(),
        predicate,
        signature: None,
        scitt_entry_id: None,
    };

    let hash = body_hash(&receipt);
    let cose = sign1(hash.as_bytes());
    receipt.signature = Some(BASE64.encode(cose));
    receipt
}

#[derive(Debug, Clone)]
pub struct ReceiptVerification {
    pub verified: bool,
    pub payload: Option<String>,
}

/// Verify a receipt's signature under `public_key` and confirm the signed
/// payload equals the recomputed body hash.
pub fn verify_receipt(receipt: &Receipt, public_key: &VerifyingKey) -> ReceiptVerification {
    let expected_hash = body_hash(receipt);

    let Some(signature_b64) = &receipt.signature else {
        return ReceiptVerification {
            verified: false,
            payload: None,
        };
    };
    let Ok(cose_bytes) = BASE64.decode(signature_b64) else {
        return ReceiptVerification {
            verified: false,
            payload: None,
        };
    };
    let Ok(payload_bytes) = cose::verify1(&cose_bytes, public_key) else {
        return ReceiptVerification {
            verified: false,
            payload: None,
        };
    };
    let payload = String::from_utf8_lossy(&payload_bytes).to_string();

    ReceiptVerification {
        verified: payload == expected_hash,
        payload: Some(payload),
    }
}

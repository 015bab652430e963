//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Credential data model: the normalised evidence a caller hands in, and the
//! JWT-VC payload shape the generator produces.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resolver::scope::ProvenanceSource;

pub const CREDENTIALS_V2_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";
pub const POE_CREDENTIAL_TYPE: &str = "ProofOfOperationalEffectivenessCredential";
pub const JWT_VC_TYP: &str = "vc+jwt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlStatus {
    Effective,
    Ineffective,
    NotTested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlRecord {
    pub id: String,
    pub name: String,
    pub framework: String,
    pub status: ControlStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceDocument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source: ProvenanceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_document: Option<String>,
}

/// Evidence as handed to the generator: a document descriptor, the controls
/// it attests, and its provenance. Scanner-specific normalisation happens
/// upstream of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvidence {
    pub document: EvidenceDocument,
    pub controls: Vec<ControlRecord>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assurance {
    pub declared: u8,
    pub verified: u8,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub controls_tested: u32,
    pub controls_passed: u32,
    pub controls_failed: u32,
    pub overall_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkMapping {
    pub controls_mapped: u32,
    pub passed: u32,
    pub failed: u32,
    pub controls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceChainInfo {
    pub hash_chain_root: String,
    pub record_count: usize,
    pub chain_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessProvenanceInfo {
    pub receipt_count: usize,
    pub chain_verified: bool,
    pub chain_digest: String,
    pub tool_attested_steps: usize,
    pub scitt_entry_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub scope: String,
    pub provenance: Provenance,
    pub assurance: Assurance,
    pub summary: Summary,
    pub frameworks: HashMap<String, FrameworkMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_chain: Option<EvidenceChainInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_provenance: Option<ProcessProvenanceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredentialBody {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub credential_subject: CredentialSubject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub vc: VerifiableCredentialBody,
}

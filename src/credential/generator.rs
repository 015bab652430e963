//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Credential Generator: validate evidence, map it to a credential subject,
//! optionally capture process receipts, sanitise, assemble, sign, and
//! size-check — in that order.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use super::sanitize::sanitize_value;
use super::types::{
    Assurance, ControlStatus, CredentialPayload, CredentialSubject, EvidenceChainInfo, FrameworkMapping,
    NormalizedEvidence, ProcessProvenanceInfo, Summary, VerifiableCredentialBody, CREDENTIALS_V2_CONTEXT,
    JWT_VC_TYP, POE_CREDENTIAL_TYPE, VERIFIABLE_CREDENTIAL_TYPE,
};
use crate::config::MAX_CREDENTIAL_BYTES;
use crate::crypto::jwt;
use crate::error::{PoeError, PoeResult};
use crate::evidence_log::EvidenceLog;
use crate::keys::manager::KeyManager;
use crate::receipts::chain::{ReceiptChain, ReceiptRegistry};
use crate::receipts::receipt::{BuilderAttestation, GenerateReceiptInput};

/// Everything the generator needs for one issuance. `expiry_days` has no
/// implicit default — callers decide between the credential surface's 90-day
/// window and the internal variant's 7-day window (or any other value).
pub struct GenerateCredentialInput {
    pub evidence: NormalizedEvidence,
    pub issuer_did: String,
    pub kid: String,
    pub expiry_days: i64,
    pub scope: String,
    pub assurance_declared: u8,
    pub assurance_method: String,
    pub dependencies: Option<Vec<String>>,
}

fn validate(evidence: &NormalizedEvidence) -> PoeResult<()> {
    if evidence.controls.is_empty() {
        return Err(PoeError::Input("evidence must contain at least one control".into()));
    }
    if evidence.document.name.trim().is_empty() {
        return Err(PoeError::Input("evidence document must have a non-empty name".into()));
    }
    for control in &evidence.controls {
        if control.id.trim().is_empty() || control.name.trim().is_empty() || control.framework.trim().is_empty() {
            return Err(PoeError::Input(format!(
                "control '{}' is missing required metadata (id/name/framework)",
                control.id
            )));
        }
    }
    Ok(())
}

fn map_controls(evidence: &NormalizedEvidence) -> (Summary, HashMap<String, FrameworkMapping>) {
    let mut frameworks: HashMap<String, FrameworkMapping> = HashMap::new();
    let mut tested = 0u32;
    let mut passed = 0u32;
    let mut failed = 0u32;

    for control in &evidence.controls {
        tested += 1;
        match control.status {
            ControlStatus::Effective => passed += 1,
            ControlStatus::Ineffective => failed += 1,
            ControlStatus::NotTested => {}
        }

        let mapping = frameworks.entry(control.framework.clone()).or_insert_with(|| FrameworkMapping {
            controls_mapped: 0,
            passed: 0,
            failed: 0,
            controls: Vec::new(),
        });
        mapping.controls_mapped += 1;
        mapping.controls.push(control.id.clone());
        match control.status {
            ControlStatus::Effective => mapping.passed += 1,
            ControlStatus::Ineffective => mapping.failed += 1,
            ControlStatus::NotTested => {}
        }
    }

    let overall_score = if tested == 0 {
        0
    } else {
        ((passed as f64 / tested as f64) * 100.0).round() as u8
    };

    (
        Summary {
            controls_tested: tested,
            controls_passed: passed,
            controls_failed: failed,
            overall_score,
        },
        frameworks,
    )
}

fn evidence_chain_info(log: &EvidenceLog) -> EvidenceChainInfo {
    let outcome = log.verify();
    let hash_chain_root = log
        .records()
        .last()
        .map(|r| r.hash.clone())
        .unwrap_or_else(|| crate::evidence_log::GENESIS_HASH.to_string());
    EvidenceChainInfo {
        hash_chain_root,
        record_count: outcome.record_count,
        chain_verified: outcome.valid,
    }
}

/// Assembles and signs a credential. Holds no state of its own beyond a
/// reference to the signing key manager; the evidence log, receipt chain,
/// and transparency registry used for one issuance are passed in per call so
/// the same generator can serve many issuers without juggling lifetimes.
pub struct CredentialGenerator<'a> {
    key_manager: &'a KeyManager,
}

impl<'a> CredentialGenerator<'a> {
    pub fn new(key_manager: &'a KeyManager) -> Self {
        Self { key_manager }
    }

    /// Run the full seven-step pipeline and return the signed JWT-VC.
    pub async fn generate(
        &self,
        input: GenerateCredentialInput,
        evidence_log: Option<&EvidenceLog>,
        receipt_chain: Option<&mut ReceiptChain>,
        registry: Option<&mut dyn ReceiptRegistry>,
    ) -> PoeResult<String> {
        validate(&input.evidence)?;

        let (summary, frameworks) = map_controls(&input.evidence);

        let process_provenance = if let Some(chain) = receipt_chain {
            Some(self.capture_pipeline_receipts(chain, registry, &summary, &frameworks).await?)
        } else {
            None
        };

        let evidence_chain = evidence_log.map(evidence_chain_info);

        let subject = CredentialSubject {
            scope: input.scope,
            provenance: input.evidence.provenance,
            assurance: Assurance {
                declared: input.assurance_declared,
                verified: input.assurance_declared,
                method: input.assurance_method,
                breakdown: None,
            },
            summary,
            frameworks,
            evidence_chain,
            process_provenance,
            dependencies: input.dependencies,
        };

        // Sanitise by round-tripping through Value: structural keys are
        // preserved by sanitize_value, only string leaves are touched.
        let sanitized_value = sanitize_value(&serde_json::to_value(&subject)?);
        let sanitized_subject: CredentialSubject = serde_json::from_value(sanitized_value)?;

        let now = Utc::now();
        let valid_until = now + Duration::days(input.expiry_days);

        let vc = VerifiableCredentialBody {
            context: vec![CREDENTIALS_V2_CONTEXT.to_string()],
            types: vec![VERIFIABLE_CREDENTIAL_TYPE.to_string(), POE_CREDENTIAL_TYPE.to_string()],
            issuer: input.issuer_did.clone(),
            valid_from: now,
            valid_until,
            credential_subject: sanitized_subject,
        };

        let payload = CredentialPayload {
            iss: input.issuer_did.clone(),
            sub: input.issuer_did.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: valid_until.timestamp(),
            vc,
        };

        let header = json!({
            "alg": "EdDSA",
            "typ": JWT_VC_TYP,
            "kid": format!("{}#{}", input.issuer_did, input.kid),
        });
        let payload_value = serde_json::to_value(&payload)?;
        let jwt = jwt::encode_with_signer(&header, &payload_value, |data| self.key_manager.sign(data))?;

        if jwt.len() > MAX_CREDENTIAL_BYTES {
            return Err(PoeError::Input(format!(
                "signed credential is {} bytes, exceeding the {MAX_CREDENTIAL_BYTES}-byte limit",
                jwt.len()
            )));
        }

        Ok(jwt)
    }

    async fn capture_pipeline_receipts(
        &self,
        chain: &mut ReceiptChain,
        mut registry: Option<&mut dyn ReceiptRegistry>,
        summary: &Summary,
        frameworks: &HashMap<String, FrameworkMapping>,
    ) -> PoeResult<ProcessProvenanceInfo> {
        let builder = BuilderAttestation {
            id: "poe-core".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            code_digest: None,
            key_attestation: Some(self.key_manager.key_attestation()),
        };

        let now = Utc::now();
        chain
            .capture_with_signer(
                GenerateReceiptInput {
                    step_name: "classify".to_string(),
                    input_data: json!({"controlsTested": summary.controls_tested}),
                    output_data: json!({
                        "controlsPassed": summary.controls_passed,
                        "controlsFailed": summary.controls_failed,
                        "overallScore": summary.overall_score,
                    }),
                    builder: builder.clone(),
                    reproducible: true,
                    started_at: now,
                    finished_at: now,
                    tool_attestation: None,
                    llm_attestation: None,
                    previous: None,
                },
                |data| self.key_manager.sign(data),
                registry.as_deref_mut(),
            )
            .await?;

        chain
            .capture_with_signer(
                GenerateReceiptInput {
                    step_name: "chart".to_string(),
                    input_data: json!({"frameworks": frameworks.keys().collect::<Vec<_>>()}),
                    output_data: json!({"frameworkCount": frameworks.len()}),
                    builder,
                    reproducible: true,
                    started_at: now,
                    finished_at: now,
                    tool_attestation: None,
                    llm_attestation: None,
                    previous: None,
                },
                |data| self.key_manager.sign(data),
                registry,
            )
            .await?;

        let verification = crate::receipts::chain::verify_process_chain(chain.receipts(), &self.key_manager.current_public_key());
        let scitt_entry_ids = chain
            .receipts()
            .iter()
            .filter_map(|r| r.scitt_entry_id.clone())
            .collect();

        Ok(ProcessProvenanceInfo {
            receipt_count: chain.receipts().len(),
            chain_verified: verification.all_valid,
            chain_digest: chain.chain_digest()?,
            tool_attested_steps: verification.tool_attested_count,
            scitt_entry_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::types::{ControlRecord, EvidenceDocument, Provenance};
    use crate::crypto::jwt as crypto_jwt;
    use crate::resolver::scope::ProvenanceSource;
    use tempfile::tempdir;

    fn sample_evidence() -> NormalizedEvidence {
        NormalizedEvidence {
            document: EvidenceDocument {
                name: "soc2-scan.json".to_string(),
                hash: None,
            },
            controls: vec![
                ControlRecord {
                    id: "CC6.1".to_string(),
                    name: "Logical access".to_string(),
                    framework: "SOC2".to_string(),
                    status: ControlStatus::Effective,
                    description: None,
                },
                ControlRecord {
                    id: "CC6.2".to_string(),
                    name: "New user provisioning".to_string(),
                    framework: "SOC2".to_string(),
                    status: ControlStatus::Effective,
                    description: None,
                },
                ControlRecord {
                    id: "CC7.1".to_string(),
                    name: "Vulnerability scanning".to_string(),
                    framework: "SOC2".to_string(),
                    status: ControlStatus::Ineffective,
                    description: None,
                },
            ],
            provenance: Provenance {
                source: ProvenanceSource::Tool,
                source_identity: Some("scanner-1".to_string()),
                source_date: Some(Utc::now()),
                source_document: Some("soc2-scan.json".to_string()),
            },
        }
    }

    fn base_input() -> GenerateCredentialInput {
        GenerateCredentialInput {
            evidence: sample_evidence(),
            issuer_did: "did:web:issuer.example".to_string(),
            kid: "key-1".to_string(),
            expiry_days: 90,
            scope: "SOC2 Type II".to_string(),
            assurance_declared: 1,
            assurance_method: "automated-scan".to_string(),
            dependencies: None,
        }
    }

    #[tokio::test]
    async fn happy_path_produces_expected_summary_and_valid_jwt() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let generator = CredentialGenerator::new(&manager);

        let jwt = generator.generate(base_input(), None, None, None).await.unwrap();
        let decoded = crypto_jwt::decode_unverified(&jwt).unwrap();
        crypto_jwt::verify(&decoded, &manager.current_public_key()).unwrap();

        let payload: CredentialPayload = serde_json::from_value(decoded.payload).unwrap();
        assert_eq!(payload.vc.credential_subject.summary.controls_tested, 3);
        assert_eq!(payload.vc.credential_subject.summary.controls_passed, 2);
        assert_eq!(payload.vc.credential_subject.summary.controls_failed, 1);
        assert_eq!(payload.vc.credential_subject.summary.overall_score, 67);
        assert_eq!(payload.iss, "did:web:issuer.example");
    }

    #[tokio::test]
    async fn negative_expiry_produces_an_already_expired_credential() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let generator = CredentialGenerator::new(&manager);

        let mut input = base_input();
        input.expiry_days = -1;
        let jwt = generator.generate(input, None, None, None).await.unwrap();
        let decoded = crypto_jwt::decode_unverified(&jwt).unwrap();
        let payload: CredentialPayload = serde_json::from_value(decoded.payload).unwrap();
        assert!(payload.exp < Utc::now().timestamp());
    }

    #[tokio::test]
    async fn empty_controls_is_rejected_before_any_signing() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let generator = CredentialGenerator::new(&manager);

        let mut input = base_input();
        input.evidence.controls.clear();
        let result = generator.generate(input, None, None, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn generated_credential_never_carries_a_raw_ipv4_or_arn() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let generator = CredentialGenerator::new(&manager);

        let mut input = base_input();
        input.evidence.controls[0].description = Some("host 10.1.2.3 flagged by arn:aws:iam::123456789012:role/Audit".to_string());
        let jwt = generator.generate(input, None, None, None).await.unwrap();
        assert!(!jwt.contains("10.1.2.3"));
        assert!(!jwt.contains("123456789012"));
    }
}

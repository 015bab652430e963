//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! A credential issued by an organisation key, attested by a root key, then
//! walked end to end through [`attestation::verify_chain`] — the scenario a
//! relying party actually runs: it never sees the root key directly, only
//! the attestation and the credential.

use chrono::{Duration, Utc};

use poe_core::attestation::{attest_org_key, verify_chain, TrustLevel};
use poe_core::credential::generator::{CredentialGenerator, GenerateCredentialInput};
use poe_core::credential::types::{ControlRecord, ControlStatus, EvidenceDocument, NormalizedEvidence, Provenance};
use poe_core::keys::manager::KeyManager;
use poe_core::resolver::scope::{KeyScope, ProvenanceSource};

fn evidence() -> NormalizedEvidence {
    NormalizedEvidence {
        document: EvidenceDocument {
            name: "soc2-scan.json".to_string(),
            hash: None,
        },
        controls: vec![ControlRecord {
            id: "CC6.1".to_string(),
            name: "Logical access".to_string(),
            framework: "SOC2".to_string(),
            status: ControlStatus::Effective,
            description: None,
        }],
        provenance: Provenance {
            source: ProvenanceSource::Tool,
            source_identity: None,
            source_date: Some(Utc::now()),
            source_document: None,
        },
    }
}

fn credential_input(assurance_declared: u8) -> GenerateCredentialInput {
    GenerateCredentialInput {
        evidence: evidence(),
        issuer_did: "did:web:org.example".to_string(),
        kid: "org-key-1".to_string(),
        expiry_days: 90,
        scope: "SOC2 Type II".to_string(),
        assurance_declared,
        assurance_method: "automated-scan".to_string(),
        dependencies: None,
    }
}

#[tokio::test]
async fn credential_within_attested_scope_chain_verifies() {
    let root_dir = tempfile::tempdir().unwrap();
    let org_dir = tempfile::tempdir().unwrap();
    let root = KeyManager::generate(root_dir.path().join("root.json")).unwrap();
    let org = KeyManager::generate(org_dir.path().join("org.json")).unwrap();

    let scope = KeyScope {
        max_assurance: Some(2),
        frameworks: Some(vec!["SOC2".to_string()]),
        ..Default::default()
    };
    let now = Utc::now();
    let attestation = attest_org_key(
        "did:web:org.example",
        &org.export_jwk(),
        Some(scope),
        &root,
        "did:web:root.example",
        now - Duration::minutes(1),
        now + Duration::days(365),
    )
    .unwrap();

    let credential = CredentialGenerator::new(&org).generate(credential_input(1), None, None, None).await.unwrap();

    let result = verify_chain(&credential, &attestation, &root.current_public_key(), &org.current_public_key());
    assert_eq!(result.trust_level, TrustLevel::ChainVerified);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn credential_exceeding_attested_assurance_fails_the_chain() {
    let root_dir = tempfile::tempdir().unwrap();
    let org_dir = tempfile::tempdir().unwrap();
    let root = KeyManager::generate(root_dir.path().join("root.json")).unwrap();
    let org = KeyManager::generate(org_dir.path().join("org.json")).unwrap();

    let scope = KeyScope {
        max_assurance: Some(1),
        frameworks: Some(vec!["SOC2".to_string()]),
        ..Default::default()
    };
    let now = Utc::now();
    let attestation = attest_org_key(
        "did:web:org.example",
        &org.export_jwk(),
        Some(scope),
        &root,
        "did:web:root.example",
        now - Duration::minutes(1),
        now + Duration::days(365),
    )
    .unwrap();

    let credential = CredentialGenerator::new(&org).generate(credential_input(3), None, None, None).await.unwrap();

    let result = verify_chain(&credential, &attestation, &root.current_public_key(), &org.current_public_key());
    assert_eq!(result.trust_level, TrustLevel::Invalid);
    assert!(result.error.unwrap().contains("maxAssurance"));
}

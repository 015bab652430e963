//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! A credential signed before a key rotation must still verify afterwards,
//! as long as the verifier pulls the full JWKS (current key plus the
//! bounded retired set) rather than only the current key.

use chrono::Utc;

use poe_core::credential::generator::{CredentialGenerator, GenerateCredentialInput};
use poe_core::credential::types::{ControlRecord, ControlStatus, EvidenceDocument, NormalizedEvidence, Provenance};
use poe_core::discovery::jwks::export_jwks;
use poe_core::keys::manager::KeyManager;
use poe_core::resolver::scope::ProvenanceSource;
use poe_core::verifier::verify::{verify, FailureReason};

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

fn input() -> GenerateCredentialInput {
    GenerateCredentialInput {
        evidence: evidence(),
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
async fn credential_signed_before_rotation_still_verifies_via_jwks() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = KeyManager::generate(dir.path().join("key.json")).unwrap();

    let jwt_before = CredentialGenerator::new(&manager).generate(input(), None, None, None).await.unwrap();

    manager.rotate().unwrap();

    let jwt_after = CredentialGenerator::new(&manager).generate(input(), None, None, None).await.unwrap();

    let jwks = export_jwks(&manager);
    assert_eq!(jwks.keys.len(), 2);
    let trusted_keys: Vec<_> = jwks.keys.iter().map(|jwk| jwk.to_public_key().unwrap()).collect();

    let outcome_before = verify(&jwt_before, &trusted_keys);
    assert!(outcome_before.valid, "credential signed before rotation should still verify: {outcome_before:?}");

    let outcome_after = verify(&jwt_after, &trusted_keys);
    assert!(outcome_after.valid, "credential signed after rotation should verify: {outcome_after:?}");
}

#[tokio::test]
async fn verifying_only_the_current_key_rejects_a_pre_rotation_credential() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = KeyManager::generate(dir.path().join("key.json")).unwrap();

    let jwt_before = CredentialGenerator::new(&manager).generate(input(), None, None, None).await.unwrap();
    manager.rotate().unwrap();

    let outcome = verify(&jwt_before, &[manager.current_public_key()]);
    assert!(!outcome.valid);
    assert_eq!(outcome.reason, Some(FailureReason::SignatureInvalid));
}

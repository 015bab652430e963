//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Issuing a credential with both a receipt chain and a transparency-log
//! registry attached should register one entry per pipeline step and leave
//! every entry's inclusion receipt verifiable under the log's own key.

use chrono::Utc;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use poe_core::credential::generator::{CredentialGenerator, GenerateCredentialInput};
use poe_core::credential::types::{ControlRecord, ControlStatus, EvidenceDocument, NormalizedEvidence, Provenance};
use poe_core::keys::manager::KeyManager;
use poe_core::receipts::chain::{ReceiptChain, ReceiptRegistry};
use poe_core::resolver::scope::ProvenanceSource;
use poe_core::transparency::log::TransparencyLog;

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
async fn issuance_registers_every_captured_step_with_a_verifiable_inclusion_receipt() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
    let generator = CredentialGenerator::new(&manager);

    let mut chain = ReceiptChain::new();
    let mut log = TransparencyLog::new("log-1", SigningKey::generate(&mut OsRng));

    generator
        .generate(input(), None, Some(&mut chain), Some(&mut log as &mut dyn ReceiptRegistry))
        .await
        .unwrap();

    assert_eq!(chain.receipts().len(), 2);
    assert_eq!(log.entry_count(), 2);

    let log_public_key = log.public_key();
    for receipt in chain.receipts() {
        let entry_id = receipt.scitt_entry_id.as_ref().expect("receipt should carry its transparency entry id");
        assert!(log.verify_receipt(entry_id, &log_public_key), "inclusion receipt for {entry_id} should verify");
    }
}

#[tokio::test]
async fn issuance_without_a_registry_leaves_receipts_unregistered() {
    let dir = tempfile::tempdir().unwrap();
    let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
    let generator = CredentialGenerator::new(&manager);

    let mut chain = ReceiptChain::new();
    generator.generate(input(), None, Some(&mut chain), None).await.unwrap();

    assert_eq!(chain.receipts().len(), 2);
    assert!(chain.receipts().iter().all(|r| r.scitt_entry_id.is_none()));
}

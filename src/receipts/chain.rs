//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Receipt chain: captures pipeline steps in call order, links each to its
//! predecessor by body hash, and exposes a Merkle "chain digest" over every
//! body hash in the chain.

use async_trait::async_trait;
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::receipt::{
    body_hash, generate_receipt, generate_receipt_with_signer, verify_receipt, GenerateReceiptInput, PreviousReceiptLink,
    Receipt,
};
use crate::error::{ChainError, PoeResult};
use crate::merkle;

/// Submits a serialised receipt to a transparency log and returns the
/// resulting entry id. Implemented by [`crate::transparency::log::TransparencyLog`].
#[async_trait]
pub trait ReceiptRegistry: Send + Sync {
    async fn register(&mut self, statement: &str) -> PoeResult<String>;
}

fn hash_to_leaf(hash_hex: &str) -> PoeResult<[u8; 32]> {
    let bytes = hex::decode(hash_hex).map_err(|e| ChainError::OutOfOrder {
        index: 0,
        expected: "valid hex body hash".to_string(),
        found: format!("{e}"),
    })?;
    bytes
        .try_into()
        .map_err(|_| ChainError::Gap(0).into())
}

#[derive(Debug, Default)]
pub struct ReceiptChain {
    receipts: Vec<Receipt>,
}

impl ReceiptChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Capture one pipeline step, automatically linking it to the prior
    /// receipt and, if `registry` is supplied, submitting it for
    /// registration and recording the returned entry id.
    pub async fn capture(
        &mut self,
        mut input: GenerateReceiptInput,
        signing_key: &SigningKey,
        registry: Option<&mut dyn ReceiptRegistry>,
    ) -> PoeResult<&Receipt> {
        if let Some(previous) = self.receipts.last() {
            input.previous = Some(PreviousReceiptLink {
                hash: body_hash(previous),
                scitt_entry_id: previous.scitt_entry_id.clone(),
            });
        }

        let mut receipt = generate_receipt(input, signing_key);

        if let Some(registry) = registry {
            let statement = serde_json::to_string(&receipt)?;
            let entry_id = registry.register(&statement).await?;
            receipt.scitt_entry_id = Some(entry_id);
        }

        self.receipts.push(receipt);
        Ok(self.receipts.last().expect("just pushed"))
    }

    /// As [`Self::capture`], but signs through a caller-supplied closure
    /// instead of a raw key — used by callers that hold a
    /// [`crate::keys::manager::KeyManager`] rather than a bare `SigningKey`.
    pub async fn capture_with_signer(
        &mut self,
        mut input: GenerateReceiptInput,
        sign: impl FnOnce(&[u8]) -> [u8; 64],
        registry: Option<&mut dyn ReceiptRegistry>,
    ) -> PoeResult<&Receipt> {
        if let Some(previous) = self.receipts.last() {
            input.previous = Some(PreviousReceiptLink {
                hash: body_hash(previous),
                scitt_entry_id: previous.scitt_entry_id.clone(),
            });
        }

        let mut receipt = generate_receipt_with_signer(input, |data| crate::crypto::cose::sign1_with_signer(data, sign));

        if let Some(registry) = registry {
            let statement = serde_json::to_string(&receipt)?;
            let entry_id = registry.register(&statement).await?;
            receipt.scitt_entry_id = Some(entry_id);
        }

        self.receipts.push(receipt);
        Ok(self.receipts.last().expect("just pushed"))
    }

    /// Merkle root over every receipt's body hash. Fatal on an empty chain.
    pub fn chain_digest(&self) -> PoeResult<String> {
        if self.receipts.is_empty() {
            return Err(ChainError::Empty.into());
        }
        let leaves = self
            .receipts
            .iter()
            .map(|r| hash_to_leaf(&body_hash(r)))
            .collect::<PoeResult<Vec<_>>>()?;
        let root = merkle::root(&leaves)?;
        Ok(hex::encode(root))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVerificationResult {
    pub total: usize,
    pub valid_signatures: usize,
    pub valid_links: usize,
    pub valid_temporal_order: usize,
    pub chain_digest: Option<String>,
    pub reproducible_count: usize,
    pub tool_attested_count: usize,
    pub llm_attested_count: usize,
    pub transparency_registered_count: usize,
    pub all_valid: bool,
}

/// Verify an entire receipt chain: every signature, every hash link, every
/// temporal ordering, plus rollup counts used by policy evaluation.
pub fn verify_process_chain(receipts: &[Receipt], public_key: &VerifyingKey) -> ProcessVerificationResult {
    let total = receipts.len();
    let mut valid_signatures = 0;
    let mut valid_links = 0;
    let mut valid_temporal_order = 0;
    let mut reproducible_count = 0;
    let mut tool_attested_count = 0;
    let mut llm_attested_count = 0;
    let mut transparency_registered_count = 0;

    for (i, receipt) in receipts.iter().enumerate() {
        if verify_receipt(receipt, public_key).verified {
            valid_signatures += 1;
        }

        if i == 0 {
            if receipt.predicate.previous_receipt.is_none() {
                valid_links += 1;
            }
            valid_temporal_order += 1;
        } else {
            let expected_hash = body_hash(&receipts[i - 1]);
            let link_ok = receipt
                .predicate
                .previous_receipt
                .as_ref()
                .map(|link| link.hash == expected_hash)
                .unwrap_or(false);
            if link_ok {
                valid_links += 1;
            }
            if receipt.predicate.metadata.started_at >= receipts[i - 1].predicate.metadata.finished_at {
                valid_temporal_order += 1;
            }
        }

        if receipt.predicate.reproducible {
            reproducible_count += 1;
        }
        if receipt.predicate.tool_attestation.is_some() {
            tool_attested_count += 1;
        }
        if receipt.predicate.llm_attestation.is_some() {
            llm_attested_count += 1;
        }
        if receipt.scitt_entry_id.is_some() {
            transparency_registered_count += 1;
        }
    }

    let chain_digest = if receipts.is_empty() {
        None
    } else {
        receipts
            .iter()
            .map(|r| hash_to_leaf(&body_hash(r)))
            .collect::<PoeResult<Vec<_>>>()
            .ok()
            .and_then(|leaves| merkle::root(&leaves).ok())
            .map(hex::encode)
    };

    let all_valid = total > 0 && valid_signatures == total && valid_links == total && valid_temporal_order == total;

    ProcessVerificationResult {
        total,
        valid_signatures,
        valid_links,
        valid_temporal_order,
        chain_digest,
        reproducible_count,
        tool_attested_count,
        llm_attested_count,
        transparency_registered_count,
        all_valid,
    }
}

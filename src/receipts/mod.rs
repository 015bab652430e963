//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Process receipts: in-toto-style signed attestations of pipeline steps,
//! and the hash-linked chain that joins them.

pub mod chain;
pub mod receipt;

pub use chain::{ProcessVerificationResult, ReceiptChain, ReceiptRegistry};
pub use receipt::{
    BuilderAttestation, Digest, GenerateReceiptInput, LlmAttestation, PreviousReceiptLink, Receipt,
    ReceiptMetadata, ReceiptVerification, Subject, ToolAttestation,
};

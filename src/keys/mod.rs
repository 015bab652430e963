//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Key lifecycle management: file-backed and KMS-backed Ed25519 key
//! managers, plus DID document minting.

pub mod did;
pub mod kms;
pub mod manager;

use serde::{Deserialize, Serialize};

/// Returned by `rotate()`: the new current public key and the public key
/// that was just demoted to the retired set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationOutcome {
    pub new_public_kid: String,
    pub retired_public_kid: String,
}

/// Metadata a process receipt attaches to describe the signing key's
/// custody, independent of whether it is file-backed or KMS-backed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyAttestationMetadata {
    #[serde(rename = "type")]
    pub key_type: String,
    pub provider: String,
    pub non_exportable: bool,
}

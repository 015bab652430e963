//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! JWKS discovery artefact: the current signing key plus every retired key
//! still within its bounded window, so a verifier mid-rotation can still
//! validate recently-issued credentials.

use serde::{Deserialize, Serialize};

use crate::crypto::ed25519::Jwk;
use crate::keys::manager::KeyManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Build a JWKS containing `manager`'s current key first, followed by every
/// retired key still in its bounded retention window.
pub fn export_jwks(manager: &KeyManager) -> Jwks {
    let mut keys = vec![manager.export_jwk()];
    keys.extend(
        manager
            .retired_public_keys()
            .into_iter()
            .map(|(kid, key)| Jwk::from_public_key(&key, Some(kid))),
    );
    Jwks { keys }
}

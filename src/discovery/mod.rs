//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Discovery artefacts a verifier needs before it can even fetch a
//! credential: `trust.txt`, JWKS. DID documents are minted by
//! [`crate::keys::manager::KeyManager::generate_did_document`] and resolved
//! by [`crate::resolver::did_resolver`].

pub mod jwks;
pub mod trust_txt;

pub use jwks::{export_jwks, Jwks};
pub use trust_txt::TrustRecord;

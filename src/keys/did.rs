//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! `did:web` document minting and lookup.

use ed25519_dalek::VerifyingKey;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::crypto::ed25519::Jwk;
use crate::resolver::scope::KeyScope;

const COLON: &AsciiSet = &CONTROLS.add(b':');

/// Percent-encode any `:` in `domain`, producing the `did:web:` identifier.
pub fn did_web_id(domain: &str) -> String {
    format!("did:web:{}", utf8_percent_encode(domain, COLON))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    pub public_key_jwk: Jwk,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<KeyScope>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,
    pub authentication: Vec<String>,
    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,
}

impl DidDocument {
    /// Mint a document for `domain` with one verification method, used for
    /// both `authentication` and `assertionMethod`.
    pub fn new(domain: &str, kid: &str, public_key: &VerifyingKey) -> Self {
        let did = did_web_id(domain);
        let method_id = format!("{did}#{kid}");
        let method = VerificationMethod {
            id: method_id.clone(),
            method_type: "JsonWebKey2020".to_string(),
            controller: did.clone(),
            public_key_jwk: Jwk::from_public_key(public_key, Some(kid.to_string())),
            scope: None,
        };
        DidDocument {
            context: vec![
                "https://www.w3.org/ns/did/v1".to_string(),
                "https://w3id.org/security/suites/jws-2020/v1".to_string(),
            ],
            id: did,
            verification_method: vec![method],
            authentication: vec![method_id.clone()],
            assertion_method: vec![method_id],
        }
    }

    /// Attach a key scope to the document's sole verification method.
    pub fn with_scope(mut self, scope: KeyScope) -> Self {
        if let Some(method) = self.verification_method.first_mut() {
            method.scope = Some(scope);
        }
        self
    }

    pub fn verification_method_by_kid(&self, kid: &str) -> Option<&VerificationMethod> {
        self.verification_method.iter().find(|m| m.id.ends_with(kid) || m.id == kid)
    }

    pub fn scope_for(&self, kid: &str) -> Option<&KeyScope> {
        self.verification_method_by_kid(kid).and_then(|m| m.scope.as_ref())
    }
}

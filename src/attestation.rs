//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Key attestation chain: root key -> organisation key attestation ->
//! credential, modelled on X.509 path validation but expressed as a JWT
//! chain instead of a certificate chain.

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::crypto::ed25519::Jwk;
use crate::crypto::jwt;
use crate::error::PoeResult;
use crate::keys::manager::KeyManager;
use crate::resolver::scope::{enforce, scope_check_input_from_credential_payload, KeyPurpose, KeyScope, ScopeCheckInput, ScopeEnforcement};

pub const ATTESTATION_TYP: &str = "attestation+jwt";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    pub iss: String,
    pub sub: String,
    pub thumbprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<KeyScope>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Sign an attestation JWT binding `org_did`'s public key to `root_did`,
/// constrained by `scope` and the `[valid_from, valid_until)` window.
pub fn attest_org_key(
    org_did: &str,
    org_public_key_jwk: &Jwk,
    scope: Option<KeyScope>,
    root_key_manager: &KeyManager,
    root_did: &str,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> PoeResult<String> {
    let thumbprint = org_public_key_jwk.thumbprint();
    let payload = AttestationPayload {
        iss: root_did.to_string(),
        sub: org_did.to_string(),
        thumbprint,
        scope,
        valid_from,
        valid_until,
    };
    let header = serde_json::json!({
        "alg": "EdDSA",
        "typ": ATTESTATION_TYP,
        "kid": format!("{root_did}#{}", root_key_manager.current_kid()),
    });
    let payload_value = serde_json::to_value(&payload)?;
    Ok(jwt::encode_with_signer(&header, &payload_value, |data| root_key_manager.sign(data))?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustLevel {
    Invalid,
    ChainVerified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainVerificationResult {
    pub trust_level: TrustLevel,
    pub chain: Vec<String>,
    pub error: Option<String>,
    pub scope_enforcement: Option<ScopeEnforcement>,
}

fn invalid(chain: Vec<&str>, error: impl Into<String>) -> ChainVerificationResult {
    ChainVerificationResult {
        trust_level: TrustLevel::Invalid,
        chain: chain.into_iter().map(str::to_string).collect(),
        error: Some(error.into()),
        scope_enforcement: None,
    }
}

/// Verify the three-link chain: root key signed the attestation, the
/// attested thumbprint matches the organisation key, and the organisation
/// key signed the credential — then enforce the attested scope over it.
pub fn verify_chain(
    credential_jwt: &str,
    attestation_jwt: &str,
    root_public_key: &VerifyingKey,
    org_public_key: &VerifyingKey,
) -> ChainVerificationResult {
    let attestation = match jwt::decode_unverified(attestation_jwt) {
        Ok(d) => d,
        Err(e) => return invalid(vec!["root"], format!("malformed attestation: {e}")),
    };
    if jwt::verify(&attestation, root_public_key).is_err() {
        return invalid(vec!["root"], "attestation signature invalid under root key");
    }

    let attestation_payload: AttestationPayload = match serde_json::from_value(attestation.payload.clone()) {
        Ok(p) => p,
        Err(e) => return invalid(vec!["root", "attestation"], format!("malformed attestation payload: {e}")),
    };

    let org_jwk = Jwk::from_public_key(org_public_key, None);
    if org_jwk.thumbprint() != attestation_payload.thumbprint {
        return invalid(
            vec!["root", "attestation"],
            "organisation key thumbprint does not match attested value",
        );
    }

    let now = Utc::now();
    if now < attestation_payload.valid_from || now >= attestation_payload.valid_until {
        return invalid(vec!["root", "attestation"], "attestation is outside its validity window");
    }

    let credential = match jwt::decode_unverified(credential_jwt) {
        Ok(d) => d,
        Err(e) => return invalid(vec!["root", "attestation"], format!("malformed credential: {e}")),
    };
    if jwt::verify(&credential, org_public_key).is_err() {
        return invalid(
            vec!["root", "attestation"],
            "credential signature invalid under organisation key",
        );
    }

    let scope_enforcement = match scope_check_input_from_credential_payload(&credential.payload, KeyPurpose::Sign) {
        Some(input) => enforce(attestation_payload.scope.as_ref(), &input),
        None => enforce(attestation_payload.scope.as_ref(), &ScopeCheckInput {
            frameworks: Vec::new(),
            declared_assurance: 0,
            source: None,
            purpose: KeyPurpose::Sign,
        }),
    };

    if !scope_enforcement.scope_valid {
        let message = scope_enforcement.violations.join("; ");
        return ChainVerificationResult {
            trust_level: TrustLevel::Invalid,
            chain: vec!["root".to_string(), "attestation".to_string(), "credential".to_string()],
            error: Some(format!("CPOE {message}")),
            scope_enforcement: Some(scope_enforcement),
        };
    }

    ChainVerificationResult {
        trust_level: TrustLevel::ChainVerified,
        chain: vec!["root".to_string(), "attestation".to_string(), "credential".to_string()],
        error: None,
        scope_enforcement: Some(scope_enforcement),
    }
}

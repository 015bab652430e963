//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Credential Verifier: signature verification against a trusted-key set or
//! a resolved DID document, with an ordered failure-reason taxonomy shared
//! by both entry points.

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::config::PoeConfig;
use crate::crypto::jwt::{self, DecodedJwt};
use crate::resolver::did_resolver;
use crate::resolver::scope::{enforce, scope_check_input_from_credential_payload, KeyPurpose, ScopeEnforcement};

pub const CREDENTIALS_V2_CONTEXT: &str = "https://www.w3.org/ns/credentials/v2";
pub const VERIFIABLE_CREDENTIAL_TYPE: &str = "VerifiableCredential";

/// Ordered failure-reason taxonomy: when more than one check fails,
/// [`verify`] reports whichever comes first in this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    SchemaInvalid,
    Expired,
    SignatureInvalid,
    EvidenceMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn schema_invalid(outcome: VerifyOutcome) -> VerifyOutcome {
    VerifyOutcome {
        valid: false,
        reason: Some(FailureReason::SchemaInvalid),
        ..outcome
    }
}

fn vc_claims_valid(decoded: &DecodedJwt) -> bool {
    let Some(vc) = decoded.payload.get("vc") else {
        return false;
    };
    let context_ok = vc
        .get("@context")
        .and_then(|v| v.as_array())
        .map(|ctx| ctx.iter().any(|v| v.as_str() == Some(CREDENTIALS_V2_CONTEXT)))
        .unwrap_or(false);
    let type_ok = vc
        .get("type")
        .and_then(|v| v.as_array())
        .map(|types| types.iter().any(|v| v.as_str() == Some(VERIFIABLE_CREDENTIAL_TYPE)))
        .unwrap_or(false);
    let subject_present = vc.get("credentialSubject").is_some();
    context_ok && type_ok && subject_present
}

/// Verify `jwt` against every key in `trusted_keys`, stopping at the first
/// that validates the signature. Always computes every check so the
/// reported failure reason follows the taxonomy's priority order rather
/// than the order checks happen to run in.
pub fn verify(jwt: &str, trusted_keys: &[VerifyingKey]) -> VerifyOutcome {
    let decoded = match jwt::decode_unverified(jwt) {
        Ok(d) => d,
        Err(_) => {
            return VerifyOutcome {
                valid: false,
                reason: Some(FailureReason::SchemaInvalid),
                signed_by: None,
                generated_at: None,
                expires_at: None,
            }
        }
    };

    let generated_at = decoded.payload.get("iat").and_then(|v| v.as_i64()).and_then(|t| DateTime::from_timestamp(t, 0));
    let expires_at = decoded.payload.get("exp").and_then(|v| v.as_i64()).and_then(|t| DateTime::from_timestamp(t, 0));

    let base = VerifyOutcome {
        valid: false,
        reason: None,
        signed_by: None,
        generated_at,
        expires_at,
    };

    let expired = expires_at.map(|exp| Utc::now() >= exp).unwrap_or(true);

    let signed_by = trusted_keys.iter().find(|key| jwt::verify(&decoded, key).is_ok());
    let signature_ok = signed_by.is_some();

    let schema_ok = vc_claims_valid(&decoded);

    if schema_ok && !expired && signature_ok {
        return VerifyOutcome {
            valid: true,
            reason: None,
            signed_by: signed_by.map(|k| hex::encode(k.as_bytes())),
            ..base
        };
    }

    if !schema_ok {
        return schema_invalid(base);
    }
    if expired {
        return VerifyOutcome {
            valid: false,
            reason: Some(FailureReason::Expired),
            ..base
        };
    }
    VerifyOutcome {
        valid: false,
        reason: Some(FailureReason::SignatureInvalid),
        ..base
    }
}

/// As [`verify`], but resolves the signing key from the issuer's `did:web`
/// document rather than a caller-supplied trusted-key list, and additionally
/// reports key-scope enforcement over the credential.
pub async fn verify_via_did(jwt: &str, config: &PoeConfig) -> (VerifyOutcome, Option<ScopeEnforcement>) {
    let header = match crate::crypto::jwt::decode_unverified(jwt) {
        Ok(d) => d.header,
        Err(_) => {
            return (
                VerifyOutcome {
                    valid: false,
                    reason: Some(FailureReason::SchemaInvalid),
                    signed_by: None,
                    generated_at: None,
                    expires_at: None,
                },
                None,
            )
        }
    };

    let Some(kid) = header.get("kid").and_then(|v| v.as_str()) else {
        return (
            VerifyOutcome {
                valid: false,
                reason: Some(FailureReason::SchemaInvalid),
                signed_by: None,
                generated_at: None,
                expires_at: None,
            },
            None,
        );
    };

    let Some((did, _fragment)) = kid.split_once('#') else {
        return (
            VerifyOutcome {
                valid: false,
                reason: Some(FailureReason::SchemaInvalid),
                signed_by: None,
                generated_at: None,
                expires_at: None,
            },
            None,
        );
    };

    let resolution = did_resolver::resolve(did, config).await;
    let Some(document) = resolution.did_document else {
        return (
            VerifyOutcome {
                valid: false,
                reason: Some(FailureReason::SignatureInvalid),
                signed_by: None,
                generated_at: None,
                expires_at: None,
            },
            None,
        );
    };

    let Some(method) = document.verification_method_by_kid(kid) else {
        return (
            VerifyOutcome {
                valid: false,
                reason: Some(FailureReason::SignatureInvalid),
                signed_by: None,
                generated_at: None,
                expires_at: None,
            },
            None,
        );
    };

    let public_key = match method.public_key_jwk.to_public_key() {
        Ok(k) => k,
        Err(_) => {
            return (
                VerifyOutcome {
                    valid: false,
                    reason: Some(FailureReason::SignatureInvalid),
                    signed_by: None,
                    generated_at: None,
                    expires_at: None,
                },
                None,
            )
        }
    };

    let outcome = verify(jwt, std::slice::from_ref(&public_key));

    let scope = document.scope_for(kid);
    let decoded = jwt::decode_unverified(jwt).ok();
    let scope_enforcement = decoded.and_then(|d| scope_check_input_from_credential_payload(&d.payload, KeyPurpose::Sign)).map(|input| enforce(scope, &input));

    (outcome, scope_enforcement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::jwt::encode;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;
    use serde_json::json;

    fn vc_payload(iat: i64, exp: i64) -> serde_json::Value {
        json!({
            "iss": "did:web:issuer.example",
            "iat": iat,
            "exp": exp,
            "vc": {
                "@context": [CREDENTIALS_V2_CONTEXT],
                "type": [VERIFIABLE_CREDENTIAL_TYPE, "ProofOfOperationalEffectivenessCredential"],
                "credentialSubject": {"scope": "SOC2 Type II"},
            }
        })
    }

    #[test]
    fn valid_credential_verifies_and_reports_metadata() {
        let key = SigningKey::generate(&mut OsRng);
        let now = Utc::now().timestamp();
        let header = json!({"alg": "EdDSA", "typ": "vc+jwt"});
        let jwt_str = encode(&header, &vc_payload(now, now + 86400), &key).unwrap();

        let outcome = verify(&jwt_str, &[key.verifying_key()]);
        assert!(outcome.valid);
        assert!(outcome.reason.is_none());
        assert!(outcome.signed_by.is_some());
    }

    #[test]
    fn expired_credential_reports_expired() {
        let key = SigningKey::generate(&mut OsRng);
        let now = Utc::now().timestamp();
        let header = json!({"alg": "EdDSA", "typ": "vc+jwt"});
        let jwt_str = encode(&header, &vc_payload(now - 100_000, now - 1), &key).unwrap();

        let outcome = verify(&jwt_str, &[key.verifying_key()]);
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(FailureReason::Expired));
    }

    #[test]
    fn untrusted_key_reports_signature_invalid() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let now = Utc::now().timestamp();
        let header = json!({"alg": "EdDSA", "typ": "vc+jwt"});
        let jwt_str = encode(&header, &vc_payload(now, now + 86400), &key).unwrap();

        let outcome = verify(&jwt_str, &[other.verifying_key()]);
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(FailureReason::SignatureInvalid));
    }

    #[test]
    fn missing_credential_subject_reports_schema_invalid() {
        let key = SigningKey::generate(&mut OsRng);
        let now = Utc::now().timestamp();
        let header = json!({"alg": "EdDSA", "typ": "vc+jwt"});
        let payload = json!({
            "iat": now,
            "exp": now + 86400,
            "vc": {"@context": [CREDENTIALS_V2_CONTEXT], "type": [VERIFIABLE_CREDENTIAL_TYPE]},
        });
        let jwt_str = encode(&header, &payload, &key).unwrap();

        let outcome = verify(&jwt_str, &[key.verifying_key()]);
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(FailureReason::SchemaInvalid));
    }

    #[test]
    fn schema_invalid_takes_priority_over_expired_and_signature() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let now = Utc::now().timestamp();
        let header = json!({"alg": "EdDSA", "typ": "vc+jwt"});
        let payload = json!({"iat": now - 100_000, "exp": now - 1, "vc": {}});
        let jwt_str = encode(&header, &payload, &key).unwrap();

        let outcome = verify(&jwt_str, &[other.verifying_key()]);
        assert_eq!(outcome.reason, Some(FailureReason::SchemaInvalid));
    }

    #[test]
    fn malformed_jwt_reports_schema_invalid() {
        let outcome = verify("not-a-jwt", &[]);
        assert!(!outcome.valid);
        assert_eq!(outcome.reason, Some(FailureReason::SchemaInvalid));
    }
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! COSE_Sign1 (RFC 9052 §4.2 subset) over the minimal CBOR in [`super::cbor`].
//!
//! The structure is a 4-element CBOR array: protected header (bstr-wrapped
//! CBOR map), unprotected header (empty map), payload (bstr), signature
//! (bstr). Only `alg = EdDSA (-8)` is supported; any other algorithm in the
//! protected header fails closed at verify time.

use ed25519_dalek::{SigningKey, VerifyingKey};

use super::cbor::{decode, encode, CborValue};
use crate::error::CryptoError;

const ALG_LABEL: i64 = 1;
const ALG_EDDSA: i64 = -8;

fn protected_header_bytes() -> Vec<u8> {
    let map = CborValue::Map(vec![(CborValue::int(ALG_LABEL), CborValue::int(ALG_EDDSA))]);
    encode(&map)
}

fn signing_input(protected: &[u8], payload: &[u8]) -> Vec<u8> {
    let structure = CborValue::Array(vec![
        CborValue::Text("Signature1".to_string()),
        CborValue::Bytes(protected.to_vec()),
        CborValue::Bytes(Vec::new()), // external_aad, always empty here
        CborValue::Bytes(payload.to_vec()),
    ]);
    encode(&structure)
}

/// Produce a COSE_Sign1 structure over `payload`, signed with `key`.
pub fn sign1(payload: &[u8], key: &SigningKey) -> Vec<u8> {
    sign1_with_signer(payload, |data| super::ed25519::sign(key, data))
}

/// As [`sign1`], but signs through a caller-supplied closure instead of a
/// raw key — lets a [`crate::keys::manager::KeyManager`], which never hands
/// out its private key, sign COSE_Sign1 structures directly.
pub fn sign1_with_signer(payload: &[u8], sign: impl FnOnce(&[u8]) -> [u8; 64]) -> Vec<u8> {
    let protected = protected_header_bytes();
    let tbs = signing_input(&protected, payload);
    let signature = sign(&tbs);

    let structure = CborValue::Array(vec![
        CborValue::Bytes(protected),
        CborValue::Map(Vec::new()), // unprotected header, always empty here
        CborValue::Bytes(payload.to_vec()),
        CborValue::Bytes(signature.to_vec()),
    ]);
    encode(&structure)
}

/// Verify a COSE_Sign1 structure under `public_key`, returning the payload on success.
pub fn verify1(cose_bytes: &[u8], public_key: &VerifyingKey) -> Result<Vec<u8>, CryptoError> {
    let value = decode(cose_bytes)?;
    let items = match value {
        CborValue::Array(items) if items.len() == 4 => items,
        _ => return Err(CryptoError::MalformedCbor("expected 4-element COSE_Sign1 array".into())),
    };

    let protected = match &items[0] {
        CborValue::Bytes(b) => b.clone(),
        _ => return Err(CryptoError::MalformedCbor("protected header must be a byte string".into())),
    };
    let payload = match &items[2] {
        CborValue::Bytes(b) => b.clone(),
        _ => return Err(CryptoError::MalformedCbor("payload must be a byte string".into())),
    };
    let signature = match &items[3] {
        CborValue::Bytes(b) => b.clone(),
        _ => return Err(CryptoError::MalformedCbor("signature must be a byte string".into())),
    };

    verify_alg_is_eddsa(&protected)?;

    let tbs = signing_input(&protected, &payload);
    super::ed25519::verify(public_key, &tbs, &signature)?;
    Ok(payload)
}

fn verify_alg_is_eddsa(protected: &[u8]) -> Result<(), CryptoError> {
    let map = decode(protected)?;
    let entries = match map {
        CborValue::Map(entries) => entries,
        _ => return Err(CryptoError::MalformedCbor("protected header must be a CBOR map".into())),
    };
    for (k, v) in entries {
        if k == CborValue::int(ALG_LABEL) {
            if v == CborValue::int(ALG_EDDSA) {
                return Ok(());
            }
            return Err(CryptoError::UnknownAlgorithm(format!("{v:?}")));
        }
    }
    Err(CryptoError::UnknownAlgorithm("missing alg".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_and_verify_round_trip() {
        let key = SigningKey::generate(&mut OsRng);
        let cose = sign1(b"hello", &key);
        let payload = verify1(&cose, &key.verifying_key()).unwrap();
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn verify_fails_under_wrong_key() {
        let key = SigningKey::generate(&mut OsRng);
        let other = SigningKey::generate(&mut OsRng);
        let cose = sign1(b"hello", &key);
        assert!(verify1(&cose, &other.verifying_key()).is_err());
    }

    #[test]
    fn verify_fails_on_tampered_payload() {
        let key = SigningKey::generate(&mut OsRng);
        let mut cose = sign1(b"hello", &key);
        // Flip a byte well inside the encoded payload text.
        let idx = cose.len() - 10;
        cose[idx] ^= 0xff;
        assert!(verify1(&cose, &key.verifying_key()).is_err());
    }

    #[test]
    fn rejects_non_eddsa_alg() {
        let key = SigningKey::generate(&mut OsRng);
        // Build a COSE_Sign1 with alg = -7 (ES256) instead of -8.
        let protected = encode(&CborValue::Map(vec![(CborValue::int(1), CborValue::int(-7))]));
        let payload = b"x".to_vec();
        let tbs = signing_input(&protected, &payload);
        let sig = super::super::ed25519::sign(&key, &tbs);
        let structure = CborValue::Array(vec![
            CborValue::Bytes(protected),
            CborValue::Map(Vec::new()),
            CborValue::Bytes(payload),
            CborValue::Bytes(sig.to_vec()),
        ]);
        let bytes = encode(&structure);
        assert!(verify1(&bytes, &key.verifying_key()).is_err());
    }
}

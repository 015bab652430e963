//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! The minimal EdDSA-JWT subset this system needs: compact serialisation
//! (`base64url(header).base64url(payload).base64url(signature)`) with
//! `alg=EdDSA` only. Not a general-purpose JOSE implementation — no other
//! algorithm, no JWE, no detached payloads.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde_json::Value;

use super::ed25519;
use crate::error::CryptoError;

/// Encode `header`/`payload` as a compact JWT signed with `signing_key`.
pub fn encode(header: &Value, payload: &Value, signing_key: &SigningKey) -> Result<String, CryptoError> {
    encode_with_signer(header, payload, |data| ed25519::sign(signing_key, data))
}

/// Encode `header`/`payload`, signing the `header.payload` bytes with `sign`.
/// Lets callers that don't hold a raw [`SigningKey`] (a KMS-backed or
/// file-backed key manager) produce a JWT without exposing the key.
pub fn encode_with_signer(
    header: &Value,
    payload: &Value,
    sign: impl FnOnce(&[u8]) -> [u8; 64],
) -> Result<String, CryptoError> {
    let header_json = serde_json::to_vec(header)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("unserialisable JWT header: {e}")))?;
    let payload_json = serde_json::to_vec(payload)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("unserialisable JWT payload: {e}")))?;

    let signing_input = format!("{}.{}", BASE64URL.encode(header_json), BASE64URL.encode(payload_json));
    let signature = sign(signing_input.as_bytes());
    Ok(format!("{signing_input}.{}", BASE64URL.encode(signature)))
}

/// A JWT split into its three segments, with header and payload parsed but
/// the signature not yet checked against any key.
#[derive(Debug, Clone)]
pub struct DecodedJwt {
    pub header: Value,
    pub payload: Value,
    signing_input: String,
    signature: Vec<u8>,
}

/// Split `token` into exactly three base64url segments and parse the first
/// two as JSON, without verifying the signature.
pub fn decode_unverified(token: &str) -> Result<DecodedJwt, CryptoError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(CryptoError::InvalidKeyFormat(format!(
            "expected 3 JWT segments, found {}",
            parts.len()
        )));
    }

    let header_bytes = BASE64URL
        .decode(parts[0])
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("bad header base64url: {e}")))?;
    let header: Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("bad header json: {e}")))?;

    let payload_bytes = BASE64URL
        .decode(parts[1])
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("bad payload base64url: {e}")))?;
    let payload: Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("bad payload json: {e}")))?;

    let signature = BASE64URL
        .decode(parts[2])
        .map_err(|e| CryptoError::InvalidKeyFormat(format!("bad signature base64url: {e}")))?;

    Ok(DecodedJwt {
        header,
        payload,
        signing_input: format!("{}.{}", parts[0], parts[1]),
        signature,
    })
}

/// Verify `decoded`'s signature under `public_key`.
pub fn verify(decoded: &DecodedJwt, public_key: &VerifyingKey) -> Result<(), CryptoError> {
    ed25519::verify(public_key, decoded.signing_input.as_bytes(), &decoded.signature)
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Unified error hierarchy for the poe-core workspace.
//!
//! Every component surfaces one of the taxonomy categories described in the
//! policy/verification design; adapters map `category()`/`http_status()` to
//! wire-level responses rather than re-deriving the mapping themselves.

use thiserror::Error;

/// Crate-wide result alias.
pub type PoeResult<T> = Result<T, PoeError>;

/// Error-category taxonomy consumed by adapters to choose a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    SchemaInvalid,
    Expired,
    SignatureInvalid,
    EvidenceMismatch,
    ScopeViolation,
    PolicyViolation,
    ResolutionError,
    Conflict,
    Internal,
}

/// Top-level unified error type for poe-core operations.
#[derive(Error, Debug)]
pub enum PoeError {
    #[error("bad input: {0}")]
    Input(String),

    #[error("schema invalid: {0}")]
    SchemaInvalid(String),

    #[error("expired: {0}")]
    Expired(String),

    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("evidence mismatch: {0}")]
    EvidenceMismatch(String),

    #[error("scope violation: {0}")]
    ScopeViolation(String),

    #[error("policy violation: {0:?}")]
    PolicyViolation(Vec<String>),

    #[error("resolution error: {0}")]
    ResolutionError(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("transparency error: {0}")]
    Transparency(#[from] TransparencyError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PoeError {
    /// The §7 taxonomy tag for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PoeError::Input(_) => ErrorCategory::Input,
            PoeError::SchemaInvalid(_) => ErrorCategory::SchemaInvalid,
            PoeError::Expired(_) => ErrorCategory::Expired,
            PoeError::SignatureInvalid(_) => ErrorCategory::SignatureInvalid,
            PoeError::EvidenceMismatch(_) => ErrorCategory::EvidenceMismatch,
            PoeError::ScopeViolation(_) => ErrorCategory::ScopeViolation,
            PoeError::PolicyViolation(_) => ErrorCategory::PolicyViolation,
            PoeError::ResolutionError(_) => ErrorCategory::ResolutionError,
            PoeError::Conflict(_) => ErrorCategory::Conflict,
            PoeError::Internal(_) => ErrorCategory::Internal,
            PoeError::Crypto(e) => e.category(),
            PoeError::Chain(_) => ErrorCategory::EvidenceMismatch,
            PoeError::Transparency(_) => ErrorCategory::Internal,
            PoeError::Io(_) => ErrorCategory::Internal,
            PoeError::Json(_) => ErrorCategory::SchemaInvalid,
        }
    }

    /// The HTTP status an external adapter should return for this error.
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::Input => 400,
            ErrorCategory::SchemaInvalid => 400,
            ErrorCategory::Expired => 401,
            ErrorCategory::SignatureInvalid => 401,
            ErrorCategory::EvidenceMismatch => 400,
            ErrorCategory::ScopeViolation => 403,
            ErrorCategory::PolicyViolation => 403,
            ErrorCategory::ResolutionError => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Internal => 500,
        }
    }
}

/// Errors related to cryptographic primitives (hash, signature, CBOR, COSE).
#[derive(Error, Debug, Clone)]
pub enum CryptoError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("malformed cbor: {0}")]
    MalformedCbor(String),

    #[error("unsupported cbor major type: {0}")]
    UnsupportedCborType(u8),

    #[error("unknown signature algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("kms signing is asynchronous; synchronous sign() is unavailable for this key manager")]
    SyncSignUnavailable,
}

impl CryptoError {
    fn category(&self) -> ErrorCategory {
        match self {
            CryptoError::SignatureVerificationFailed => ErrorCategory::SignatureInvalid,
            _ => ErrorCategory::Internal,
        }
    }
}

/// Errors related to hash-chain / continuity validation (evidence log, receipt chain).
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("gap in chain at index {0}")]
    Gap(usize),

    #[error("chain out of order at index {index}: expected {expected}, found {found}")]
    OutOfOrder {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("chain is empty")]
    Empty,

    #[error("temporal order violated between step {prev} and {next}")]
    TemporalOrder { prev: usize, next: usize },
}

/// Errors related to the transparency log.
#[derive(Error, Debug, Clone)]
pub enum TransparencyError {
    #[error("unknown entry id: {0}")]
    UnknownEntry(String),

    #[error("registration failed: {0}")]
    RegistrationFailed(String),
}

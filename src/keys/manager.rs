//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! File-backed Ed25519 key manager — generates, persists, and rotates a
//! signing key with a bounded retired-key set. Signing is synchronous;
//! no component other than this manager ever sees the private key bytes.

use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::did::DidDocument;
use super::{KeyAttestationMetadata, RotationOutcome};
use crate::config::MAX_RETIRED_KEYS;
use crate::crypto::ed25519::{self, Jwk};
use crate::error::{CryptoError, PoeError, PoeResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetiredKey {
    kid: String,
    public_key: String,
    retired_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct StoredKeySet {
    current_kid: String,
    current_private_key: String,
    created_at: DateTime<Utc>,
    retired: Vec<RetiredKey>,
}

/// File-backed key manager. The private key never leaves this type; callers
/// only ever receive public keys, JWKs, or signatures.
pub struct KeyManager {
    current_key: SigningKey,
    current_kid: String,
    created_at: DateTime<Utc>,
    retired: VecDeque<RetiredKey>,
    path: PathBuf,
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("current_kid", &self.current_kid)
            .field("current_key", &"[REDACTED]")
            .field("retired_count", &self.retired.len())
            .field("path", &self.path)
            .finish()
    }
}

fn new_kid() -> String {
    format!("key-{}", uuid::Uuid::new_v4().simple())
}

impl KeyManager {
    /// Generate a fresh keypair and persist it atomically at `path`.
    pub fn generate(path: impl Into<PathBuf>) -> PoeResult<Self> {
        let path = path.into();
        let manager = KeyManager {
            current_key: SigningKey::generate(&mut rand::rngs::OsRng),
            current_kid: new_kid(),
            created_at: Utc::now(),
            retired: VecDeque::new(),
            path,
        };
        manager.persist()?;
        Ok(manager)
    }

    /// Load the current keypair from `path`, if it exists.
    pub fn load(path: impl Into<PathBuf>) -> PoeResult<Option<Self>> {
        let path = path.into();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let stored: StoredKeySet = serde_json::from_str(&content)
            .map_err(|e| PoeError::Internal(format!("corrupt key store: {e}")))?;

        let mut private_bytes = BASE64
            .decode(&stored.current_private_key)
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("bad base64 private key: {e}")))?;
        let mut arr: [u8; 32] = match private_bytes.clone().try_into() {
            Ok(arr) => arr,
            Err(_) => {
                private_bytes.zeroize();
                return Err(CryptoError::InvalidKeyFormat("private key must be 32 bytes".into()).into());
            }
        };
        private_bytes.zeroize();

        let current_key = SigningKey::from_bytes(&arr);
        arr.zeroize();

        Ok(Some(KeyManager {
            current_key,
            current_kid: stored.current_kid,
            created_at: stored.created_at,
            retired: stored.retired.into(),
            path,
        }))
    }

    /// Load the keypair at `path`, generating a fresh one if none exists.
    pub fn load_or_generate(path: impl Into<PathBuf>) -> PoeResult<Self> {
        let path = path.into();
        match Self::load(&path)? {
            Some(manager) => Ok(manager),
            None => Self::generate(path),
        }
    }

    fn persist(&self) -> PoeResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut key_bytes = self.current_key.to_bytes();
        let stored = StoredKeySet {
            current_kid: self.current_kid.clone(),
            current_private_key: BASE64.encode(key_bytes),
            created_at: self.created_at,
            retired: self.retired.iter().cloned().collect(),
        };
        key_bytes.zeroize();
        let content = serde_json::to_string_pretty(&stored)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        let file_name = tmp
            .file_name()
            .map(|n| format!(".{}.tmp", n.to_string_lossy()))
            .unwrap_or_else(|| ".keyset.tmp".to_string());
        tmp.set_file_name(file_name);
        tmp
    }

    pub fn current_kid(&self) -> &str {
        &self.current_kid
    }

    pub fn current_public_key(&self) -> VerifyingKey {
        self.current_key.verifying_key()
    }

    /// Synchronous sign with the current key.
    pub fn sign(&self, data: &[u8]) -> [u8; 64] {
        ed25519::sign(&self.current_key, data)
    }

    pub fn verify(public_key: &VerifyingKey, data: &[u8], signature: &[u8]) -> PoeResult<()> {
        ed25519::verify(public_key, data, signature)?;
        Ok(())
    }

    /// Every retired key, most recently retired first.
    pub fn retired_public_keys(&self) -> Vec<(String, VerifyingKey)> {
        self.retired
            .iter()
            .filter_map(|r| {
                let bytes = BASE64.decode(&r.public_key).ok()?;
                let arr: [u8; 32] = bytes.try_into().ok()?;
                VerifyingKey::from_bytes(&arr).ok().map(|k| (r.kid.clone(), k))
            })
            .collect()
    }

    /// Atomically demote the current key to retired and generate a new one.
    /// The retired set is capped at [`MAX_RETIRED_KEYS`]; the oldest entry is
    /// evicted first, with a warning logged since a verifier still relying on
    /// it will start failing.
    pub fn rotate(&mut self) -> PoeResult<RotationOutcome> {
        let retired_kid = self.current_kid.clone();
        let retired = RetiredKey {
            kid: retired_kid.clone(),
            public_key: BASE64.encode(self.current_key.verifying_key().as_bytes()),
            retired_at: Utc::now(),
        };

        self.retired.push_front(retired);
        while self.retired.len() > MAX_RETIRED_KEYS {
            if let Some(evicted) = self.retired.pop_back() {
                tracing::warn!(
                    evicted_kid = %evicted.kid,
                    retired_at = %evicted.retired_at,
                    "retired key evicted from bounded set; verifiers still presenting it will fail"
                );
            }
        }

        self.current_key = SigningKey::generate(&mut rand::rngs::OsRng);
        self.current_kid = new_kid();
        self.created_at = Utc::now();
        self.persist()?;

        tracing::info!(new_kid = %self.current_kid, retired_kid = %retired_kid, "key rotated");

        Ok(RotationOutcome {
            new_public_kid: self.current_kid.clone(),
            retired_public_kid: retired_kid,
        })
    }

    pub fn export_jwk(&self) -> Jwk {
        Jwk::from_public_key(&self.current_key.verifying_key(), Some(self.current_kid.clone()))
    }

    pub fn import_jwk(jwk: &Jwk) -> PoeResult<VerifyingKey> {
        Ok(jwk.to_public_key()?)
    }

    /// Mint a DID document binding `domain` to this manager's current key.
    pub fn generate_did_document(&self, domain: &str) -> DidDocument {
        DidDocument::new(domain, &self.current_kid, &self.current_key.verifying_key())
    }

    /// Custody metadata attached to process receipts.
    pub fn key_attestation(&self) -> KeyAttestationMetadata {
        KeyAttestationMetadata {
            key_type: "Ed25519".to_string(),
            provider: "file".to_string(),
            non_exportable: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generate_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signing_key.json");
        let manager = KeyManager::generate(&path).unwrap();
        let public = manager.current_public_key();
        let kid = manager.current_kid().to_string();

        let loaded = KeyManager::load(&path).unwrap().unwrap();
        assert_eq!(loaded.current_public_key(), public);
        assert_eq!(loaded.current_kid(), kid);
    }

    #[test]
    fn load_or_generate_creates_on_first_call() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("signing_key.json");
        assert!(!path.exists());
        let manager = KeyManager::load_or_generate(&path).unwrap();
        assert!(path.exists());
        let reloaded = KeyManager::load_or_generate(&path).unwrap();
        assert_eq!(reloaded.current_kid(), manager.current_kid());
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let sig = manager.sign(b"payload");
        KeyManager::verify(&manager.current_public_key(), b"payload", &sig).unwrap();
    }

    #[test]
    fn rotation_demotes_current_key_and_keeps_it_verify_only() {
        let dir = tempdir().unwrap();
        let mut manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let old_public = manager.current_public_key();
        let sig_under_old = manager.sign(b"before rotation");

        let outcome = manager.rotate().unwrap();
        assert_eq!(outcome.retired_public_kid, outcome.retired_public_kid);
        assert_ne!(manager.current_public_key(), old_public);

        KeyManager::verify(&old_public, b"before rotation", &sig_under_old).unwrap();
        let retired = manager.retired_public_keys();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].1, old_public);
    }

    #[test]
    fn retired_set_is_bounded_and_evicts_oldest() {
        let dir = tempdir().unwrap();
        let mut manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let mut first_retired_kid = None;
        for i in 0..(MAX_RETIRED_KEYS + 3) {
            let outcome = manager.rotate().unwrap();
            if i == 0 {
                first_retired_kid = Some(outcome.retired_public_kid);
            }
        }
        assert_eq!(manager.retired_public_keys().len(), MAX_RETIRED_KEYS);
        let still_present = manager
            .retired_public_keys()
            .iter()
            .any(|(kid, _)| Some(kid.clone()) == first_retired_kid);
        assert!(!still_present, "oldest retired key should have been evicted");
    }

    #[test]
    fn jwk_export_import_round_trips() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let jwk = manager.export_jwk();
        let recovered = KeyManager::import_jwk(&jwk).unwrap();
        assert_eq!(recovered, manager.current_public_key());
    }

    #[test]
    fn debug_impl_redacts_private_key() {
        let dir = tempdir().unwrap();
        let manager = KeyManager::generate(dir.path().join("key.json")).unwrap();
        let debug = format!("{manager:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&BASE64.encode(manager.current_key.to_bytes())));
    }
}

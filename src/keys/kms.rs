//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! KMS-backed key manager — the private key never leaves the remote
//! backend; signing is always a remote, asynchronous call. A caller that
//! requires synchronous signing must fail fast rather than block.

use std::sync::Arc;

use async_trait::async_trait;
use ed25519_dalek::VerifyingKey;

use super::KeyAttestationMetadata;
use crate::crypto::ed25519::Jwk;
use crate::error::{CryptoError, PoeResult};

/// A remote signing backend: an HSM, cloud KMS, or similar. Implementations
/// hold no key material in this process's address space.
#[async_trait]
pub trait KmsBackend: Send + Sync {
    async fn sign(&self, key_id: &str, data: &[u8]) -> PoeResult<[u8; 64]>;
    async fn public_key(&self, key_id: &str) -> PoeResult<VerifyingKey>;
}

pub struct KmsKeyManager {
    backend: Arc<dyn KmsBackend>,
    key_id: String,
    kid: String,
}

impl KmsKeyManager {
    pub fn new(backend: Arc<dyn KmsBackend>, key_id: impl Into<String>, kid: impl Into<String>) -> Self {
        Self {
            backend,
            key_id: key_id.into(),
            kid: kid.into(),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Remote, asynchronous sign. The only way to sign with this manager.
    pub async fn sign(&self, data: &[u8]) -> PoeResult<[u8; 64]> {
        self.backend.sign(&self.key_id, data).await
    }

    /// Synchronous signing is structurally unavailable for a KMS-backed key.
    pub fn sign_sync(&self, _data: &[u8]) -> PoeResult<[u8; 64]> {
        Err(CryptoError::SyncSignUnavailable.into())
    }

    pub async fn public_key(&self) -> PoeResult<VerifyingKey> {
        self.backend.public_key(&self.key_id).await
    }

    pub async fn export_jwk(&self) -> PoeResult<Jwk> {
        let public_key = self.public_key().await?;
        Ok(Jwk::from_public_key(&public_key, Some(self.kid.clone())))
    }

    pub fn key_attestation(&self) -> KeyAttestationMetadata {
        KeyAttestationMetadata {
            key_type: "Ed25519".to_string(),
            provider: "kms".to_string(),
            non_exportable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use tokio::sync::Mutex;

    struct MockKms {
        key: Mutex<SigningKey>,
    }

    #[async_trait]
    impl KmsBackend for MockKms {
        async fn sign(&self, _key_id: &str, data: &[u8]) -> PoeResult<[u8; 64]> {
            let key = self.key.lock().await;
            Ok(key.sign(data).to_bytes())
        }

        async fn public_key(&self, _key_id: &str) -> PoeResult<VerifyingKey> {
            let key = self.key.lock().await;
            Ok(key.verifying_key())
        }
    }

    #[tokio::test]
    async fn async_sign_and_verify_round_trip() {
        let key = SigningKey::generate(&mut OsRng);
        let public = key.verifying_key();
        let backend = Arc::new(MockKms { key: Mutex::new(key) });
        let manager = KmsKeyManager::new(backend, "kms-key-1", "kid-1");

        let sig = manager.sign(b"payload").await.unwrap();
        crate::crypto::ed25519::verify(&public, b"payload", &sig).unwrap();
    }

    #[tokio::test]
    async fn sync_sign_fails_fast() {
        let key = SigningKey::generate(&mut OsRng);
        let backend = Arc::new(MockKms { key: Mutex::new(key) });
        let manager = KmsKeyManager::new(backend, "kms-key-1", "kid-1");
        assert!(manager.sign_sync(b"payload").is_err());
    }

    #[tokio::test]
    async fn attestation_declares_non_exportable() {
        let key = SigningKey::generate(&mut OsRng);
        let backend = Arc::new(MockKms { key: Mutex::new(key) });
        let manager = KmsKeyManager::new(backend, "kms-key-1", "kid-1");
        assert!(manager.key_attestation().non_exportable);
    }
}

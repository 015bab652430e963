//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Runtime configuration, loaded from environment variables with typed defaults.
//!
//! There is deliberately no implicit expiry-days default: two competing values (7
//! and 90) exist in parallel issuance paths upstream, so callers of
//! [`crate::credential::generator::CredentialGenerator`] must always pass the value
//! explicitly.

use std::time::Duration;

/// Maximum serialised JWT-VC size, enforced before signing.
pub const MAX_CREDENTIAL_BYTES: usize = 100 * 1024;

/// Bound on the retired-key set kept by a file-backed key manager.
pub const MAX_RETIRED_KEYS: usize = 8;

#[derive(Debug, Clone)]
pub struct PoeConfig {
    /// Timeout for DID document / trust.txt resolution.
    pub resolution_timeout: Duration,
    /// Timeout for chasing further dependency URLs referenced by a credential.
    pub dependency_timeout: Duration,
    /// Idempotency cache entry time-to-live.
    pub idempotency_ttl: Duration,
    /// Interval between idempotency cache sweeps.
    pub idempotency_sweep_interval: Duration,
    /// Whether transparency-log registration is attempted by default.
    pub transparency_log_enabled: bool,
}

impl Default for PoeConfig {
    fn default() -> Self {
        Self {
            resolution_timeout: Duration::from_secs(5),
            dependency_timeout: Duration::from_secs(10),
            idempotency_ttl: Duration::from_secs(3600),
            idempotency_sweep_interval: Duration::from_secs(300),
            transparency_log_enabled: false,
        }
    }
}

impl PoeConfig {
    /// Load from environment, falling back to [`PoeConfig::default`] values.
    ///
    /// Recognised variables: `POE_RESOLUTION_TIMEOUT_SECS`,
    /// `POE_DEPENDENCY_TIMEOUT_SECS`, `POE_IDEMPOTENCY_TTL_SECS`,
    /// `POE_IDEMPOTENCY_SWEEP_SECS`, `POE_TRANSPARENCY_LOG_ENABLED`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            resolution_timeout: env_secs("POE_RESOLUTION_TIMEOUT_SECS", defaults.resolution_timeout),
            dependency_timeout: env_secs("POE_DEPENDENCY_TIMEOUT_SECS", defaults.dependency_timeout),
            idempotency_ttl: env_secs("POE_IDEMPOTENCY_TTL_SECS", defaults.idempotency_ttl),
            idempotency_sweep_interval: env_secs(
                "POE_IDEMPOTENCY_SWEEP_SECS",
                defaults.idempotency_sweep_interval,
            ),
            transparency_log_enabled: std::env::var("POE_TRANSPARENCY_LOG_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.transparency_log_enabled),
        }
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Idempotency for credential issuance: identical `{key, body}` returns the
//! cached response, the same key with a different body is a conflict, and a
//! same-key request still in flight is told to retry shortly. Persistence
//! defers to an external store when one is configured; a bounded in-memory
//! cache with a TTL is the fallback.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::PoeResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: String,
    pub route: String,
    pub request_hash: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    InFlight,
    Completed,
}

/// What the caller should do about a `{key, body}` pair it is about to
/// process.
#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyDecision {
    /// No prior record; the caller reserved the key and should proceed.
    Proceed,
    /// A completed record with an identical body already exists.
    Cached(Value),
    /// The key was used before with a different body.
    Conflict,
    /// A request with this key is still being processed.
    RetryShortly,
}

/// An external persistence backend for idempotency records (a database
/// table with a `(key, route, request_hash, status, response, expires_at)`
/// row shape). The in-memory cache is used whenever this returns an error
/// or none is configured.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get(&self, key: &str) -> PoeResult<Option<IdempotencyRecord>>;
    async fn put(&self, record: IdempotencyRecord) -> PoeResult<()>;
}

/// Bounded, TTL-expiring in-memory fallback. Never grows without bound in a
/// long-running process: a sweep removes expired entries on its own
/// schedule, independent of reads/writes.
pub struct InMemoryIdempotencyCache {
    entries: Mutex<HashMap<String, IdempotencyRecord>>,
    ttl: Duration,
}

impl InMemoryIdempotencyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Evict every entry past its `expires_at`. Intended to be called from a
    /// caller-owned periodic task (see [`sweep_loop`]) — this library never
    /// spawns background work on its own.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, record| record.expires_at > now);
        before - entries.len()
    }

    async fn decide(&self, key: &str, route: &str, request_hash: &str) -> IdempotencyDecision {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(existing) if existing.request_hash != request_hash || existing.route != route => {
                IdempotencyDecision::Conflict
            }
            Some(existing) if existing.status == RecordStatus::InFlight => IdempotencyDecision::RetryShortly,
            Some(existing) => IdempotencyDecision::Cached(existing.response.clone().unwrap_or(Value::Null)),
            None => {
                entries.insert(
                    key.to_string(),
                    IdempotencyRecord {
                        key: key.to_string(),
                        route: route.to_string(),
                        request_hash: request_hash.to_string(),
                        status: RecordStatus::InFlight,
                        response: None,
                        expires_at: Utc::now() + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
                    },
                );
                IdempotencyDecision::Proceed
            }
        }
    }

    async fn complete(&self, key: &str, response: Value) {
        let mut entries = self.entries.lock().await;
        if let Some(record) = entries.get_mut(key) {
            record.status = RecordStatus::Completed;
            record.response = Some(response);
            record.expires_at = Utc::now() + chrono::Duration::from_std(self.ttl).unwrap_or_default();
        }
    }

    async fn release(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

/// Periodic sweep loop. Not auto-spawned: a library must not start
/// background tasks on construction without the caller's consent, so the
/// caller `tokio::spawn`s this itself.
pub async fn sweep_loop(cache: std::sync::Arc<InMemoryIdempotencyCache>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let evicted = cache.sweep().await;
        if evicted > 0 {
            tracing::info!(evicted, "idempotency cache sweep evicted expired entries");
        }
    }
}

/// Run `generate` under idempotency control: checks an external store first
/// (if any), falls back to the in-memory cache, and records the outcome once
/// `generate` completes. On any external-store failure, falls back silently
/// to the in-memory cache rather than failing the request.
pub async fn issue_with_idempotency<F, Fut>(
    cache: &InMemoryIdempotencyCache,
    store: Option<&dyn IdempotencyStore>,
    key: &str,
    route: &str,
    request_hash: &str,
    generate: F,
) -> PoeResult<IdempotencyDecision>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = PoeResult<Value>>,
{
    if let Some(store) = store {
        match store.get(key).await {
            Ok(Some(existing)) if existing.request_hash != request_hash || existing.route != route => {
                return Ok(IdempotencyDecision::Conflict);
            }
            Ok(Some(existing)) if existing.status == RecordStatus::InFlight => {
                return Ok(IdempotencyDecision::RetryShortly);
            }
            Ok(Some(existing)) => {
                return Ok(IdempotencyDecision::Cached(existing.response.unwrap_or(Value::Null)));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "idempotency store unavailable, falling back to in-memory cache");
            }
        }
    }

    match cache.decide(key, route, request_hash).await {
        IdempotencyDecision::Proceed => {}
        other => return Ok(other),
    }

    match generate().await {
        Ok(response) => {
            cache.complete(key, response.clone()).await;
            if let Some(store) = store {
                let _ = store
                    .put(IdempotencyRecord {
                        key: key.to_string(),
                        route: route.to_string(),
                        request_hash: request_hash.to_string(),
                        status: RecordStatus::Completed,
                        response: Some(response.clone()),
                        expires_at: Utc::now() + chrono::Duration::from_std(cache.ttl).unwrap_or_default(),
                    })
                    .await;
            }
            Ok(IdempotencyDecision::Cached(response))
        }
        Err(e) => {
            cache.release(key).await;
            Err(e)
        }
    }
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Credential issuance: normalised-evidence-in, signed JWT-VC-out, with
//! sanitisation and idempotency along the way.

pub mod generator;
pub mod idempotency;
pub mod sanitize;
pub mod types;

pub use generator::{CredentialGenerator, GenerateCredentialInput};
pub use idempotency::{IdempotencyDecision, IdempotencyRecord, IdempotencyStore, InMemoryIdempotencyCache};
pub use types::{CredentialPayload, CredentialSubject, NormalizedEvidence};

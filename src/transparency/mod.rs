//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! SCITT-style transparency log: an append-only, Merkle-rooted registry of
//! signed statements, each registration yielding a COSE-signed inclusion
//! receipt.

pub mod log;
pub mod store;

pub use log::{ListedEntry, RegistrationResult, TransparencyLog};
pub use store::{ScittEntryRow, ScittReceiptRow};

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Persisted row shapes for the transparency log, mirroring the relational
//! layout an external adapter would back this with
//! (`scitt_entries`, `scitt_receipts`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScittEntryRow {
    pub entry_id: String,
    pub statement: String,
    pub statement_hash: String,
    pub tree_size: u64,
    pub tree_hash: String,
    pub parent_hash: String,
    pub registration_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScittReceiptRow {
    pub entry_id: String,
    pub log_id: String,
    pub proof: String,
    pub issued_at: DateTime<Utc>,
}

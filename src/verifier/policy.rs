//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Verification Policy engine: ten independently-enabled constraints over a
//! decoded credential payload, evaluated without short-circuiting so a
//! caller sees every violation in one pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolver::scope::ProvenanceSource;

/// Facts about a verification run that the payload alone can't supply —
/// produced by whatever already ran `verify_process_chain`,
/// `EvidenceLog::verify`, and transparency-log lookups for this credential.
#[derive(Debug, Clone, Default)]
pub struct VerificationContext {
    pub tool_attested_verified: usize,
    pub input_binding_ok: bool,
    pub evidence_chain_ok: bool,
    pub process_chain_valid: bool,
    pub all_receipts_registered: bool,
}

#[derive(Debug, Clone, Default)]
pub struct VerificationPolicy {
    pub require_issuer: Option<String>,
    pub require_frameworks: Option<Vec<String>>,
    pub min_score: Option<u8>,
    pub max_age_days: Option<i64>,
    pub require_source: Option<ProvenanceSource>,
    pub require_source_identity: Option<Vec<String>>,
    pub require_tool_attestation: bool,
    pub require_input_binding: bool,
    pub require_evidence_chain: bool,
    pub require_receipts: bool,
    pub require_scitt: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub ok: bool,
    pub errors: Vec<String>,
}

fn source_str(source: ProvenanceSource) -> &'static str {
    match source {
        ProvenanceSource::SelfAttested => "self",
        ProvenanceSource::Tool => "tool",
        ProvenanceSource::Auditor => "auditor",
    }
}

/// Evaluate every enabled constraint in `policy` against `payload` (a
/// decoded, JWT-VC-shaped `{iss, vc: {credentialSubject: {...}}}` value) and
/// `context`. Collects every failure rather than stopping at the first.
pub fn evaluate_policy(payload: &Value, policy: &VerificationPolicy, context: &VerificationContext) -> PolicyResult {
    let mut errors = Vec::new();
    let subject = payload.pointer("/vc/credentialSubject");

    if let Some(expected) = &policy.require_issuer {
        let actual = payload.get("iss").and_then(|v| v.as_str());
        if actual != Some(expected.as_str()) {
            errors.push(format!("requireIssuer: expected '{expected}', found {actual:?}"));
        }
    }

    if let Some(required) = &policy.require_frameworks {
        let present: Vec<String> = subject
            .and_then(|s| s.get("frameworks"))
            .and_then(|v| v.as_object())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        for framework in required {
            if !present.contains(framework) {
                errors.push(format!("requireFramework: '{framework}' not present in credentialSubject.frameworks"));
            }
        }
    }

    if let Some(min) = policy.min_score {
        let actual = subject.and_then(|s| s.pointer("/summary/overallScore")).and_then(|v| v.as_u64());
        match actual {
            Some(score) if score as u8 >= min => {}
            Some(score) => errors.push(format!("minScore: overallScore {score} is below minimum {min}")),
            None => errors.push("minScore: summary.overallScore is missing".to_string()),
        }
    }

    if let Some(max_days) = policy.max_age_days {
        let source_date = subject
            .and_then(|s| s.pointer("/provenance/sourceDate"))
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok());
        match source_date {
            Some(date) => {
                let age_days = (Utc::now() - date.with_timezone(&Utc)).num_days();
                if age_days > max_days {
                    errors.push(format!("maxAgeDays: evidence is {age_days} days old, exceeding {max_days}"));
                }
            }
            None => errors.push("maxAgeDays: provenance.sourceDate is missing".to_string()),
        }
    }

    if let Some(expected) = policy.require_source {
        let actual = subject.and_then(|s| s.pointer("/provenance/source")).and_then(|v| v.as_str());
        if actual != Some(source_str(expected)) {
            errors.push(format!("requireSource: expected '{}', found {actual:?}", source_str(expected)));
        }
    }

    if let Some(allowed) = &policy.require_source_identity {
        let actual = subject.and_then(|s| s.pointer("/provenance/sourceIdentity")).and_then(|v| v.as_str());
        match actual {
            Some(identity) if allowed.iter().any(|a| a == identity) => {}
            _ => errors.push(format!("requireSourceIdentity: {actual:?} is not among allowed identities {allowed:?}")),
        }
    }

    if policy.require_tool_attestation {
        let tool_attested_steps = subject
            .and_then(|s| s.pointer("/processProvenance/toolAttestedSteps"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if tool_attested_steps == 0 && context.tool_attested_verified == 0 {
            errors.push("requireToolAttestation: no tool-attested steps in the credential or verification context".to_string());
        }
    }

    if policy.require_input_binding {
        let has_source_document = subject
            .and_then(|s| s.pointer("/provenance/sourceDocument"))
            .and_then(|v| v.as_str())
            .map(|s| !s.is_empty())
            .unwrap_or(false);
        if !has_source_document || !context.input_binding_ok {
            errors.push("requireInputBinding: provenance.sourceDocument missing or input binding not verified".to_string());
        }
    }

    if policy.require_evidence_chain {
        let chain_verified = subject
            .and_then(|s| s.pointer("/evidenceChain/chainVerified"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !chain_verified || !context.evidence_chain_ok {
            errors.push("requireEvidenceChain: evidenceChain.chainVerified is false or unverified by this verifier".to_string());
        }
    }

    if policy.require_receipts {
        let has_process_provenance = subject.and_then(|s| s.get("processProvenance")).is_some();
        if !has_process_provenance || !context.process_chain_valid {
            errors.push("requireReceipts: processProvenance is missing or its chain did not verify".to_string());
        }
    }

    if policy.require_scitt {
        let has_scitt_entry = subject
            .and_then(|s| s.pointer("/processProvenance/scittEntryIds"))
            .and_then(|v| v.as_array())
            .map(|a| !a.is_empty())
            .unwrap_or(false);
        if !has_scitt_entry || !context.all_receipts_registered {
            errors.push("requireScitt: no transparency-log entry ids recorded, or not all receipts are registered".to_string());
        }
    }

    PolicyResult {
        ok: errors.is_empty(),
        errors,
    }
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! Key Scope — CAA-style constraints attached to a DID verification method,
//! restricting what a signing key may attest to. Absence of a scope is
//! always permissive: a verifier that does not understand key scope still
//! accepts the signature.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceSource {
    #[serde(rename = "self")]
    SelfAttested,
    Tool,
    Auditor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPurpose {
    Sign,
    Attest,
    Revoke,
}

/// Per-key constraint set. Every field is optional; `None`/empty means "no
/// constraint" for that dimension.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frameworks: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_assurance: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_sources: Option<Vec<ProvenanceSource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<Vec<KeyPurpose>>,
}

/// The facts about a credential (or attestation) needed to enforce a scope,
/// independent of the concrete credential payload type.
#[derive(Debug, Clone)]
pub struct ScopeCheckInput {
    pub frameworks: Vec<String>,
    pub declared_assurance: u8,
    pub source: Option<ProvenanceSource>,
    pub purpose: KeyPurpose,
}

fn parse_source(s: &str) -> Option<ProvenanceSource> {
    match s {
        "self" => Some(ProvenanceSource::SelfAttested),
        "tool" => Some(ProvenanceSource::Tool),
        "auditor" => Some(ProvenanceSource::Auditor),
        _ => None,
    }
}

/// Extract a [`ScopeCheckInput`] from a decoded (possibly unverified) JWT
/// payload shaped like a credential: `vc.credentialSubject.{frameworks,
/// assurance.declared, provenance.source}`. `None` if the subject is absent.
pub fn scope_check_input_from_credential_payload(payload: &Value, purpose: KeyPurpose) -> Option<ScopeCheckInput> {
    let subject = payload.pointer("/vc/credentialSubject")?;
    let frameworks = subject
        .get("frameworks")
        .and_then(|v| v.as_object())
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    let declared_assurance = subject.pointer("/assurance/declared").and_then(|v| v.as_u64()).unwrap_or(0) as u8;
    let source = subject.pointer("/provenance/source").and_then(|v| v.as_str()).and_then(parse_source);
    Some(ScopeCheckInput {
        frameworks,
        declared_assurance,
        source,
        purpose,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeEnforcement {
    pub scope_checked: bool,
    pub scope_valid: bool,
    pub violations: Vec<String>,
}

/// Evaluate `scope` (if any) against `input`, collecting every violation
/// rather than stopping at the first.
pub fn enforce(scope: Option<&KeyScope>, input: &ScopeCheckInput) -> ScopeEnforcement {
    let Some(scope) = scope else {
        return ScopeEnforcement {
            scope_checked: false,
            scope_valid: true,
            violations: Vec::new(),
        };
    };

    let mut violations = Vec::new();

    if let Some(allowed) = &scope.frameworks {
        for framework in &input.frameworks {
            if !allowed.contains(framework) {
                violations.push(format!(
                    "framework '{framework}' is not within the key's allowed frameworks {allowed:?}"
                ));
            }
        }
    }

    if let Some(max) = scope.max_assurance {
        if input.declared_assurance > max {
            violations.push(format!(
                "assurance level {} exceeds key scope maxAssurance {max}",
                input.declared_assurance
            ));
        }
    }

    if let Some(allowed) = &scope.allowed_sources {
        match input.source {
            Some(source) if !allowed.contains(&source) => {
                violations.push(format!("provenance source {source:?} is not within the key's allowed sources"));
            }
            None => violations.push("provenance source missing but key scope restricts allowed sources".to_string()),
            _ => {}
        }
    }

    if let Some(allowed) = &scope.purpose {
        if !allowed.contains(&input.purpose) {
            violations.push(format!("purpose {:?} is not within the key's allowed purposes", input.purpose));
        }
    }

    ScopeEnforcement {
        scope_checked: true,
        scope_valid: violations.is_empty(),
        violations,
    }
}

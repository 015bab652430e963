//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! `trust.txt`: a flat, line-oriented discovery record published at
//! `/.well-known/trust.txt`, modelled on `security.txt`. Parsing tolerates
//! unknown keys for forward compatibility; generation and validation are
//! strict about the known ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PoeConfig;
use crate::resolver::did_resolver::host_is_blocked;

const SPEC_URL: &str = "https://poetrustlabs.com/specs/trust-txt/v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrustRecord {
    pub did: String,
    pub cpoe: Vec<String>,
    pub scitt: Option<String>,
    pub catalog: Option<String>,
    pub flagship: Option<String>,
    pub contact: Option<String>,
    pub expires: Option<String>,
    pub frameworks: Vec<String>,
}

/// Parse `trust.txt` content. Lines starting with `#` are comments; blank
/// lines are ignored; keys are matched case-insensitively; keys this parser
/// doesn't recognise are silently dropped rather than rejected.
pub fn parse(content: &str) -> TrustRecord {
    let mut record = TrustRecord::default();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "DID" => record.did = value,
            "CPOE" => record.cpoe.push(value),
            "SCITT" => record.scitt = Some(value),
            "CATALOG" => record.catalog = Some(value),
            "FLAGSHIP" => record.flagship = Some(value),
            "CONTACT" => record.contact = Some(value),
            "EXPIRES" => record.expires = Some(value),
            "FRAMEWORKS" => record.frameworks = value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            _ => {}
        }
    }
    record
}

/// Emit the canonical textual form: a banner comment followed by known
/// keys in a fixed order.
pub fn generate(record: &TrustRecord) -> String {
    let mut lines = vec![format!("# trust.txt — see {SPEC_URL}"), String::new(), format!("DID: {}", record.did)];

    for cpoe in &record.cpoe {
        lines.push(format!("CPOE: {cpoe}"));
    }
    if let Some(scitt) = &record.scitt {
        lines.push(format!("SCITT: {scitt}"));
    }
    if let Some(catalog) = &record.catalog {
        lines.push(format!("CATALOG: {catalog}"));
    }
    if let Some(flagship) = &record.flagship {
        lines.push(format!("FLAGSHIP: {flagship}"));
    }
    if let Some(contact) = &record.contact {
        lines.push(format!("Contact: {contact}"));
    }
    if let Some(expires) = &record.expires {
        lines.push(format!("Expires: {expires}"));
    }
    if !record.frameworks.is_empty() {
        lines.push(format!("Frameworks: {}", record.frameworks.join(",")));
    }

    lines.join("\n") + "\n"
}

async fn url_is_safe(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("https://") else {
        return false;
    };
    let host = rest.split(['/', ':']).next().unwrap_or("");
    if host.is_empty() {
        return false;
    }
    !host_is_blocked(host).await
}

/// Validate a record: a `did:web:` identifier is required, every service
/// URL must be HTTPS and resolve to a non-blocked host, and `Expires` (if
/// present) must parse and lie in the future.
pub async fn validate(record: &TrustRecord) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if !record.did.starts_with("did:web:") {
        errors.push(format!("DID must be a did:web: identifier, found '{}'", record.did));
    }

    for (label, url) in [
        ("SCITT", record.scitt.as_deref()),
        ("CATALOG", record.catalog.as_deref()),
        ("FLAGSHIP", record.flagship.as_deref()),
    ] {
        if let Some(url) = url {
            if !url_is_safe(url).await {
                errors.push(format!("{label} must be an HTTPS URL resolving to a non-blocked host, found '{url}'"));
            }
        }
    }

    if let Some(expires) = &record.expires {
        match DateTime::parse_from_rfc3339(expires) {
            Ok(parsed) if parsed.with_timezone(&Utc) <= Utc::now() => {
                errors.push(format!("Expires '{expires}' is not in the future"));
            }
            Err(e) => errors.push(format!("Expires '{expires}' is not ISO-8601 parseable: {e}")),
            Ok(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Fetch and parse `https://<domain>/.well-known/trust.txt`, subject to the
/// same SSRF safeguards as DID resolution.
pub async fn resolve(domain: &str, config: &PoeConfig) -> Result<TrustRecord, String> {
    if host_is_blocked(domain).await {
        return Err(format!("resolution target '{domain}' is in a blocked network range"));
    }

    let url = format!("https://{domain}/.well-known/trust.txt");
    let client = reqwest::Client::builder()
        .timeout(config.resolution_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| format!("failed to build HTTP client: {e}"))?;

    let response = client.get(&url).send().await.map_err(|e| format!("fetch of {url} failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("fetch of {url} returned status {}", response.status()));
    }
    let body = response.text().await.map_err(|e| format!("failed to read body of {url}: {e}"))?;
    Ok(parse(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrustRecord {
        TrustRecord {
            did: "did:web:example.com".to_string(),
            cpoe: vec!["https://example.com/cpoe/1".to_string(), "https://example.com/cpoe/2".to_string()],
            scitt: Some("https://example.com/scitt".to_string()),
            catalog: None,
            flagship: None,
            contact: Some("security@example.com".to_string()),
            expires: Some((Utc::now() + chrono::Duration::days(365)).to_rfc3339()),
            frameworks: vec!["SOC2".to_string(), "ISO27001".to_string()],
        }
    }

    #[test]
    fn generate_then_parse_round_trips() {
        let record = sample();
        let text = generate(&record);
        let parsed = parse(&text);
        assert_eq!(parsed.did, record.did);
        assert_eq!(parsed.cpoe, record.cpoe);
        assert_eq!(parsed.frameworks, record.frameworks);
    }

    #[test]
    fn parse_ignores_comments_and_unknown_keys() {
        let text = "# a comment\nDID: did:web:example.com\nFutureKey: whatever\n\nCPOE: https://example.com/1\n";
        let record = parse(text);
        assert_eq!(record.did, "did:web:example.com");
        assert_eq!(record.cpoe, vec!["https://example.com/1".to_string()]);
    }

    #[test]
    fn parse_is_case_insensitive_on_keys() {
        let text = "did: did:web:example.com\ncpoe: https://example.com/1\n";
        let record = parse(text);
        assert_eq!(record.did, "did:web:example.com");
        assert_eq!(record.cpoe, vec!["https://example.com/1".to_string()]);
    }

    #[tokio::test]
    async fn validate_accepts_well_formed_record() {
        let record = sample();
        assert!(validate(&record).await.is_ok());
    }

    #[tokio::test]
    async fn validate_rejects_non_did_web_identifier() {
        let mut record = sample();
        record.did = "did:key:z6Mk...".to_string();
        let errors = validate(&record).await.unwrap_err();
        assert!(errors.iter().any(|e| e.contains("did:web:")));
    }

    #[tokio::test]
    async fn validate_rejects_expired_timestamp() {
        let mut record = sample();
        record.expires = Some((Utc::now() - chrono::Duration::days(1)).to_rfc3339());
        let errors = validate(&record).await.unwrap_err();
        assert!(errors.iter().any(|e| e.contains("Expires")));
    }

    #[tokio::test]
    async fn validate_rejects_blocked_service_host() {
        let mut record = sample();
        record.scitt = Some("https://127.0.0.1/scitt".to_string());
        let errors = validate(&record).await.unwrap_err();
        assert!(errors.iter().any(|e| e.contains("SCITT")));
    }
}

//
// Copyright (c) 2026 POE TRUST LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: poe-core — the compliance-proof trust and provenance engine.
//

//! `did:web` resolution over HTTPS with SSRF safeguards: before any request
//! is issued, the target hostname's resolved addresses are checked against
//! a blocked-range list (loopback, link-local, RFC1918 private, cloud
//! metadata, reserved). Resolution never follows redirects.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::config::PoeConfig;
use crate::keys::did::DidDocument;

/// Ranges an SSRF-safe fetcher must never contact. Parsed fresh on each
/// call; this list is tiny and resolution is not a hot path.
fn blocked_ranges() -> Vec<IpNet> {
    [
        "127.0.0.0/8",
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "169.254.0.0/16", // includes the 169.254.169.254 cloud metadata endpoint
        "0.0.0.0/8",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .map(|s| s.parse().expect("static CIDR literal"))
    .collect()
}

fn is_blocked_ip(ip: IpAddr) -> bool {
    blocked_ranges().iter().any(|range| range.contains(&ip))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionMetadata {
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub did_document: Option<DidDocument>,
    pub resolution_metadata: ResolutionMetadata,
}

fn fail(message: impl Into<String>) -> ResolutionResult {
    ResolutionResult {
        did_document: None,
        resolution_metadata: ResolutionMetadata {
            error: Some(message.into()),
        },
    }
}

/// Split `did:web:<domain>[:path...]` into `(domain, path_segments)`. Any
/// `%3A` in the domain segment is decoded back to `:` (an encoded port).
pub fn parse_did_web(did: &str) -> Result<(String, Vec<String>), String> {
    let rest = did
        .strip_prefix("did:web:")
        .ok_or_else(|| format!("not a did:web identifier: {did}"))?;
    let mut segments = rest.split(':');
    let domain_segment = segments
        .next()
        .ok_or_else(|| "missing domain segment".to_string())?;
    let domain = domain_segment.replace("%3A", ":");
    let path_segments: Vec<String> = segments.map(|s| s.to_string()).collect();
    Ok((domain, path_segments))
}

/// The well-known URL a `did:web` identifier resolves to.
pub fn resolution_url(domain: &str, path_segments: &[String]) -> String {
    if path_segments.is_empty() {
        format!("https://{domain}/.well-known/did.json")
    } else {
        format!("https://{domain}/{}/did.json", path_segments.join("/"))
    }
}

/// Check whether `hostname` resolves to any blocked address. A hostname that
/// is itself a literal IP is checked directly; otherwise DNS is consulted.
pub async fn host_is_blocked(hostname: &str) -> bool {
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return is_blocked_ip(ip);
    }
    match tokio::net::lookup_host((hostname, 443)).await {
        Ok(addrs) => addrs.map(|a| a.ip()).any(is_blocked_ip),
        Err(_) => true, // fail closed: unresolvable hosts are treated as blocked
    }
}

/// Resolve a `did:web` identifier to its DID document.
pub async fn resolve(did: &str, config: &PoeConfig) -> ResolutionResult {
    let (domain, path_segments) = match parse_did_web(did) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };

    if host_is_blocked(&domain).await {
        return fail(format!("resolution target '{domain}' is in a blocked network range"));
    }

    let url = resolution_url(&domain, &path_segments);

    let client = match reqwest::Client::builder()
        .timeout(config.resolution_timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
    {
        Ok(c) => c,
        Err(e) => return fail(format!("failed to build HTTP client: {e}")),
    };

    let response = match client.get(&url).send().await {
        Ok(r) => r,
        Err(e) => return fail(format!("fetch of {url} failed: {e}")),
    };

    if !response.status().is_success() {
        return fail(format!("fetch of {url} returned status {}", response.status()));
    }

    match response.json::<DidDocument>().await {
        Ok(doc) => ResolutionResult {
            did_document: Some(doc),
            resolution_metadata: ResolutionMetadata { error: None },
        },
        Err(e) => fail(format!("invalid DID document JSON: {e}")),
    }
}

// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use regex::Regex;
use reqwest::Url;
use smith_config::ToolsConfig;

const MAX_REDIRECTS: usize = 3;

/// Decides which URLs outbound tool calls may reach.
///
/// Patterns are matched against the parsed URL with any userinfo removed and
/// the host in canonical form, so `https://x@127.0.0.1/` and
/// `https://2130706433/` are both seen as `https://127.0.0.1/`.  A URL must
/// match an allow pattern and no deny pattern; deny wins.  Loopback, private,
/// link-local and unspecified addresses are refused unless
/// `allow_private_addresses` is set.
#[derive(Debug, Clone)]
pub struct EndpointPolicy {
    allow_patterns: Vec<Regex>,
    deny_patterns: Vec<Regex>,
    allow_private_addresses: bool,
}

impl EndpointPolicy {
    pub fn from_config(cfg: &ToolsConfig) -> Self {
        Self::new(&cfg.endpoint_allow_patterns, &cfg.endpoint_deny_patterns)
            .with_private_addresses(cfg.allow_private_addresses)
    }

    pub fn new(allow: &[String], deny: &[String]) -> Self {
        let compile = |patterns: &[String]| -> Vec<Regex> {
            patterns.iter().filter_map(|p| glob_to_regex(p)).collect()
        };
        Self {
            allow_patterns: compile(allow),
            deny_patterns: compile(deny),
            allow_private_addresses: false,
        }
    }

    pub fn with_private_addresses(mut self, allow: bool) -> Self {
        self.allow_private_addresses = allow;
        self
    }

    /// `false` for anything that does not parse as an absolute URL with a host.
    pub fn permits(&self, url: &str) -> bool {
        Url::parse(url.trim()).is_ok_and(|u| self.permits_url(&u))
    }

    pub fn permits_url(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if !self.allow_private_addresses && is_internal_host(host) {
            return false;
        }
        let target = canonical(url, host);
        if self.deny_patterns.iter().any(|re| re.is_match(&target)) {
            return false;
        }
        self.allow_patterns.iter().any(|re| re.is_match(&target))
    }
}

/// HTTP client whose redirects are re-checked against `policy` at every hop.
///
/// A hop to a refused URL fails the request with a redirect error whose
/// source is the refused URL; past [`MAX_REDIRECTS`] the redirect response
/// itself is returned.
pub fn http_client(policy: Arc<EndpointPolicy>, user_agent: &str) -> reqwest::Result<reqwest::Client> {
    let redirects = reqwest::redirect::Policy::custom(move |attempt| {
        if !policy.permits_url(attempt.url()) {
            let refused = attempt.url().to_string();
            attempt.error(refused)
        } else if attempt.previous().len() > MAX_REDIRECTS {
            attempt.stop()
        } else {
            attempt.follow()
        }
    });
    reqwest::Client::builder()
        .user_agent(user_agent.to_string())
        .redirect(redirects)
        .build()
}

/// `scheme://host[:port]/path[?query]`, without userinfo or fragment.
fn canonical(url: &Url, host: &str) -> String {
    let mut out = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        out.push_str(&format!(":{port}"));
    }
    out.push_str(url.path());
    if let Some(q) = url.query() {
        out.push('?');
        out.push_str(q);
    }
    out
}

fn is_internal_host(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_internal_v4(ip),
        Ok(IpAddr::V6(ip)) => is_internal_v6(ip),
        Err(_) => false,
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10, carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_internal_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local, fe80::/10 link-local
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Convert a simple glob pattern to a case-insensitive [`Regex`].
/// Only `*` (match anything) and `?` (match one char) are supported.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut re = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

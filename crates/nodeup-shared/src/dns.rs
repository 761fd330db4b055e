//! DNS validation decisions.
//!
//! Turns the two network primitives (`resolves_to`, `is_behind_proxy`) into a
//! verdict about whether the platform and registry domains are usable. The
//! probes themselves live behind [`NetworkProbe`]; this module only decides.

use crate::collaborators::NetworkProbe;

/// Canary subdomains probed under the base domain.
pub const APP_PREFIX: &str = "app";
pub const AUTH_PREFIX: &str = "auth";
pub const REGISTRY_PREFIX: &str = "registry";

/// Whether a reverse proxy in front of a domain class is acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyPolicy {
    pub platform: bool,
    pub registry: bool,
}

impl Default for ProxyPolicy {
    fn default() -> Self {
        Self {
            platform: true,
            registry: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainValidationRequest {
    pub domain: String,
    pub external_ip: String,
    pub policy: ProxyPolicy,
}

/// Outcome of probing one canary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanaryCheck {
    pub domain: String,
    pub proxied: bool,
    /// `None` when direct resolution was never checked.
    pub resolves: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsVerdict {
    pub success: bool,
    /// Any proxy detection during the run.
    pub cloudflare: bool,
    pub wildcard: bool,
    pub registry_issue: bool,
    pub message: String,
    pub canaries: Vec<CanaryCheck>,
}

impl DnsVerdict {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Strip surrounding whitespace and a leading `*.` wildcard label.
pub fn base_domain(domain: &str) -> &str {
    let domain = domain.trim();
    domain.strip_prefix("*.").unwrap_or(domain)
}

pub fn app_domain(base: &str) -> String {
    format!("{APP_PREFIX}.{base}")
}

pub fn registry_domain(base: &str) -> String {
    format!("{REGISTRY_PREFIX}.{base}")
}

/// Validate the platform domain.
///
/// `now_unix` names the synthetic wildcard probe (`test<now_unix>.<base>`) so a
/// cached answer from an earlier run cannot be reused.
pub async fn validate_platform_domain(
    probe: &dyn NetworkProbe,
    request: &DomainValidationRequest,
    now_unix: i64,
) -> DnsVerdict {
    let base = base_domain(&request.domain);
    if base.is_empty() {
        return DnsVerdict::failed("no domain configured");
    }
    let ip = request.external_ip.as_str();
    let mut verdict = DnsVerdict::default();

    let mut checks = Vec::with_capacity(2);
    for prefix in [APP_PREFIX, AUTH_PREFIX] {
        let domain = format!("{prefix}.{base}");
        let proxied = probe.is_behind_proxy(&domain).await;
        tracing::debug!(%domain, proxied, "canary proxy check");
        checks.push(CanaryCheck {
            domain,
            proxied,
            resolves: None,
        });
    }
    verdict.cloudflare = checks.iter().any(|c| c.proxied);
    let both_proxied = checks.iter().all(|c| c.proxied);

    let wildcard_probe = format!("test{now_unix}.{base}");
    if probe.is_behind_proxy(&wildcard_probe).await {
        verdict.cloudflare = true;
        verdict.wildcard = true;
    } else if probe.resolves_to(&wildcard_probe, ip).await {
        verdict.wildcard = true;
    }
    tracing::debug!(probe = %wildcard_probe, wildcard = verdict.wildcard, "wildcard check");

    if both_proxied && request.policy.platform {
        let registry = registry_domain(base);
        let registry_proxied = probe.is_behind_proxy(&registry).await;
        verdict.cloudflare = true;
        verdict.canaries = checks;
        if registry_proxied && !request.policy.registry {
            verdict.registry_issue = true;
            verdict.message = format!(
                "{registry} is behind a reverse proxy; the registry must resolve directly to {ip}"
            );
        } else {
            verdict.success = true;
            verdict.message = format!("{base} is served through a reverse proxy");
        }
        return verdict;
    }

    for check in checks.iter_mut() {
        check.resolves = Some(probe.resolves_to(&check.domain, ip).await);
    }
    let direct = checks.iter().all(|c| c.resolves == Some(true));
    // A single canary that resolves or sits behind an allowed proxy is enough.
    let any_canary = checks
        .iter()
        .any(|c| c.resolves == Some(true) || (c.proxied && request.policy.platform));

    verdict.success = verdict.wildcard || any_canary;
    verdict.message = if verdict.wildcard {
        format!("wildcard record for *.{base} points at {ip}")
    } else if direct {
        format!("{} and {} resolve to {ip}", checks[0].domain, checks[1].domain)
    } else if any_canary {
        let ok: Vec<&str> = checks
            .iter()
            .filter(|c| c.resolves == Some(true) || c.proxied)
            .map(|c| c.domain.as_str())
            .collect();
        format!("only {} validated", ok.join(", "))
    } else {
        format!(
            "neither {} nor {} resolves to {ip}",
            checks[0].domain, checks[1].domain
        )
    };
    verdict.canaries = checks;
    verdict
}

/// Validate a self-hosted registry domain on its own.
///
/// A proxied domain fails straight away when proxies are not allowed; no
/// resolution check is made in that case.
pub async fn validate_registry_domain(
    probe: &dyn NetworkProbe,
    domain: &str,
    external_ip: &str,
    allow_proxy: bool,
) -> DnsVerdict {
    let domain = domain.trim();
    if domain.is_empty() {
        return DnsVerdict::failed("no registry domain configured");
    }

    let mut verdict = DnsVerdict::default();
    if probe.is_behind_proxy(domain).await {
        verdict.cloudflare = true;
        if !allow_proxy {
            verdict.message = format!(
                "{domain} is behind a reverse proxy; disable proxying for the registry record"
            );
            return verdict;
        }
        verdict.success = true;
        verdict.message = format!("{domain} is served through a reverse proxy");
        return verdict;
    }

    verdict.success = probe.resolves_to(domain, external_ip).await;
    verdict.message = if verdict.success {
        format!("{domain} resolves to {external_ip}")
    } else {
        format!("{domain} does not resolve to {external_ip}")
    };
    verdict
}

//! Registry credential checks against the Docker registry v2 API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use nodeup_shared::collaborators::RegistryAuthChecker;
use reqwest::{header, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

/// A `WWW-Authenticate: Bearer ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

/// Parse a Bearer challenge header. Other schemes yield `None`.
pub fn parse_bearer_challenge(header: &str) -> Option<BearerChallenge> {
    let (scheme, params) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut realm = None;
    let mut service = None;
    let mut scope = None;
    let mut rest = params.trim();
    while !rest.is_empty() {
        let (key, after) = rest.split_once('=')?;
        let after = after.trim_start();
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => {
                let end = quoted.find('"')?;
                (&quoted[..end], &quoted[end + 1..])
            }
            None => match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "realm" => realm = Some(value.to_string()),
            "service" => service = Some(value.to_string()),
            "scope" => scope = Some(value.to_string()),
            _ => {}
        }
        rest = remaining.trim_start().trim_start_matches(',').trim_start();
    }

    Some(BearerChallenge {
        realm: realm?,
        service,
        scope,
    })
}

pub struct HttpRegistryChecker {
    http: reqwest::Client,
}

impl HttpRegistryChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }

    async fn check(&self, host: &str, username: &str, password: &str) -> Result<bool> {
        let url = format!("https://{host}/v2/");
        let response = self
            .http
            .get(&url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .with_context(|| format!("cannot reach {url}"))?;

        match response.status() {
            status if status.is_success() => return Ok(true),
            StatusCode::UNAUTHORIZED => {}
            status => {
                debug!(host, %status, "unexpected registry status");
                return Ok(false);
            }
        }

        let Some(challenge) = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_bearer_challenge)
        else {
            // Basic-auth registry that refused the credentials.
            return Ok(false);
        };

        let mut query = Vec::new();
        if let Some(service) = &challenge.service {
            query.push(("service", service.as_str()));
        }
        if let Some(scope) = &challenge.scope {
            query.push(("scope", scope.as_str()));
        }
        let token = self
            .http
            .get(&challenge.realm)
            .query(&query)
            .basic_auth(username, Some(password))
            .send()
            .await
            .with_context(|| format!("cannot reach token service {}", challenge.realm))?;
        debug!(host, status = %token.status(), "token service answered");
        Ok(token.status().is_success())
    }
}

#[async_trait]
impl RegistryAuthChecker for HttpRegistryChecker {
    async fn validate(&self, host: &str, username: &str, password: &str) -> bool {
        match self.check(host, username, password).await {
            Ok(valid) => {
                info!(host, username, valid, "registry credential check");
                valid
            }
            Err(err) => {
                info!(host, "registry credential check failed: {:#}", err);
                false
            }
        }
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{QueryConfig, VulnerabilitySource};
use crate::error::QueryError;
use crate::model::{PackageRecord, VulnRecord};

/// Default public OSV endpoint.
pub const DEFAULT_API_URL: &str = "https://api.osv.dev";

/// Client for the OSV.dev single-package query endpoint.
pub struct OsvClient {
    client: reqwest::Client,
    api_url: String,
    probe_timeout: Duration,
}

impl OsvClient {
    pub fn new() -> Self {
        Self::from_config(&QueryConfig::default())
    }

    pub fn from_config(config: &QueryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("depscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn query_url(&self) -> String {
        format!("{}/v1/query", self.api_url)
    }
}

impl Default for OsvClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct OsvPackage<'a> {
    name: &'a str,
    ecosystem: &'a str,
}

#[derive(Serialize)]
struct OsvQuery<'a> {
    package: OsvPackage<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

#[derive(Deserialize)]
struct OsvQueryResponse {
    #[serde(default)]
    vulns: Vec<VulnRecord>,
}

/// Reduces a manifest version to something the database can match exactly.
///
/// Range operators and whitespace are stripped. Wildcards, unknown versions
/// and anything that does not look like a version yield `None`, which makes
/// the database report vulnerabilities for every version.
pub fn query_version(version: &str) -> Option<String> {
    let trimmed = version.trim();
    if trimmed.contains("||") || trimmed.contains(" - ") || trimmed.contains(',') {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '^' | '~' | '=' | '>' | '<' | '!') && !c.is_whitespace())
        .collect();

    let mut chars = cleaned.chars();
    let looks_like_version = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('v') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    if !looks_like_version {
        return None;
    }

    let wildcard = cleaned
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"));
    if wildcard {
        return None;
    }

    Some(cleaned)
}

#[async_trait]
impl VulnerabilitySource for OsvClient {
    fn name(&self) -> &'static str {
        "OSV.dev"
    }

    /// Opens a TCP connection to the API host within the probe timeout.
    async fn is_reachable(&self) -> bool {
        let url = match reqwest::Url::parse(&self.api_url) {
            Ok(url) => url,
            Err(e) => {
                debug!(api_url = %self.api_url, error = %e, "invalid vulnerability API URL");
                return false;
            }
        };
        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return false;
        };

        let connect = tokio::net::TcpStream::connect((host, port));
        match tokio::time::timeout(self.probe_timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host, port, error = %e, "network probe failed");
                false
            }
            Err(_) => {
                debug!(host, port, "network probe timed out");
                false
            }
        }
    }

    async fn query(&self, package: &PackageRecord) -> Result<Vec<VulnRecord>, QueryError> {
        let body = OsvQuery {
            package: OsvPackage {
                name: &package.name,
                ecosystem: package.ecosystem.osv_name(),
            },
            version: query_version(&package.version),
        };

        let response = self.client.post(self.query_url()).json(&body).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(QueryError::Http(status.as_u16()));
        }

        let parsed: OsvQueryResponse = response.json().await?;
        Ok(parsed.vulns)
    }
}

//! Vulnerability lookups against an external database.
//!
//! [`VulnerabilitySource`] is the seam between the [`QueryEngine`] and the
//! network. [`OsvClient`] is the production implementation; tests plug in
//! in-memory sources.

mod engine;
mod osv;
mod severity;

pub use engine::{QueryEngine, CACHE_NAMESPACE};
pub use osv::{query_version, OsvClient, DEFAULT_API_URL};
pub use severity::{cvss3_base_score, normalize_severity, parse_cvss_score, severity_from_score};

use crate::error::QueryError;
use crate::model::{PackageRecord, VulnRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait VulnerabilitySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap pre-flight check that the database can be reached at all.
    async fn is_reachable(&self) -> bool;

    /// Looks up one package. An empty list means no known vulnerabilities.
    async fn query(&self, package: &PackageRecord) -> Result<Vec<VulnRecord>, QueryError>;
}

/// Tuning for the query engine and its HTTP client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Base URL of the OSV-compatible API.
    pub api_url: String,

    /// Maximum number of requests in flight at once.
    pub max_concurrency: usize,

    /// Per-request timeout.
    pub request_timeout_secs: u64,

    /// Minimum spacing between two request dispatches.
    pub inter_request_delay_ms: u64,

    /// Upper bound on the up-front reachability probe.
    pub probe_timeout_ms: u64,

    /// Deadline for a whole batch. Chunks not started by then are cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_deadline_secs: Option<u64>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            max_concurrency: 10,
            request_timeout_secs: 10,
            inter_request_delay_ms: 100,
            probe_timeout_ms: 800,
            batch_deadline_secs: None,
        }
    }
}

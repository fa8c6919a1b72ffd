//! The analysis entry point.
//!
//! [`Engine::analyze`] runs the signature checks and the vulnerability
//! lookups for a list of packages and merges both into one list of findings.
//! For each package, signature findings come first, followed by one finding
//! per vulnerability. Duplicates on `(package, finding type, source)` are
//! dropped, keeping the first occurrence.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::Cache;
use crate::checker::{normalize_severity, OsvClient, QueryEngine};
use crate::config::{Config, IgnoreConfig};
use crate::model::{FindingType, PackageRecord, QueryOutcome, SecurityFinding, VulnRecord};
use crate::parser::parse_manifest;
use crate::rate_limit::RateLimiter;
use crate::signature::check_package;

const VULNERABILITY_CONFIDENCE: f64 = 0.9;

/// Source prefix for vulnerability findings; the database id follows it.
pub const VULNERABILITY_SOURCE_PREFIX: &str = "osv";

/// A manifest to analyse: its file name (used for detection) and its text.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub filename: String,
    pub content: String,
}

impl Manifest {
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Result of analysing one or more manifests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisReport {
    pub findings: Vec<SecurityFinding>,
    pub parse_errors: Vec<String>,
    pub packages_scanned: usize,
}

pub struct Engine {
    query_engine: Option<QueryEngine>,
    ignore: IgnoreConfig,
}

impl Engine {
    /// An engine that runs signature checks and vulnerability lookups.
    pub fn new(query_engine: QueryEngine) -> Self {
        Self {
            query_engine: Some(query_engine),
            ignore: IgnoreConfig::default(),
        }
    }

    /// An engine that only runs the offline signature checks.
    pub fn offline() -> Self {
        Self {
            query_engine: None,
            ignore: IgnoreConfig::default(),
        }
    }

    /// Wires an engine from configuration: an OSV client, a rate limiter and
    /// the given cache. `skip_vuln_check` yields an offline engine.
    pub fn from_config(config: &Config, cache: Option<Arc<Cache>>) -> Self {
        let engine = if config.skip_vuln_check {
            Self::offline()
        } else {
            let source = Arc::new(OsvClient::from_config(&config.query));
            let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
            let mut query_engine = QueryEngine::new(source, limiter, config.query.clone())
                .with_cache_ttl_hours(config.cache_ttl_hours);
            if let Some(cache) = cache {
                query_engine = query_engine.with_cache(cache);
            }
            Self::new(query_engine)
        };
        engine.with_ignore(config.ignore.clone())
    }

    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn checks_vulnerabilities(&self) -> bool {
        self.query_engine.is_some()
    }

    /// Analyses packages and returns the deduplicated findings.
    ///
    /// Never fails: lookups that could not be completed are logged and
    /// contribute no findings.
    pub async fn analyze(&self, packages: &[PackageRecord]) -> Vec<SecurityFinding> {
        let packages: Vec<PackageRecord> = packages
            .iter()
            .filter(|pkg| !self.ignore.should_ignore_package(&pkg.name))
            .cloned()
            .collect();

        let outcomes = match &self.query_engine {
            Some(engine) => engine.query_batch(&packages).await,
            None => Vec::new(),
        };

        let failed: Vec<&QueryOutcome> = outcomes.iter().filter(|o| !o.success).collect();
        if let Some(first) = failed.first() {
            warn!(
                failed = failed.len(),
                error = first.error.as_deref().unwrap_or_default(),
                "some vulnerability lookups failed"
            );
        }

        let mut findings = Vec::new();
        for (index, package) in packages.iter().enumerate() {
            findings.extend(check_package(package));

            // Outcomes are index-aligned with the packages that were queried.
            if let Some(outcome) = outcomes.get(index) {
                findings.extend(
                    outcome
                        .vulnerabilities
                        .iter()
                        .filter(|vuln| !self.is_ignored_vulnerability(vuln))
                        .map(|vuln| vulnerability_finding(package, vuln)),
                );
            }
        }

        let findings = dedup_findings(findings);
        info!(
            packages = packages.len(),
            findings = findings.len(),
            "analysis complete"
        );
        findings
    }

    /// Detects, parses and analyses a single manifest.
    pub async fn analyze_manifest(&self, filename: &str, content: &str) -> AnalysisReport {
        self.analyze_manifests(&[Manifest::new(filename, content)]).await
    }

    /// Detects, parses and analyses several manifests as one batch.
    pub async fn analyze_manifests(&self, manifests: &[Manifest]) -> AnalysisReport {
        let mut packages = Vec::new();
        let mut parse_errors = Vec::new();

        for manifest in manifests {
            let (_, result) = parse_manifest(&manifest.filename, &manifest.content);
            packages.extend(result.packages);
            parse_errors.extend(result.errors);
        }

        AnalysisReport {
            findings: self.analyze(&packages).await,
            parse_errors,
            packages_scanned: packages.len(),
        }
    }

    fn is_ignored_vulnerability(&self, vuln: &VulnRecord) -> bool {
        self.ignore.should_ignore_vulnerability(&vuln.id)
            || vuln
                .aliases
                .iter()
                .any(|alias| self.ignore.should_ignore_vulnerability(alias))
    }
}

/// Builds the finding for one vulnerability affecting a package.
pub fn vulnerability_finding(package: &PackageRecord, vuln: &VulnRecord) -> SecurityFinding {
    let summary = vuln
        .summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("No summary available");

    let mut evidence = vec![format!("{}: {}", vuln.id, summary)];
    if !vuln.aliases.is_empty() {
        evidence.push(format!("Aliases: {}", vuln.aliases.join(", ")));
    }
    if let Some(url) = vuln.reference_url() {
        evidence.push(format!("Reference: {}", url));
    }

    let recommendation = match vuln.fixed_version() {
        Some(fixed) => format!("Upgrade {} to {} or later", package.name, fixed),
        None => format!(
            "No fixed version of {} is known; consider an alternative or mitigate {}",
            package.name, vuln.id
        ),
    };

    SecurityFinding::new(
        &package.name,
        &package.version,
        FindingType::Vulnerability,
        normalize_severity(vuln),
        VULNERABILITY_CONFIDENCE,
        format!("{}:{}", VULNERABILITY_SOURCE_PREFIX, vuln.id),
    )
    .with_evidence(evidence)
    .with_recommendations(vec![recommendation])
}

/// Drops findings whose `(package, finding type, source)` was already seen.
pub fn dedup_findings(findings: Vec<SecurityFinding>) -> Vec<SecurityFinding> {
    let mut seen: HashSet<(String, FindingType, String)> = HashSet::new();
    findings
        .into_iter()
        .filter(|f| seen.insert((f.package.clone(), f.finding_type, f.source.clone())))
        .collect()
}

use async_trait::async_trait;
use depscan::checker::VulnerabilitySource;
use depscan::model::{DatabaseSpecific, SeverityScore, VulnRecord};
use depscan::rate_limit::RateLimiter;
use depscan::{
    Cache, Ecosystem, Engine, FindingType, Manifest, PackageRecord, QueryConfig, QueryEngine,
    QueryError, Severity,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Vulnerability database backed by a map from package name to records.
#[derive(Default)]
struct InMemorySource {
    offline: bool,
    vulns: HashMap<String, Vec<VulnRecord>>,
    failing: HashMap<String, QueryError>,
    calls: AtomicUsize,
}

impl InMemorySource {
    fn with_vuln(mut self, package: &str, vuln: VulnRecord) -> Self {
        self.vulns.entry(package.to_string()).or_default().push(vuln);
        self
    }

    fn failing(mut self, package: &str, error: QueryError) -> Self {
        self.failing.insert(package.to_string(), error);
        self
    }
}

#[async_trait]
impl VulnerabilitySource for InMemorySource {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn is_reachable(&self) -> bool {
        !self.offline
    }

    async fn query(&self, package: &PackageRecord) -> Result<Vec<VulnRecord>, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failing.get(&package.name) {
            return Err(error.clone());
        }
        Ok(self.vulns.get(&package.name).cloned().unwrap_or_default())
    }
}

fn fast_config() -> QueryConfig {
    QueryConfig {
        inter_request_delay_ms: 0,
        ..QueryConfig::default()
    }
}

fn engine_with(source: Arc<InMemorySource>) -> Engine {
    Engine::new(QueryEngine::new(
        source,
        Arc::new(RateLimiter::default()),
        fast_config(),
    ))
}

fn advisory(id: &str, cvss: Option<&str>, label: Option<&str>) -> VulnRecord {
    VulnRecord {
        id: id.to_string(),
        summary: Some(format!("Advisory {}", id)),
        severity: cvss
            .map(|score| {
                vec![SeverityScore {
                    score_type: "CVSS_V3".to_string(),
                    score: score.to_string(),
                }]
            })
            .unwrap_or_default(),
        database_specific: label.map(|l| DatabaseSpecific {
            severity: Some(l.to_string()),
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_npm_manifest_with_malicious_dependency() {
    let engine = engine_with(Arc::new(InMemorySource::default()));

    let manifest = r#"{
        "name": "demo",
        "dependencies": {"flatmap-stream": "0.1.1", "express": "4.17.1"}
    }"#;
    let report = engine.analyze_manifest("package.json", manifest).await;

    assert_eq!(report.packages_scanned, 2);
    assert!(report.parse_errors.is_empty());
    assert_eq!(report.findings.len(), 1);

    let finding = &report.findings[0];
    assert_eq!(finding.package, "flatmap-stream");
    assert_eq!(finding.finding_type, FindingType::MaliciousPackage);
    assert_eq!(finding.severity, Severity::Critical);
}

#[tokio::test]
async fn test_requirements_with_compromised_ctx() {
    let engine = engine_with(Arc::new(InMemorySource::default()));

    let report = engine
        .analyze_manifest("requirements.txt", "ctx==0.1.2\nrequests==2.31.0\n")
        .await;

    assert_eq!(report.packages_scanned, 2);
    let malicious: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.finding_type == FindingType::MaliciousPackage)
        .collect();
    assert_eq!(malicious.len(), 1);
    assert_eq!(malicious[0].package, "ctx");
    assert_eq!(malicious[0].version, "0.1.2");
    assert!(report.findings.iter().all(|f| f.package != "requests"));
}

#[tokio::test]
async fn test_typosquat_in_gemfile() {
    let engine = Engine::offline();
    let report = engine
        .analyze_manifest("Gemfile", "source 'https://rubygems.org'\ngem 'raills', '7.0.0'\n")
        .await;

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].finding_type, FindingType::Typosquat);
    assert!(report.findings[0].evidence[0].contains("rails"));
}

#[tokio::test]
async fn test_vulnerability_findings_follow_signature_findings() {
    let source = InMemorySource::default()
        .with_vuln(
            "lodash",
            advisory("GHSA-critical", Some("CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"), None),
        )
        .with_vuln("lodash", advisory("GHSA-moderate", None, Some("MODERATE")))
        .with_vuln("l0dash", advisory("GHSA-unrated", None, None));
    let engine = engine_with(Arc::new(source));

    let findings = engine
        .analyze(&[
            PackageRecord::new("l0dash", "1.0.0", Ecosystem::Npm),
            PackageRecord::new("lodash", "4.17.20", Ecosystem::Npm),
        ])
        .await;

    let summary: Vec<_> = findings
        .iter()
        .map(|f| (f.package.as_str(), f.finding_type, f.severity))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("l0dash", FindingType::Typosquat, Severity::High),
            ("l0dash", FindingType::Vulnerability, Severity::Medium),
            ("lodash", FindingType::Vulnerability, Severity::Critical),
            ("lodash", FindingType::Vulnerability, Severity::Medium),
        ]
    );
    assert!(findings
        .iter()
        .filter(|f| f.finding_type == FindingType::Vulnerability)
        .all(|f| f.confidence == 0.9));
    assert!(findings[2].evidence[0].contains("GHSA-critical"));
}

#[tokio::test]
async fn test_duplicate_packages_are_deduplicated() {
    let source = InMemorySource::default().with_vuln("ctx", advisory("MAL-2022-1", None, None));
    let engine = engine_with(Arc::new(source));

    let report = engine
        .analyze_manifests(&[
            Manifest::new("a/requirements.txt", "ctx==0.1.2\n"),
            Manifest::new("b/requirements.txt", "ctx==0.1.2\n"),
        ])
        .await;

    assert_eq!(report.packages_scanned, 2);
    let types: Vec<_> = report.findings.iter().map(|f| f.finding_type).collect();
    assert_eq!(types, vec![FindingType::MaliciousPackage, FindingType::Vulnerability]);
}

#[tokio::test]
async fn test_failed_lookups_do_not_fail_analysis() {
    let source = InMemorySource::default()
        .failing("express", QueryError::Timeout)
        .with_vuln("minimist", advisory("GHSA-minimist", Some("9.8"), None));
    let engine = engine_with(Arc::new(source));

    let findings = engine
        .analyze(&[
            PackageRecord::new("express", "4.17.1", Ecosystem::Npm),
            PackageRecord::new("minimist", "1.2.5", Ecosystem::Npm),
        ])
        .await;

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].package, "minimist");
    assert_eq!(findings[0].severity, Severity::Critical);
}

#[tokio::test]
async fn test_query_batch_preserves_length_and_order() {
    let source = Arc::new(
        InMemorySource::default()
            .failing("b", QueryError::Network("connection refused".to_string()))
            .failing("d", QueryError::Http(502)),
    );
    let engine = QueryEngine::new(
        source,
        Arc::new(RateLimiter::default()),
        QueryConfig {
            max_concurrency: 2,
            ..fast_config()
        },
    );

    let packages: Vec<_> = ["a", "b", "c", "d", "e", "f", "g"]
        .iter()
        .map(|n| PackageRecord::new(*n, "1.0.0", Ecosystem::PyPI))
        .collect();
    let outcomes = engine.query_batch(&packages).await;

    assert_eq!(outcomes.len(), packages.len());
    for (package, outcome) in packages.iter().zip(&outcomes) {
        assert_eq!(outcome.package_name, package.name);
    }
    assert_eq!(outcomes[1].error.as_deref(), Some("network_error: connection refused"));
    assert_eq!(outcomes[3].error.as_deref(), Some("http_error: 502"));
    assert_eq!(outcomes.iter().filter(|o| o.success).count(), 5);
}

#[tokio::test]
async fn test_unreachable_network_fails_fast() {
    let source = Arc::new(InMemorySource {
        offline: true,
        ..Default::default()
    });
    let engine = QueryEngine::new(source.clone(), Arc::new(RateLimiter::default()), QueryConfig::default());

    let packages: Vec<_> = (0..50)
        .map(|i| PackageRecord::new(format!("pkg-{}", i), "1.0.0", Ecosystem::Npm))
        .collect();

    let started = Instant::now();
    let outcomes = engine.query_batch(&packages).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(outcomes.len(), 50);
    assert!(outcomes
        .iter()
        .all(|o| !o.success && o.error.as_deref() == Some("network_unavailable")));
    assert_eq!(source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unresolvable_host_fails_fast() {
    let engine = Engine::from_config(
        &depscan::Config {
            query: QueryConfig {
                api_url: "https://osv.invalid".to_string(),
                probe_timeout_ms: 300,
                ..QueryConfig::default()
            },
            ..depscan::Config::default()
        },
        None,
    );

    let started = Instant::now();
    let findings = engine
        .analyze(&[PackageRecord::new("express", "4.17.1", Ecosystem::Npm)])
        .await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(findings.is_empty());
}

#[tokio::test]
async fn test_cache_shared_between_engines() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(Cache::with_dir(dir.path()));
    let packages = vec![PackageRecord::new("lodash", "4.17.20", Ecosystem::Npm)];

    let first = Arc::new(InMemorySource::default().with_vuln("lodash", advisory("GHSA-1", None, None)));
    QueryEngine::new(first.clone(), Arc::new(RateLimiter::default()), fast_config())
        .with_cache(cache.clone())
        .query_batch(&packages)
        .await;
    assert_eq!(first.calls.load(Ordering::SeqCst), 1);

    // A second engine over the same directory answers from the cache.
    let second = Arc::new(InMemorySource::default());
    let outcomes = QueryEngine::new(second.clone(), Arc::new(RateLimiter::default()), fast_config())
        .with_cache(Arc::new(Cache::with_dir(dir.path())))
        .query_batch(&packages)
        .await;

    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    assert_eq!(outcomes[0].vulnerabilities[0].id, "GHSA-1");
}

#[tokio::test]
async fn test_ignored_vulnerabilities_are_dropped() {
    let source = InMemorySource::default()
        .with_vuln("lodash", advisory("GHSA-keep", None, None))
        .with_vuln("lodash", advisory("GHSA-drop", None, None));
    let engine = engine_with(Arc::new(source)).with_ignore(depscan::config::IgnoreConfig {
        packages: vec![],
        vulnerabilities: vec!["GHSA-drop".to_string()],
    });

    let findings = engine
        .analyze(&[PackageRecord::new("lodash", "4.17.20", Ecosystem::Npm)])
        .await;

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].source, "osv:GHSA-keep");
}

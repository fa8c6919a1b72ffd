//! Offline signature checks: known-malicious packages and typosquats.
//!
//! Both checks are pure lookups with no I/O, so they can run from any number
//! of threads at once.

mod malicious;
mod typosquat;

pub use malicious::{find_signature, signatures_for, MaliciousSignature};
pub use typosquat::{
    classify, find_typosquat, targets_for, SimilarityKind, TyposquatMatch, REPORT_THRESHOLD,
};

use crate::model::{FindingType, PackageRecord, SecurityFinding, Severity};

pub const MALICIOUS_SOURCE: &str = "malicious_signatures";
pub const TYPOSQUAT_SOURCE: &str = "typosquat_detector";

const MALICIOUS_CONFIDENCE: f64 = 0.95;

/// Runs both signature checks for a package.
///
/// # Example
///
/// ```
/// use depscan::signature::check_package;
/// use depscan::{Ecosystem, FindingType, PackageRecord, Severity};
///
/// let findings = check_package(&PackageRecord::new("ctx", "0.1.2", Ecosystem::PyPI));
/// assert_eq!(findings[0].finding_type, FindingType::MaliciousPackage);
/// assert_eq!(findings[0].severity, Severity::Critical);
/// ```
pub fn check_package(package: &PackageRecord) -> Vec<SecurityFinding> {
    let mut findings = Vec::new();

    if let Some(signature) = find_signature(package) {
        findings.push(malicious_finding(package, signature));
    }

    if let Some(hit) = find_typosquat(&package.name, package.ecosystem) {
        findings.push(typosquat_finding(package, &hit));
    }

    findings
}

fn malicious_finding(package: &PackageRecord, signature: &MaliciousSignature) -> SecurityFinding {
    let matched_versions = if signature.version_constraint == "*" {
        "all versions".to_string()
    } else {
        format!("version {}", signature.version_constraint)
    };

    SecurityFinding::new(
        &package.name,
        &package.version,
        FindingType::MaliciousPackage,
        Severity::Critical,
        MALICIOUS_CONFIDENCE,
        MALICIOUS_SOURCE,
    )
    .with_evidence(vec![
        format!("Reason: {}", signature.reason),
        format!(
            "{} package '{}' is listed as malicious ({})",
            package.ecosystem, signature.name, matched_versions
        ),
    ])
    .with_recommendations(vec![
        format!("Remove '{}' from your dependencies immediately", package.name),
        "Rotate any credentials available to environments where it was installed".to_string(),
        "Review build and deployment hosts for signs of compromise".to_string(),
    ])
}

fn typosquat_finding(package: &PackageRecord, hit: &TyposquatMatch) -> SecurityFinding {
    let severity = if hit.confidence > 0.8 {
        Severity::High
    } else {
        Severity::Medium
    };

    SecurityFinding::new(
        &package.name,
        &package.version,
        FindingType::Typosquat,
        severity,
        hit.confidence,
        TYPOSQUAT_SOURCE,
    )
    .with_evidence(vec![
        format!(
            "'{}' closely resembles popular {} package '{}'",
            package.name, package.ecosystem, hit.target
        ),
        format!("Similarity: {}", hit.kind.describe()),
    ])
    .with_recommendations(vec![
        format!(
            "Verify that '{}' is intended and not a misspelling of '{}'",
            package.name, hit.target
        ),
        "Check the publisher, repository and download history before installing".to_string(),
    ])
}

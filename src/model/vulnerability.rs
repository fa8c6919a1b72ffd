use serde::{Deserialize, Serialize};

use super::package::{Ecosystem, PackageRecord};

/// A vulnerability record in the shape returned by the OSV database.
///
/// Only the fields the engine reads are modelled; everything is optional so
/// partially populated records still deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub severity: Vec<SeverityScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_specific: Option<DatabaseSpecific>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected: Vec<Affected>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityScore {
    #[serde(rename = "type")]
    pub score_type: String,
    pub score: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSpecific {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Affected {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<AffectedRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectedRange {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<RangeEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl VulnRecord {
    /// First version listed as fixing this vulnerability, if any.
    pub fn fixed_version(&self) -> Option<&str> {
        self.affected.iter().find_map(|affected| {
            affected.ranges.iter().find_map(|range| {
                range.events.iter().find_map(|event| event.fixed.as_deref())
            })
        })
    }

    pub fn reference_url(&self) -> Option<&str> {
        self.references.iter().find_map(|r| r.url.as_deref())
    }
}

/// Result of looking up one package in the vulnerability database.
///
/// `query_batch` returns exactly one outcome per input package, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub package_name: String,
    pub ecosystem: Ecosystem,
    pub version: String,
    pub vulnerabilities: Vec<VulnRecord>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn succeeded(package: &PackageRecord, vulnerabilities: Vec<VulnRecord>) -> Self {
        Self {
            package_name: package.name.clone(),
            ecosystem: package.ecosystem,
            version: package.version.clone(),
            vulnerabilities,
            success: true,
            error: None,
        }
    }

    pub fn failed(package: &PackageRecord, error: impl Into<String>) -> Self {
        Self {
            package_name: package.name.clone(),
            ecosystem: package.ecosystem,
            version: package.version.clone(),
            vulnerabilities: Vec::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_osv_record() {
        let json = r#"{
            "id": "GHSA-29mw-wpgm-hmr9",
            "summary": "Prototype Pollution in lodash",
            "aliases": ["CVE-2020-28500"],
            "severity": [{"type": "CVSS_V3", "score": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:L"}],
            "database_specific": {"severity": "MODERATE", "cwe_ids": ["CWE-400"]},
            "affected": [{"ranges": [{"type": "SEMVER", "events": [{"introduced": "0"}, {"fixed": "4.17.21"}]}]}],
            "references": [{"type": "ADVISORY", "url": "https://nvd.nist.gov/vuln/detail/CVE-2020-28500"}]
        }"#;

        let record: VulnRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "GHSA-29mw-wpgm-hmr9");
        assert_eq!(record.fixed_version(), Some("4.17.21"));
        assert_eq!(
            record.database_specific.and_then(|d| d.severity).as_deref(),
            Some("MODERATE")
        );
        assert_eq!(record.severity[0].score_type, "CVSS_V3");
    }

    #[test]
    fn test_minimal_record() {
        let record: VulnRecord = serde_json::from_str(r#"{"id": "OSV-1"}"#).unwrap();
        assert!(record.fixed_version().is_none());
        assert!(record.reference_url().is_none());
    }

    #[test]
    fn test_outcome_constructors() {
        let pkg = PackageRecord::new("left-pad", "1.0.0", Ecosystem::Npm);
        let ok = QueryOutcome::succeeded(&pkg, Vec::new());
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = QueryOutcome::failed(&pkg, "timeout");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("timeout"));
        assert_eq!(failed.package_name, "left-pad");
    }
}

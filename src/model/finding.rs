use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical = 4,
    High = 3,
    Medium = 2,
    Low = 1,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Maps a database-provided severity label. GHSA's "moderate" is medium.
    pub fn from_label(label: &str) -> Option<Severity> {
        match label.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    MaliciousPackage,
    Typosquat,
    Vulnerability,
}

impl FindingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingType::MaliciousPackage => "malicious_package",
            FindingType::Typosquat => "typosquat",
            FindingType::Vulnerability => "vulnerability",
        }
    }
}

impl std::fmt::Display for FindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single security problem attached to a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub package: String,
    pub version: String,
    pub finding_type: FindingType,
    pub severity: Severity,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub recommendations: Vec<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl SecurityFinding {
    pub fn new(
        package: impl Into<String>,
        version: impl Into<String>,
        finding_type: FindingType,
        severity: Severity,
        confidence: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
            finding_type,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            evidence: Vec::new(),
            recommendations: Vec::new(),
            source: source.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_severity_from_label() {
        assert_eq!(Severity::from_label("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_label("Moderate"), Some(Severity::Medium));
        assert_eq!(Severity::from_label(" low "), Some(Severity::Low));
        assert_eq!(Severity::from_label("unknown"), None);
    }

    #[test]
    fn test_finding_serializes_flat() {
        let finding = SecurityFinding::new(
            "ctx",
            "0.1.2",
            FindingType::MaliciousPackage,
            Severity::Critical,
            0.95,
            "malicious_signatures",
        )
        .with_evidence(vec!["reason".to_string()]);

        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["finding_type"], "malicious_package");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["evidence"][0], "reason");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let finding = SecurityFinding::new("a", "1", FindingType::Typosquat, Severity::High, 1.7, "x");
        assert_eq!(finding.confidence, 1.0);
    }
}

use crate::aggregator::AnalysisReport;
use anyhow::Result;

pub fn print_json(report: &AnalysisReport) -> Result<()> {
    println!("{}", generate_json_string(report)?);
    Ok(())
}

pub fn generate_json_string(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FindingType, SecurityFinding, Severity};

    #[test]
    fn test_json_shape() {
        let report = AnalysisReport {
            findings: vec![SecurityFinding::new(
                "ctx",
                "0.1.2",
                FindingType::MaliciousPackage,
                Severity::Critical,
                0.95,
                "malicious_signatures",
            )],
            parse_errors: vec!["pom.xml: unexpected end of document".to_string()],
            packages_scanned: 1,
        };

        let value: serde_json::Value =
            serde_json::from_str(&generate_json_string(&report).unwrap()).unwrap();
        assert_eq!(value["packages_scanned"], 1);
        assert_eq!(value["findings"][0]["finding_type"], "malicious_package");
        assert_eq!(value["findings"][0]["severity"], "critical");
        assert_eq!(value["parse_errors"][0], "pom.xml: unexpected end of document");
    }
}

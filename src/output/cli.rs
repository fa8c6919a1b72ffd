use crate::aggregator::AnalysisReport;
use crate::model::{FindingType, SecurityFinding, Severity};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct FindingRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Type")]
    finding_type: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Details")]
    details: String,
}

pub fn print_cli_table(report: &AnalysisReport) -> Result<()> {
    println!();
    println!("Scanned {} packages.", report.packages_scanned);

    if !report.parse_errors.is_empty() {
        println!();
        println!("{} manifest problems:", report.parse_errors.len());
        for error in &report.parse_errors {
            println!("  - {}", error);
        }
    }

    println!();
    if report.findings.is_empty() {
        println!("No security findings.");
    } else {
        println!("Found {} security findings:", report.findings.len());
        println!();

        let mut findings: Vec<&SecurityFinding> = report.findings.iter().collect();
        // Stable sort keeps analysis order within a severity.
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));

        let rows: Vec<FindingRow> = findings
            .iter()
            .map(|f| FindingRow {
                severity: format_severity(&f.severity),
                finding_type: format_type(f.finding_type).to_string(),
                package: truncate(&f.package, 40),
                version: truncate(&f.version, 20),
                confidence: format!("{:.0}%", f.confidence * 100.0),
                details: truncate(f.evidence.first().map(String::as_str).unwrap_or("-"), 60),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);

        print_recommendations(&findings);
    }

    println!();
    print_summary(report);

    Ok(())
}

/// Lists the first recommendation of each critical or high finding.
fn print_recommendations(findings: &[&SecurityFinding]) {
    let urgent: Vec<_> = findings
        .iter()
        .filter(|f| f.severity >= Severity::High)
        .filter_map(|f| f.recommendations.first().map(|r| (&f.package, r)))
        .collect();

    if urgent.is_empty() {
        return;
    }

    println!();
    println!("Recommended actions:");
    for (package, recommendation) in urgent {
        println!("  {}: {}", package, recommendation);
    }
}

fn format_type(finding_type: FindingType) -> &'static str {
    match finding_type {
        FindingType::MaliciousPackage => "Malicious",
        FindingType::Typosquat => "Typosquat",
        FindingType::Vulnerability => "Vulnerability",
    }
}

fn format_severity(severity: &Severity) -> String {
    match severity {
        Severity::Critical => "\x1b[31mCRITICAL\x1b[0m".to_string(),
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Medium => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Severity::Low => "\x1b[32mLOW\x1b[0m".to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// 100 minus a weighted penalty per finding, floored at zero.
fn calculate_risk_score(report: &AnalysisReport) -> u8 {
    let penalty: u32 = report
        .findings
        .iter()
        .map(|f| match (f.finding_type, f.severity) {
            (FindingType::MaliciousPackage, _) => 50,
            (_, Severity::Critical) => 25,
            (_, Severity::High) => 15,
            (_, Severity::Medium) => 5,
            (_, Severity::Low) => 1,
        })
        .sum();
    100u32.saturating_sub(penalty) as u8
}

fn score_indicator(score: u8) -> &'static str {
    match score {
        90..=100 => "[Good]",
        70..=89 => "[Fair]",
        40..=69 => "[Poor]",
        _ => "[Critical]",
    }
}

fn print_summary(report: &AnalysisReport) {
    let count = |severity: Severity| {
        report
            .findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    };
    let count_type = |finding_type: FindingType| {
        report
            .findings
            .iter()
            .filter(|f| f.finding_type == finding_type)
            .count()
    };

    println!("Summary:");
    println!("  Packages scanned: {}", report.packages_scanned);
    if !report.findings.is_empty() {
        println!(
            "  Findings: {} critical, {} high, {} medium, {} low",
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low)
        );
        println!(
            "  By type: {} malicious, {} typosquat, {} vulnerability",
            count_type(FindingType::MaliciousPackage),
            count_type(FindingType::Typosquat),
            count_type(FindingType::Vulnerability)
        );
    }

    let score = calculate_risk_score(report);
    println!();
    println!("Security Score: {}/100 {}", score, score_indicator(score));
}

//! Severity normalization for vulnerability records.
//!
//! Order of preference:
//!
//! 1. a `CVSS_V3` entry, either a numeric score or a vector whose base score
//!    is computed here (CVSS v3.1 formulas)
//! 2. the database-provided severity label
//! 3. `medium`

use crate::model::{Severity, VulnRecord};

/// Buckets a numeric CVSS score.
pub fn severity_from_score(score: f64) -> Severity {
    match score {
        s if s >= 9.0 => Severity::Critical,
        s if s >= 7.0 => Severity::High,
        s if s >= 4.0 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Parses a CVSS score given either as a number or as a v3 vector string.
pub fn parse_cvss_score(score: &str) -> Option<f64> {
    let score = score.trim();
    if let Ok(value) = score.parse::<f64>() {
        return (0.0..=10.0).contains(&value).then_some(value);
    }
    if score.starts_with("CVSS:3") {
        return cvss3_base_score(score);
    }
    None
}

/// Normalizes the severity of a vulnerability record.
pub fn normalize_severity(vuln: &VulnRecord) -> Severity {
    let cvss = vuln
        .severity
        .iter()
        .filter(|s| s.score_type.to_ascii_uppercase().starts_with("CVSS_V3"))
        .find_map(|s| parse_cvss_score(&s.score));
    if let Some(score) = cvss {
        return severity_from_score(score);
    }

    vuln.database_specific
        .as_ref()
        .and_then(|db| db.severity.as_deref())
        .and_then(Severity::from_label)
        .unwrap_or(Severity::Medium)
}

/// Computes the CVSS v3.x base score from a vector such as
/// `CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H`.
///
/// Returns `None` if any base metric is missing or invalid.
pub fn cvss3_base_score(vector: &str) -> Option<f64> {
    let mut av = None;
    let mut ac = None;
    let mut pr = None;
    let mut ui = None;
    let mut scope_changed = None;
    let mut c = None;
    let mut i = None;
    let mut a = None;

    for part in vector.split('/').skip(1) {
        let (metric, value) = part.split_once(':')?;
        match metric {
            "AV" => {
                av = Some(match value {
                    "N" => 0.85,
                    "A" => 0.62,
                    "L" => 0.55,
                    "P" => 0.2,
                    _ => return None,
                })
            }
            "AC" => {
                ac = Some(match value {
                    "L" => 0.77,
                    "H" => 0.44,
                    _ => return None,
                })
            }
            "PR" => pr = Some(value),
            "UI" => {
                ui = Some(match value {
                    "N" => 0.85,
                    "R" => 0.62,
                    _ => return None,
                })
            }
            "S" => {
                scope_changed = Some(match value {
                    "U" => false,
                    "C" => true,
                    _ => return None,
                })
            }
            "C" => c = Some(impact_weight(value)?),
            "I" => i = Some(impact_weight(value)?),
            "A" => a = Some(impact_weight(value)?),
            // Temporal and environmental metrics do not affect the base score.
            _ => {}
        }
    }

    let scope_changed = scope_changed?;
    let pr = match (pr?, scope_changed) {
        ("N", _) => 0.85,
        ("L", false) => 0.62,
        ("L", true) => 0.68,
        ("H", false) => 0.27,
        ("H", true) => 0.5,
        _ => return None,
    };

    let iss = 1.0 - (1.0 - c?) * (1.0 - i?) * (1.0 - a?);
    let impact = if scope_changed {
        7.52 * (iss - 0.029) - 3.25 * (iss - 0.02f64).powi(15)
    } else {
        6.42 * iss
    };
    let exploitability = 8.22 * av? * ac? * pr * ui?;

    if impact <= 0.0 {
        return Some(0.0);
    }
    let raw = if scope_changed {
        1.08 * (impact + exploitability)
    } else {
        impact + exploitability
    };
    Some(round_up(raw.min(10.0)))
}

fn impact_weight(value: &str) -> Option<f64> {
    match value {
        "H" => Some(0.56),
        "L" => Some(0.22),
        "N" => Some(0.0),
        _ => None,
    }
}

/// CVSS v3.1 Roundup: smallest one-decimal number not below the input,
/// computed on integers to avoid floating point drift.
fn round_up(value: f64) -> f64 {
    let scaled = (value * 100_000.0).round() as i64;
    if scaled % 10_000 == 0 {
        scaled as f64 / 100_000.0
    } else {
        ((scaled / 10_000) + 1) as f64 / 10.0
    }
}

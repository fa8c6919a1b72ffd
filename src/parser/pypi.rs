use super::{ManifestParser, ParseResult};
use crate::model::{Ecosystem, PackageRecord, ANY_VERSION};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_REQUIREMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_.-]+)([><=!~]+)?(.*)$").unwrap());

static RE_INSTALL_REQUIRES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)install_requires\s*=\s*\[(.*?)\]").unwrap());

static RE_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap());

/// Parser for pip requirement files and `setup.py` `install_requires` lists.
pub struct PypiParser;

impl ManifestParser for PypiParser {
    fn name(&self) -> &'static str {
        "requirements.txt"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPI
    }

    fn parse(&self, content: &str) -> ParseResult {
        let packages = if content.contains("install_requires") {
            parse_setup_py(content)
        } else {
            content.lines().filter_map(parse_requirement).collect()
        };

        ParseResult {
            packages,
            errors: Vec::new(),
        }
    }
}

/// Parses one requirement line. Returns `None` for blanks, comments and pip options.
fn parse_requirement(line: &str) -> Option<PackageRecord> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }

    // Inline comments and environment markers are not part of the version.
    let line = line.split(" #").next().unwrap_or(line);
    let line = line.split(';').next().unwrap_or(line).trim();

    let caps = RE_REQUIREMENT.captures(line)?;
    let name = caps.get(1)?.as_str();

    // A single clause keeps only its version; a compound specifier such as
    // `>=3.2,<4.0` is kept whole so every bound reads alike.
    let version = match caps.get(2) {
        Some(op) => {
            let rest = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");
            if rest.is_empty() {
                ANY_VERSION.to_string()
            } else if rest.contains(',') {
                format!("{}{}", op.as_str(), rest)
            } else {
                rest.to_string()
            }
        }
        None => ANY_VERSION.to_string(),
    };

    Some(PackageRecord::new(name, version, Ecosystem::PyPI))
}

fn parse_setup_py(content: &str) -> Vec<PackageRecord> {
    RE_INSTALL_REQUIRES
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .flat_map(|list| {
            RE_QUOTED
                .captures_iter(list.as_str())
                .filter_map(|q| q.get(1).or_else(|| q.get(2)))
                .filter_map(|m| parse_requirement(m.as_str()))
                .collect::<Vec<_>>()
        })
        .map(|p| p.with_kind("install_requires"))
        .collect()
}

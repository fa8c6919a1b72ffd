use super::{ManifestParser, ParseResult};
use crate::model::{Ecosystem, PackageRecord};

/// Parser for `go.mod` require directives, both single-line and block form.
pub struct GoModParser;

impl ManifestParser for GoModParser {
    fn name(&self) -> &'static str {
        "go.mod"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
    }

    fn parse(&self, content: &str) -> ParseResult {
        let mut packages = Vec::new();
        let mut in_require_block = false;

        for raw in content.lines() {
            let line = raw.trim();

            if in_require_block {
                if line.starts_with(')') {
                    in_require_block = false;
                } else if let Some(record) = parse_requirement(line) {
                    packages.push(record);
                }
                continue;
            }

            if line.starts_with("require(") {
                in_require_block = true;
                continue;
            }

            let mut parts = line.splitn(2, char::is_whitespace);
            if parts.next() != Some("require") {
                continue;
            }
            let rest = parts.next().unwrap_or("").trim();
            if rest.starts_with('(') {
                in_require_block = true;
            } else if let Some(record) = parse_requirement(rest) {
                packages.push(record);
            }
        }

        ParseResult {
            packages,
            errors: Vec::new(),
        }
    }
}

/// Parses `<module> <version> [// indirect]`.
fn parse_requirement(line: &str) -> Option<PackageRecord> {
    let (spec, comment) = match line.split_once("//") {
        Some((spec, comment)) => (spec, Some(comment.trim())),
        None => (line, None),
    };

    let mut tokens = spec.split_whitespace();
    let module = tokens.next()?;
    let version = tokens.next()?;
    if tokens.next().is_some() || !version.starts_with('v') {
        return None;
    }

    let kind = if comment == Some("indirect") {
        "indirect"
    } else {
        "direct"
    };

    Some(PackageRecord::new(module, version, Ecosystem::Go).with_kind(kind))
}

use super::{ManifestParser, ParseResult};
use crate::model::{Ecosystem, PackageRecord, ANY_VERSION};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_GEM_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*gem\s+["']([^"']+)["'](?:\s*,\s*["']([^"']+)["'])?"#).unwrap()
});

static RE_GEMSPEC_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*\w+\.add_(runtime_|development_)?dependency\s*\(?\s*["']([^"']+)["'](?:\s*,\s*["']([^"']+)["'])?"#,
    )
    .unwrap()
});

/// Parser for `Gemfile` and `*.gemspec` declarations.
pub struct RubyGemsParser;

impl ManifestParser for RubyGemsParser {
    fn name(&self) -> &'static str {
        "Gemfile"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::RubyGems
    }

    fn parse(&self, content: &str) -> ParseResult {
        let packages = content
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(parse_line)
            .collect();

        ParseResult {
            packages,
            errors: Vec::new(),
        }
    }
}

fn parse_line(line: &str) -> Option<PackageRecord> {
    if let Some(caps) = RE_GEM_LINE.captures(line) {
        let name = caps.get(1)?.as_str();
        let version = caps.get(2).map(|m| m.as_str().trim()).unwrap_or(ANY_VERSION);
        return Some(PackageRecord::new(name, version, Ecosystem::RubyGems));
    }

    let caps = RE_GEMSPEC_LINE.captures(line)?;
    let kind = match caps.get(1).map(|m| m.as_str()) {
        Some("development_") => "development",
        _ => "runtime",
    };
    let name = caps.get(2)?.as_str();
    let version = caps.get(3).map(|m| m.as_str().trim()).unwrap_or(ANY_VERSION);
    Some(PackageRecord::new(name, version, Ecosystem::RubyGems).with_kind(kind))
}

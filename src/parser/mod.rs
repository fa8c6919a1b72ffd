//! Manifest parsers, one per ecosystem.
//!
//! Every parser is a pure function of the manifest text. Individual lines or
//! entries that cannot be understood are skipped; only a structurally invalid
//! document (bad JSON, XML or TOML) produces a parse error, and then no
//! packages.
//!
//! | Parser | Ecosystem | Formats |
//! |--------|-----------|---------|
//! | [`NpmParser`] | npm | `package.json` |
//! | [`PypiParser`] | PyPI | `requirements.txt`, `setup.py` |
//! | [`MavenParser`] | Maven | `pom.xml` |
//! | [`RubyGemsParser`] | RubyGems | `Gemfile`, `*.gemspec` |
//! | [`CratesParser`] | crates | `Cargo.toml` |
//! | [`GoModParser`] | Go | `go.mod` |
//!
//! # Example
//!
//! ```
//! use depscan::parser::{get_parser, ManifestParser};
//! use depscan::Ecosystem;
//!
//! let parser = get_parser(Ecosystem::PyPI);
//! let result = parser.parse("requests==2.31.0\n# comment\nflask\n");
//! assert_eq!(result.packages.len(), 2);
//! assert_eq!(result.packages[1].version, "*");
//! ```

mod crates;
mod gomod;
mod maven;
mod npm;
mod pypi;
mod rubygems;

pub use crates::CratesParser;
pub use gomod::GoModParser;
pub use maven::MavenParser;
pub use npm::NpmParser;
pub use pypi::PypiParser;
pub use rubygems::RubyGemsParser;

use crate::detector::detect;
use crate::model::{Ecosystem, PackageRecord};
use serde::Serialize;

/// Packages extracted from one manifest plus any recoverable problems.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub packages: Vec<PackageRecord>,
    pub errors: Vec<String>,
}

impl ParseResult {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            packages: Vec::new(),
            errors: vec![message.into()],
        }
    }
}

/// Converts manifest text into normalized package records.
pub trait ManifestParser: Send + Sync {
    /// Returns the human-readable name of this parser.
    fn name(&self) -> &'static str;

    /// Returns the ecosystem the produced packages belong to.
    fn ecosystem(&self) -> Ecosystem;

    /// Parses a manifest. Never panics and never aborts on a single bad entry.
    fn parse(&self, content: &str) -> ParseResult;
}

/// Returns the parser for a specific ecosystem.
pub fn get_parser(ecosystem: Ecosystem) -> Box<dyn ManifestParser> {
    match ecosystem {
        Ecosystem::Npm => Box::new(NpmParser),
        Ecosystem::PyPI => Box::new(PypiParser),
        Ecosystem::Maven => Box::new(MavenParser),
        Ecosystem::RubyGems => Box::new(RubyGemsParser),
        Ecosystem::Crates => Box::new(CratesParser),
        Ecosystem::Go => Box::new(GoModParser),
    }
}

/// Detects the ecosystem of a manifest and parses it.
///
/// Every produced record has `source_file` set to `filename`. A manifest
/// whose ecosystem cannot be determined yields one parse error.
pub fn parse_manifest(filename: &str, content: &str) -> (Option<Ecosystem>, ParseResult) {
    let Some(ecosystem) = detect(filename, Some(content)) else {
        return (
            None,
            ParseResult::from_error(format!("{}: unrecognized manifest format", filename)),
        );
    };

    let mut result = get_parser(ecosystem).parse(content);
    for package in &mut result.packages {
        package.source_file = Some(filename.to_string());
    }
    for error in &mut result.errors {
        *error = format!("{}: {}", filename, error);
    }

    (Some(ecosystem), result)
}

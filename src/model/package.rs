use serde::{Deserialize, Serialize};

/// Version string meaning "every published version".
pub const ANY_VERSION: &str = "*";

/// Version string used when a manifest declares no version at all.
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    PyPI,
    Maven,
    RubyGems,
    Crates,
    Go,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 6] = [
        Ecosystem::Npm,
        Ecosystem::PyPI,
        Ecosystem::Maven,
        Ecosystem::RubyGems,
        Ecosystem::Crates,
        Ecosystem::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "pypi",
            Ecosystem::Maven => "maven",
            Ecosystem::RubyGems => "rubygems",
            Ecosystem::Crates => "crates",
            Ecosystem::Go => "go",
        }
    }

    /// Ecosystem identifier understood by the OSV database.
    pub fn osv_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Maven => "Maven",
            Ecosystem::RubyGems => "RubyGems",
            Ecosystem::Crates => "crates.io",
            Ecosystem::Go => "Go",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Maven => "Maven",
            Ecosystem::RubyGems => "RubyGems",
            Ecosystem::Crates => "crates.io",
            Ecosystem::Go => "Go modules",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npm" => Ok(Ecosystem::Npm),
            "pypi" | "pip" | "python" => Ok(Ecosystem::PyPI),
            "maven" => Ok(Ecosystem::Maven),
            "rubygems" | "gem" | "ruby" => Ok(Ecosystem::RubyGems),
            "crates" | "crates.io" | "cargo" => Ok(Ecosystem::Crates),
            "go" | "golang" => Ok(Ecosystem::Go),
            _ => Err(format!(
                "Unknown ecosystem: {}. Use: npm, pypi, maven, rubygems, crates, go",
                s
            )),
        }
    }
}

/// A single dependency declared by a manifest.
///
/// `name` and `ecosystem` identify the package. `version` is whatever the
/// manifest declared, which may be [`ANY_VERSION`] or [`UNKNOWN_VERSION`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
            dependency_kind: None,
            source_file: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.dependency_kind = Some(kind.into());
        self
    }

    pub fn with_source_file(mut self, file: impl Into<String>) -> Self {
        self.source_file = Some(file.into());
        self
    }

    /// True when the declared version covers every release.
    pub fn is_any_version(&self) -> bool {
        let v = self.version.trim();
        v.is_empty() || v == ANY_VERSION || v == UNKNOWN_VERSION
    }
}

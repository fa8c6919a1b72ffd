//! Configuration file handling.
//!
//! Settings are read from a TOML file. Every field has a default, so a
//! missing file or a partial one is fine.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/depscan/config.toml`
//! - macOS: `~/Library/Application Support/depscan/config.toml`
//! - Windows: `%APPDATA%\depscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! cache_ttl_hours = 24
//! skip_vuln_check = false
//! default_format = "table"
//!
//! [query]
//! api_url = "https://api.osv.dev"
//! max_concurrency = 10
//! request_timeout_secs = 10
//!
//! [rate_limit]
//! max_requests = 100
//! window_seconds = 60
//!
//! [ignore]
//! packages = ["@types/*"]
//! vulnerabilities = ["GHSA-35jh-r3h4-6jhm"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::checker::QueryConfig;
use crate::rate_limit::RateLimitConfig;

/// Application configuration.
///
/// # Example
///
/// ```no_run
/// use depscan::Config;
///
/// let config = Config::load().unwrap();
/// println!("Cache TTL: {} hours", config.cache_ttl_hours);
/// println!("Concurrency: {}", config.query.max_concurrency);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long vulnerability lookups stay cached, in hours.
    ///
    /// Default: 24 hours
    pub cache_ttl_hours: u64,

    /// Skip vulnerability database lookups and run signature checks only.
    pub skip_vuln_check: bool,

    /// Output format used when `--format` is not given.
    ///
    /// Valid values: "table", "json"
    pub default_format: String,

    pub query: QueryConfig,

    pub rate_limit: RateLimitConfig,

    /// Ignore lists for accepted risks and false positives.
    pub ignore: IgnoreConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names excluded from analysis. `*` matches any run of characters
    /// (e.g. "@types/*", "org.example:*").
    pub packages: Vec<String>,

    /// Vulnerability IDs never reported (e.g. "CVE-2021-44228", "GHSA-xxxx").
    pub vulnerabilities: Vec<String>,
}

impl IgnoreConfig {
    pub fn should_ignore_package(&self, name: &str) -> bool {
        self.packages.iter().any(|pattern| glob_match(pattern, name))
    }

    pub fn should_ignore_vulnerability(&self, vuln_id: &str) -> bool {
        self.vulnerabilities
            .iter()
            .any(|id| id.eq_ignore_ascii_case(vuln_id))
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.vulnerabilities.is_empty()
    }
}

/// Wildcard matching where `*` matches any (possibly empty) substring.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut segments = pattern.split('*');
    let Some(first) = segments.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let middle: Vec<&str> = segments.collect();
    let Some((last, inner)) = middle.split_last() else {
        // No wildcard at all.
        return rest.is_empty();
    };

    for segment in inner.iter().filter(|s| !s.is_empty()) {
        match rest.find(segment) {
            Some(pos) => rest = &rest[pos + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_hours: 24,
            skip_vuln_check: false,
            default_format: "table".to_string(),
            query: QueryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from the default location, or defaults if the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads the configuration from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// ```
    /// let path = depscan::Config::config_path();
    /// assert!(path.ends_with("depscan/config.toml"));
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depscan")
            .join("config.toml")
    }

    /// Renders the default configuration as TOML.
    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

//! Curated table of known-malicious packages.
//!
//! Entries come from documented registry takedowns and security advisories.
//! A version constraint is either `*` (every version) or one exact version
//! string; ranges are not evaluated.

use crate::model::{Ecosystem, PackageRecord, ANY_VERSION};
use serde::Serialize;

/// One known-malicious package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaliciousSignature {
    pub name: &'static str,
    pub version_constraint: &'static str,
    pub reason: &'static str,
}

const fn sig(
    name: &'static str,
    version_constraint: &'static str,
    reason: &'static str,
) -> MaliciousSignature {
    MaliciousSignature {
        name,
        version_constraint,
        reason,
    }
}

static MALICIOUS_NPM: &[MaliciousSignature] = &[
    sig("flatmap-stream", "*", "Injected into event-stream (2018) to steal Bitcoin wallets"),
    sig("event-stream", "3.3.6", "Compromised release pulling in flatmap-stream (2018)"),
    sig("ua-parser-js", "0.7.29", "Hijacked release shipping a cryptominer and credential stealer (2021)"),
    sig("ua-parser-js", "0.8.0", "Hijacked release shipping a cryptominer and credential stealer (2021)"),
    sig("ua-parser-js", "1.0.0", "Hijacked release shipping a cryptominer and credential stealer (2021)"),
    sig("coa", "2.0.3", "Hijacked release with password-stealing payload (2021)"),
    sig("rc", "1.2.9", "Hijacked release with password-stealing payload (2021)"),
    sig("node-ipc", "10.1.1", "Protestware wiping files on Russian and Belarusian hosts (2022)"),
    sig("node-ipc", "10.1.2", "Protestware wiping files on Russian and Belarusian hosts (2022)"),
    sig("eslint-scope", "3.7.2", "Compromised release stealing npm tokens (2018)"),
    sig("crossenv", "*", "Typosquat of cross-env exfiltrating environment variables (2017)"),
    sig("cross-env.js", "*", "Typosquat of cross-env exfiltrating environment variables (2017)"),
    sig("electron-native-notify", "*", "Cryptominer delivery package (2018)"),
    sig("getcookies", "*", "Backdoor enabling remote code execution (2018)"),
    sig("discord.dll", "*", "Discord token stealer (2021)"),
    sig("lodahs", "*", "Typosquat of lodash"),
    sig("axois", "*", "Typosquat of axios"),
];

static MALICIOUS_PYPI: &[MaliciousSignature] = &[
    sig("ctx", "*", "Account takeover (2022): exfiltrated environment variables to a remote server"),
    sig("colourama", "*", "Typosquat of colorama with clipboard-hijacking payload (2018)"),
    sig("jeIlyfish", "*", "Typosquat of jellyfish stealing SSH and GPG keys (2019)"),
    sig("python3-dateutil", "*", "Typosquat of python-dateutil stealing SSH and GPG keys (2019)"),
    sig("acqusition", "*", "Typosquat of acquisition with remote code download (2017)"),
    sig("setup-tools", "*", "Typosquat of setuptools"),
    sig("urlib3", "*", "Typosquat of urllib3"),
    sig("djanga", "*", "Typosquat of django (2017)"),
    sig("reqeusts", "*", "Typosquat of requests"),
    sig("noblesse", "*", "Discord token and credit card stealer (2021)"),
    sig("pytagora", "*", "Remote code injection payload (2021)"),
    sig("ssh-decorate", "*", "Compromised package exfiltrating SSH credentials (2018)"),
];

static MALICIOUS_MAVEN: &[MaliciousSignature] = &[];

static MALICIOUS_RUBYGEMS: &[MaliciousSignature] = &[
    sig("rest-client", "1.6.13", "Hijacked release with remote code execution backdoor (2019)"),
    sig("strong_password", "0.0.7", "Hijacked release with remote code execution backdoor (2019)"),
    sig("bootstrap-sass", "3.2.0.3", "Hijacked release with remote code execution backdoor (2019)"),
    sig("atlas-client", "*", "Typosquat of atlas_client with cryptocurrency clipboard hijacker (2020)"),
];

static MALICIOUS_CRATES: &[MaliciousSignature] = &[
    sig("rustdecimal", "*", "Typosquat of rust_decimal dropping a payload on CI hosts (2022)"),
    sig("faster_log", "*", "Typosquat of fast_log harvesting cryptocurrency keys (2025)"),
    sig("async_println", "*", "Harvested cryptocurrency keys from source files (2025)"),
];

static MALICIOUS_GO: &[MaliciousSignature] = &[
    sig("github.com/boltdb-go/bolt", "*", "Typosquat of github.com/boltdb/bolt with remote access backdoor"),
];

/// Returns the signature table for an ecosystem.
pub fn signatures_for(ecosystem: Ecosystem) -> &'static [MaliciousSignature] {
    match ecosystem {
        Ecosystem::Npm => MALICIOUS_NPM,
        Ecosystem::PyPI => MALICIOUS_PYPI,
        Ecosystem::Maven => MALICIOUS_MAVEN,
        Ecosystem::RubyGems => MALICIOUS_RUBYGEMS,
        Ecosystem::Crates => MALICIOUS_CRATES,
        Ecosystem::Go => MALICIOUS_GO,
    }
}

impl MaliciousSignature {
    /// Case-insensitive name match plus wildcard-or-exact version match.
    pub fn matches(&self, package: &PackageRecord) -> bool {
        self.name.eq_ignore_ascii_case(package.name.trim())
            && (self.version_constraint == ANY_VERSION
                || self.version_constraint == package.version.trim())
    }
}

/// Finds the first signature matching a package.
pub fn find_signature(package: &PackageRecord) -> Option<&'static MaliciousSignature> {
    signatures_for(package.ecosystem)
        .iter()
        .find(|sig| sig.matches(package))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matches_any_version() {
        let pkg = PackageRecord::new("flatmap-stream", "0.1.0", Ecosystem::Npm);
        let hit = find_signature(&pkg).unwrap();
        assert!(hit.reason.contains("event-stream"));
    }

    #[test]
    fn test_case_insensitive_name() {
        let pkg = PackageRecord::new("CTX", "0.1.2", Ecosystem::PyPI);
        assert!(find_signature(&pkg).is_some());
    }

    #[test]
    fn test_exact_version_only() {
        let bad = PackageRecord::new("event-stream", "3.3.6", Ecosystem::Npm);
        let good = PackageRecord::new("event-stream", "4.0.1", Ecosystem::Npm);
        let range = PackageRecord::new("event-stream", "^3.3.0", Ecosystem::Npm);

        assert!(find_signature(&bad).is_some());
        assert!(find_signature(&good).is_none());
        // No range evaluation: a range that includes 3.3.6 does not match.
        assert!(find_signature(&range).is_none());
    }

    #[test]
    fn test_ecosystems_are_separate() {
        let pkg = PackageRecord::new("ctx", "*", Ecosystem::Npm);
        assert!(find_signature(&pkg).is_none());
    }

    #[test]
    fn test_clean_packages() {
        assert!(find_signature(&PackageRecord::new("express", "4.17.1", Ecosystem::Npm)).is_none());
        assert!(find_signature(&PackageRecord::new("requests", "2.31.0", Ecosystem::PyPI)).is_none());
    }
}

//! Typosquat detection against lists of popular package names.
//!
//! A candidate is compared with every popular name of its ecosystem. The
//! first matching rule below decides the confidence for that target:
//!
//! | Rule | Confidence |
//! |------|------------|
//! | Same length, one character differs | 0.9 |
//! | Same length, two adjacent characters swapped | 0.8 |
//! | One character inserted or deleted | 0.7 |
//! | One leetspeak substitution (`o`/`0`, `s`/`5`, ...) | 0.6 |

use crate::model::Ecosystem;
use serde::Serialize;

/// Confidence a match must exceed to be reported.
pub const REPORT_THRESHOLD: f64 = 0.5;

const SUBSTITUTION_CONFIDENCE: f64 = 0.9;
const TRANSPOSITION_CONFIDENCE: f64 = 0.8;
const INSERTION_DELETION_CONFIDENCE: f64 = 0.7;
const LEETSPEAK_CONFIDENCE: f64 = 0.6;

static LEETSPEAK: &[(char, char)] = &[
    ('o', '0'),
    ('i', '1'),
    ('l', '1'),
    ('s', '5'),
    ('e', '3'),
    ('a', '@'),
    ('g', '9'),
    ('t', '7'),
    ('b', '6'),
];

static POPULAR_NPM: &[&str] = &[
    "react", "lodash", "express", "axios", "moment", "chalk", "request", "commander",
    "debug", "webpack", "typescript", "vue", "jquery", "underscore", "async", "colors",
    "dotenv", "mongoose", "eslint", "jest", "uuid", "yargs", "body-parser", "cross-env",
    "next", "electron", "socket.io", "redux", "bluebird", "minimist",
];

static POPULAR_PYPI: &[&str] = &[
    "requests", "numpy", "pandas", "django", "flask", "urllib3", "setuptools", "boto3",
    "botocore", "six", "python-dateutil", "pyyaml", "cryptography", "colorama", "jellyfish",
    "scipy", "matplotlib", "pillow", "pytest", "jinja2", "click", "sqlalchemy",
    "beautifulsoup4", "tensorflow", "torch", "selenium", "paramiko", "certifi", "idna",
    "attrs",
];

static POPULAR_MAVEN: &[&str] = &[
    "org.apache.logging.log4j:log4j-core",
    "com.fasterxml.jackson.core:jackson-databind",
    "org.springframework:spring-core",
    "junit:junit",
    "com.google.guava:guava",
    "org.slf4j:slf4j-api",
    "org.apache.commons:commons-lang3",
    "commons-io:commons-io",
    "org.projectlombok:lombok",
    "com.google.code.gson:gson",
];

static POPULAR_RUBYGEMS: &[&str] = &[
    "rails", "rake", "bundler", "rack", "nokogiri", "devise", "puma", "sidekiq", "rspec",
    "json", "activesupport", "colorize", "rest-client", "pry", "thor", "atlas_client",
];

static POPULAR_CRATES: &[&str] = &[
    "serde", "tokio", "rand", "regex", "clap", "syn", "quote", "reqwest", "rust_decimal",
    "log", "anyhow", "thiserror", "hyper", "futures", "chrono", "fast_log", "libc",
];

static POPULAR_GO: &[&str] = &[
    "github.com/gin-gonic/gin",
    "github.com/sirupsen/logrus",
    "github.com/stretchr/testify",
    "github.com/spf13/cobra",
    "github.com/gorilla/mux",
    "github.com/boltdb/bolt",
    "golang.org/x/net",
    "golang.org/x/crypto",
    "google.golang.org/grpc",
    "github.com/pkg/errors",
    "github.com/go-redis/redis",
    "gopkg.in/yaml.v3",
];

/// Popular package names used as the typosquat baseline for an ecosystem.
pub fn targets_for(ecosystem: Ecosystem) -> &'static [&'static str] {
    match ecosystem {
        Ecosystem::Npm => POPULAR_NPM,
        Ecosystem::PyPI => POPULAR_PYPI,
        Ecosystem::Maven => POPULAR_MAVEN,
        Ecosystem::RubyGems => POPULAR_RUBYGEMS,
        Ecosystem::Crates => POPULAR_CRATES,
        Ecosystem::Go => POPULAR_GO,
    }
}

/// How a candidate name relates to the popular name it imitates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    Substitution,
    Transposition,
    InsertionDeletion,
    Leetspeak,
}

impl SimilarityKind {
    pub fn confidence(&self) -> f64 {
        match self {
            SimilarityKind::Substitution => SUBSTITUTION_CONFIDENCE,
            SimilarityKind::Transposition => TRANSPOSITION_CONFIDENCE,
            SimilarityKind::InsertionDeletion => INSERTION_DELETION_CONFIDENCE,
            SimilarityKind::Leetspeak => LEETSPEAK_CONFIDENCE,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            SimilarityKind::Substitution => "one character substituted",
            SimilarityKind::Transposition => "two adjacent characters transposed",
            SimilarityKind::InsertionDeletion => "one character inserted or deleted",
            SimilarityKind::Leetspeak => "leetspeak character substitution",
        }
    }
}

/// Best typosquat match for a candidate name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TyposquatMatch {
    pub target: &'static str,
    pub kind: SimilarityKind,
    pub confidence: f64,
}

/// Compares a name with the popular names of its ecosystem.
///
/// Returns the highest-confidence match, or `None` when nothing exceeds
/// [`REPORT_THRESHOLD`]. Names that are themselves popular are never
/// reported.
pub fn find_typosquat(name: &str, ecosystem: Ecosystem) -> Option<TyposquatMatch> {
    let candidate = name.trim().to_lowercase();
    let targets = targets_for(ecosystem);

    if targets.iter().any(|t| *t == candidate) {
        return None;
    }

    let mut best: Option<TyposquatMatch> = None;
    for &target in targets {
        let Some(kind) = classify(&candidate, target) else {
            continue;
        };
        let confidence = kind.confidence();
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            best = Some(TyposquatMatch {
                target,
                kind,
                confidence,
            });
        }
    }

    best.filter(|m| m.confidence > REPORT_THRESHOLD)
}

/// Applies the similarity rules in precedence order, returning the first hit.
pub fn classify(candidate: &str, target: &str) -> Option<SimilarityKind> {
    if candidate == target {
        return None;
    }

    let c: Vec<char> = candidate.chars().collect();
    let t: Vec<char> = target.chars().collect();

    if c.len() == t.len() {
        let diffs: Vec<usize> = (0..c.len()).filter(|&i| c[i] != t[i]).collect();
        match diffs.as_slice() {
            [_] => return Some(SimilarityKind::Substitution),
            [i, j] if *j == i + 1 && c[*i] == t[*j] && c[*j] == t[*i] => {
                return Some(SimilarityKind::Transposition)
            }
            _ => {}
        }
    }

    if c.len().abs_diff(t.len()) == 1 && is_single_insertion(&c, &t) {
        return Some(SimilarityKind::InsertionDeletion);
    }

    if is_leetspeak_variant(candidate, target) {
        return Some(SimilarityKind::Leetspeak);
    }

    None
}

/// True when removing one character from the longer name yields the shorter.
fn is_single_insertion(a: &[char], b: &[char]) -> bool {
    let (long, short) = if a.len() > b.len() { (a, b) } else { (b, a) };
    let split = long
        .iter()
        .zip(short.iter())
        .position(|(x, y)| x != y)
        .unwrap_or(short.len());
    long[split + 1..] == short[split..]
}

fn is_leetspeak_variant(candidate: &str, target: &str) -> bool {
    LEETSPEAK.iter().any(|&(plain, leet)| {
        target.replace(plain, &leet.to_string()) == candidate
            || target.replace(leet, &plain.to_string()) == candidate
            || candidate.replace(leet, &plain.to_string()) == target
            || candidate.replace(plain, &leet.to_string()) == target
    })
}

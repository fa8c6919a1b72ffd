//! Dependency security analysis for npm, PyPI, Maven, RubyGems, crates and
//! Go modules.
//!
//! Manifests are detected and parsed into [`PackageRecord`]s, checked against
//! known-malicious and typosquat signatures, and looked up in the OSV
//! vulnerability database. [`Engine::analyze`] merges everything into one
//! deduplicated list of [`SecurityFinding`]s.
//!
//! ```no_run
//! use depscan::{Config, Engine};
//!
//! # async fn run() {
//! let engine = Engine::from_config(&Config::default(), None);
//! let report = engine
//!     .analyze_manifest("package.json", r#"{"dependencies": {"flatmap-stream": "0.1.1"}}"#)
//!     .await;
//! assert_eq!(report.findings[0].package, "flatmap-stream");
//! # }
//! ```

pub mod aggregator;
pub mod cache;
pub mod checker;
pub mod config;
pub mod detector;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;
pub mod rate_limit;
pub mod signature;

pub use aggregator::{AnalysisReport, Engine, Manifest};
pub use cache::Cache;
pub use checker::{OsvClient, QueryConfig, QueryEngine, VulnerabilitySource};
pub use config::Config;
pub use detector::detect;
pub use error::{CacheError, QueryError};
pub use model::{Ecosystem, FindingType, PackageRecord, QueryOutcome, SecurityFinding, Severity};
pub use rate_limit::RateLimiter;

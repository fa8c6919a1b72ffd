//! Core data types shared by every stage of the analysis.
//!
//! - [`PackageRecord`] - A dependency declared by a manifest
//! - [`Ecosystem`] - The package-manager namespace it belongs to
//! - [`SecurityFinding`] - A problem detected for a package
//! - [`VulnRecord`] - A vulnerability as returned by the database
//! - [`QueryOutcome`] - The result of one database lookup
//!
//! # Example
//!
//! ```
//! use depscan::{Ecosystem, PackageRecord};
//!
//! let package = PackageRecord::new("lodash", "4.17.21", Ecosystem::Npm)
//!     .with_kind("dependencies");
//!
//! assert_eq!(package.ecosystem.osv_name(), "npm");
//! ```

mod finding;
mod package;
mod vulnerability;

pub use finding::*;
pub use package::*;
pub use vulnerability::*;

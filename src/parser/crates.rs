use super::{ManifestParser, ParseResult};
use crate::model::{Ecosystem, PackageRecord, ANY_VERSION};
use toml::{Table, Value};

const DEPENDENCY_TABLES: [&str; 3] = ["dependencies", "dev-dependencies", "build-dependencies"];

/// Parser for `Cargo.toml` dependency tables.
pub struct CratesParser;

impl ManifestParser for CratesParser {
    fn name(&self) -> &'static str {
        "Cargo.toml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Crates
    }

    fn parse(&self, content: &str) -> ParseResult {
        let manifest: Table = match toml::from_str(content) {
            Ok(table) => table,
            Err(e) => return ParseResult::from_error(format!("invalid TOML: {}", e)),
        };

        let mut packages = Vec::new();

        for section in DEPENDENCY_TABLES {
            let Some(deps) = manifest.get(section).and_then(Value::as_table) else {
                continue;
            };

            for (key, spec) in deps {
                let (name, version) = match spec {
                    Value::String(version) => (key.as_str(), version.as_str()),
                    Value::Table(fields) => {
                        // `foo = { package = "real-name", ... }` renames the crate.
                        let name = fields
                            .get("package")
                            .and_then(Value::as_str)
                            .unwrap_or(key);
                        let version = fields
                            .get("version")
                            .and_then(Value::as_str)
                            .unwrap_or(ANY_VERSION);
                        (name, version)
                    }
                    _ => continue,
                };

                packages.push(PackageRecord::new(name, version, Ecosystem::Crates).with_kind(section));
            }
        }

        ParseResult {
            packages,
            errors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_forms() {
        let content = r#"
[package]
name = "demo"
version = "0.1.0"

[dependencies]
serde = "1.0"
tokio = { version = "1", features = ["full"] }
local = { path = "../local" }
decimal = { package = "rust_decimal", version = "1.30" }

[dev-dependencies]
tempfile = "3"
"#;
        let result = CratesParser.parse(content);
        assert!(result.errors.is_empty());

        let got: Vec<_> = result
            .packages
            .iter()
            .map(|p| (p.name.as_str(), p.version.as_str(), p.dependency_kind.as_deref()))
            .collect();

        assert!(got.contains(&("serde", "1.0", Some("dependencies"))));
        assert!(got.contains(&("tokio", "1", Some("dependencies"))));
        assert!(got.contains(&("local", "*", Some("dependencies"))));
        assert!(got.contains(&("rust_decimal", "1.30", Some("dependencies"))));
        assert!(got.contains(&("tempfile", "3", Some("dev-dependencies"))));
        assert_eq!(got.len(), 5);
    }

    #[test]
    fn test_invalid_toml() {
        let result = CratesParser.parse("[dependencies\nserde = ");
        assert!(result.packages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_non_string_values_are_skipped() {
        let result = CratesParser.parse("[dependencies]\nweird = 42\nok = \"0.3\"\n");
        assert_eq!(result.packages.len(), 1);
        assert_eq!(result.packages[0].name, "ok");
    }
}

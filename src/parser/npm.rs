use super::{ManifestParser, ParseResult};
use crate::model::{Ecosystem, PackageRecord, ANY_VERSION};
use serde_json::Value;

/// Dependency sections read from `package.json`, in output order.
const DEPENDENCY_KEYS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

pub struct NpmParser;

impl ManifestParser for NpmParser {
    fn name(&self) -> &'static str {
        "package.json"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn parse(&self, content: &str) -> ParseResult {
        let manifest: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => return ParseResult::from_error(format!("invalid JSON: {}", e)),
        };

        let Some(manifest) = manifest.as_object() else {
            return ParseResult::from_error("invalid JSON: top-level value is not an object");
        };

        let mut packages = Vec::new();

        for key in DEPENDENCY_KEYS {
            let Some(deps) = manifest.get(key).and_then(Value::as_object) else {
                continue;
            };

            for (name, spec) in deps {
                let version = match spec {
                    Value::String(v) => v.trim().to_string(),
                    // Lock-file style entries: {"version": "1.2.3", ...}
                    Value::Object(obj) => obj
                        .get("version")
                        .and_then(Value::as_str)
                        .unwrap_or(ANY_VERSION)
                        .to_string(),
                    _ => continue,
                };
                let version = if version.is_empty() {
                    ANY_VERSION.to_string()
                } else {
                    version
                };

                packages.push(PackageRecord::new(name, version, Ecosystem::Npm).with_kind(key));
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
    fn test_reads_all_dependency_sections() {
        let content = r#"{
            "name": "app",
            "dependencies": {"express": "^4.17.1"},
            "devDependencies": {"jest": "29.0.0"},
            "peerDependencies": {"react": ">=17"}
        }"#;
        let result = NpmParser.parse(content);

        assert!(result.errors.is_empty());
        assert_eq!(result.packages.len(), 3);
        assert_eq!(result.packages[0].name, "express");
        assert_eq!(result.packages[0].version, "^4.17.1");
        assert_eq!(result.packages[0].dependency_kind.as_deref(), Some("dependencies"));
        assert_eq!(result.packages[1].dependency_kind.as_deref(), Some("devDependencies"));
        assert_eq!(result.packages[2].dependency_kind.as_deref(), Some("peerDependencies"));
    }

    #[test]
    fn test_invalid_json_yields_one_error() {
        let result = NpmParser.parse("{\"dependencies\": ");
        assert!(result.packages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_non_object_document() {
        let result = NpmParser.parse("[1, 2, 3]");
        assert!(result.packages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_skips_unusable_entries() {
        let content = r#"{"dependencies": {"a": "1.0.0", "b": 42, "c": "", "d": {"version": "2.0.0"}}}"#;
        let result = NpmParser.parse(content);

        let names: Vec<_> = result.packages.iter().map(|p| (p.name.as_str(), p.version.as_str())).collect();
        assert_eq!(names, vec![("a", "1.0.0"), ("c", "*"), ("d", "2.0.0")]);
    }

    #[test]
    fn test_manifest_without_dependencies() {
        let result = NpmParser.parse(r#"{"name": "empty"}"#);
        assert!(result.packages.is_empty());
        assert!(result.errors.is_empty());
    }
}
